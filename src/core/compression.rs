//! Compression support for mesh buffers.
//!
//! Buffers are stored as bare zlib streams. The decompressed size is not
//! recorded; it is recovered by reading the stream to its end.

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::util::{Error, Result};

/// Trade-off between compression ratio and speed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Fastest zlib level.
    Fast,
    /// Best zlib ratio.
    #[default]
    Best,
}

impl CompressionLevel {
    /// Select a level from the `fast` flag.
    pub fn from_fast_flag(fast: bool) -> Self {
        if fast { Self::Fast } else { Self::Best }
    }

    fn as_flate2(self) -> Compression {
        match self {
            Self::Fast => Compression::fast(),
            Self::Best => Compression::best(),
        }
    }
}

/// Compress data using zlib.
///
/// Always produces a zlib stream, even for empty input, so that
/// [`decompress`] never has to guess whether a buffer was compressed.
pub fn compress(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 16), level.as_flate2());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress a zlib stream produced by [`compress`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::with_capacity(data.len() * 4);

    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::invalid_mesh(format!("corrupt compressed buffer: {e}")))?;
    Ok(decompressed)
}
