//! Core layer - attribute model, key codec and format constants.
//!
//! This module provides:
//! - [`AttributeValue`] / [`AttributeTree`] - Persisted object state
//! - [`key_codec`] - Key prefix convention for schema-less text encoding
//! - [`constants`] - Reserved type ids, struct names and attribute keys
//! - [`compress`] / [`decompress`] - zlib support for mesh buffers
//! - [`packing`] - Little-endian numeric buffers

mod attribute;
mod compression;
pub mod constants;
pub mod key_codec;
pub mod packing;

pub use attribute::{parse_struct_key, struct_key, AttributeTree, AttributeValue};
pub use compression::{compress, decompress, CompressionLevel};
pub use key_codec::{classify_key, decode_value, encode_value, AttributeKind, CodecError, ElementType};
