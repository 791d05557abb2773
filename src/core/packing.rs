//! Little-endian packing of numeric buffers.
//!
//! Used by binary array attributes and by the mesh codec. Unpacking returns
//! `None` when the byte count is not a whole number of elements.

use byteorder::{ByteOrder, LittleEndian};

pub fn pack_f64(v: &[f64]) -> Vec<u8> {
    let mut out = vec![0u8; v.len() * 8];
    LittleEndian::write_f64_into(v, &mut out);
    out
}

pub fn pack_f32(v: &[f32]) -> Vec<u8> {
    let mut out = vec![0u8; v.len() * 4];
    LittleEndian::write_f32_into(v, &mut out);
    out
}

pub fn pack_i32(v: &[i32]) -> Vec<u8> {
    let mut out = vec![0u8; v.len() * 4];
    LittleEndian::write_i32_into(v, &mut out);
    out
}

pub fn pack_i16(v: &[i16]) -> Vec<u8> {
    let mut out = vec![0u8; v.len() * 2];
    LittleEndian::write_i16_into(v, &mut out);
    out
}

pub fn unpack_f64(bytes: &[u8]) -> Option<Vec<f64>> {
    if bytes.len() % 8 != 0 {
        return None;
    }
    let mut out = vec![0.0; bytes.len() / 8];
    LittleEndian::read_f64_into(bytes, &mut out);
    Some(out)
}

pub fn unpack_f32(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    let mut out = vec![0.0; bytes.len() / 4];
    LittleEndian::read_f32_into(bytes, &mut out);
    Some(out)
}

pub fn unpack_i32(bytes: &[u8]) -> Option<Vec<i32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    let mut out = vec![0; bytes.len() / 4];
    LittleEndian::read_i32_into(bytes, &mut out);
    Some(out)
}

pub fn unpack_i16(bytes: &[u8]) -> Option<Vec<i16>> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let mut out = vec![0; bytes.len() / 2];
    LittleEndian::read_i16_into(bytes, &mut out);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_layout_is_little_endian() {
        assert_eq!(pack_i32(&[1, -2]), vec![1, 0, 0, 0, 0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(pack_i16(&[0x0102]), vec![0x02, 0x01]);
        assert_eq!(pack_f32(&[1.0]), 1.0f32.to_le_bytes().to_vec());
        assert_eq!(unpack_f64(&pack_f64(&[0.5, -3.25])), Some(vec![0.5, -3.25]));
    }

    #[test]
    fn test_partial_element_rejected() {
        assert!(unpack_f64(&[0; 12]).is_none());
        assert!(unpack_f32(&[0; 6]).is_none());
        assert!(unpack_i32(&[0; 3]).is_none());
        assert!(unpack_i16(&[0; 1]).is_none());
        assert_eq!(unpack_i32(&[]), Some(Vec::new()));
    }
}
