//! Attribute key codec.
//!
//! The leading characters of an attribute key select the value type, so a
//! text transport can encode and decode values without a schema:
//!
//! | Prefix | Type |
//! |---|---|
//! | `i` | 32-bit int |
//! | `f` | 32-bit float |
//! | `b` | bool |
//! | `v` | 3-vector |
//! | `q` | quaternion (`x y z w`) |
//! | `c` | RGBA color |
//! | `z{d,f,i}{2,3}` | whitespace-delimited text array |
//! | `x{d,f,i}{2,3}` | base64 binary array (little-endian) |
//! | `xb` | base64 raw byte buffer |
//! | anything else | opaque string |

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use super::attribute::AttributeValue;
use super::packing;
use crate::util::{DVec2, DVec3, IVec2, IVec3, Quat, Vec2, Vec3, Vec4};

/// Element type of an array attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Double,
    Float,
    Int,
}

impl ElementType {
    /// Size in bytes of one element in the binary encoding.
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Double => 8,
            Self::Float | Self::Int => 4,
        }
    }

    fn from_code(c: u8) -> Option<Self> {
        match c {
            b'd' => Some(Self::Double),
            b'f' => Some(Self::Float),
            b'i' => Some(Self::Int),
            _ => None,
        }
    }
}

/// Value type selected by a key prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    Int,
    Float,
    Bool,
    Vector3,
    Quaternion,
    Color,
    TextArray(ElementType, u8),
    BinaryArray(ElementType, u8),
    Bytes,
    String,
}

/// Errors from encoding or decoding a single attribute.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("'{key}': cannot parse '{raw}' as {expected}")]
    Parse { key: String, raw: String, expected: &'static str },

    #[error("'{key}': expected {expected} components, found {actual}")]
    ComponentCount { key: String, expected: usize, actual: usize },

    #[error("'{key}': array of {len} values is not a multiple of {components}")]
    ArrayLength { key: String, len: usize, components: usize },

    #[error("'{key}': binary buffer of {len} bytes is not a multiple of {stride}")]
    BinaryLength { key: String, len: usize, stride: usize },

    #[error("'{key}': invalid base64: {source}")]
    Base64 { key: String, source: base64::DecodeError },

    #[error("'{key}': key declares {expected:?} but value is {actual}")]
    TypeMismatch { key: String, expected: AttributeKind, actual: &'static str },

    #[error("'{key}': {actual} values have no text encoding")]
    NotEncodable { key: String, actual: &'static str },
}

/// Classify a key by its type prefix.
pub fn classify_key(key: &str) -> AttributeKind {
    let bytes = key.as_bytes();
    let Some(&first) = bytes.first() else {
        return AttributeKind::String;
    };

    match first {
        b'i' => AttributeKind::Int,
        b'f' => AttributeKind::Float,
        b'b' => AttributeKind::Bool,
        b'v' => AttributeKind::Vector3,
        b'q' => AttributeKind::Quaternion,
        b'c' => AttributeKind::Color,
        b'z' | b'x' => match array_shape_code(&bytes[1..]) {
            Some((elem, comps)) if first == b'z' => AttributeKind::TextArray(elem, comps),
            Some((elem, comps)) => AttributeKind::BinaryArray(elem, comps),
            None if first == b'x' && bytes.get(1) == Some(&b'b') => AttributeKind::Bytes,
            None => AttributeKind::String,
        },
        _ => AttributeKind::String,
    }
}

fn array_shape_code(rest: &[u8]) -> Option<(ElementType, u8)> {
    let elem = ElementType::from_code(*rest.first()?)?;
    let comps = match rest.get(1)? {
        b'2' => 2,
        b'3' => 3,
        _ => return None,
    };
    Some((elem, comps))
}

// ============================================================================
// Flat numeric arrays
// ============================================================================

enum FlatArray {
    Double(Vec<f64>),
    Float(Vec<f32>),
    Int(Vec<i32>),
}

impl FlatArray {
    fn len(&self) -> usize {
        match self {
            Self::Double(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
        }
    }

    fn to_text(&self) -> String {
        fn join<T: ToString>(v: &[T]) -> String {
            v.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
        }
        match self {
            Self::Double(v) => join(v),
            Self::Float(v) => join(v),
            Self::Int(v) => join(v),
        }
    }

    fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            Self::Double(v) => packing::pack_f64(v),
            Self::Float(v) => packing::pack_f32(v),
            Self::Int(v) => packing::pack_i32(v),
        }
    }

    fn from_le_bytes(elem: ElementType, bytes: &[u8]) -> Option<Self> {
        match elem {
            ElementType::Double => packing::unpack_f64(bytes).map(Self::Double),
            ElementType::Float => packing::unpack_f32(bytes).map(Self::Float),
            ElementType::Int => packing::unpack_i32(bytes).map(Self::Int),
        }
    }

    /// Group flat components into glam vectors.
    fn into_value(self, comps: u8) -> AttributeValue {
        match (self, comps) {
            (Self::Double(v), 2) => AttributeValue::Vec2dArray(safe_cast_vec(&v[..])),
            (Self::Double(v), _) => AttributeValue::Vec3dArray(safe_cast_vec(&v[..])),
            (Self::Float(v), 2) => AttributeValue::Vec2fArray(safe_cast_vec(&v[..])),
            (Self::Float(v), _) => AttributeValue::Vec3fArray(safe_cast_vec(&v[..])),
            (Self::Int(v), 2) => AttributeValue::Int2Array(safe_cast_vec(&v[..])),
            (Self::Int(v), _) => AttributeValue::Int3Array(safe_cast_vec(&v[..])),
        }
    }
}

/// Reinterpret a flat component slice as a Vec of vectors.
/// Returns empty Vec if the length does not divide evenly.
#[inline]
fn safe_cast_vec<S: bytemuck::Pod, T: bytemuck::Pod>(data: &[S]) -> Vec<T> {
    bytemuck::try_cast_slice(data)
        .map(|s: &[T]| s.to_vec())
        .unwrap_or_default()
}

/// Shape and flattened contents of an array value.
fn flatten_array(value: &AttributeValue) -> Option<(ElementType, u8, FlatArray)> {
    let flat = match value {
        AttributeValue::Vec2dArray(v) => (ElementType::Double, 2, FlatArray::Double(bytemuck::cast_slice::<DVec2, f64>(v).to_vec())),
        AttributeValue::Vec3dArray(v) => (ElementType::Double, 3, FlatArray::Double(bytemuck::cast_slice::<DVec3, f64>(v).to_vec())),
        AttributeValue::Vec2fArray(v) => (ElementType::Float, 2, FlatArray::Float(bytemuck::cast_slice::<Vec2, f32>(v).to_vec())),
        AttributeValue::Vec3fArray(v) => (ElementType::Float, 3, FlatArray::Float(bytemuck::cast_slice::<Vec3, f32>(v).to_vec())),
        AttributeValue::Int2Array(v) => (ElementType::Int, 2, FlatArray::Int(bytemuck::cast_slice::<IVec2, i32>(v).to_vec())),
        AttributeValue::Int3Array(v) => (ElementType::Int, 3, FlatArray::Int(bytemuck::cast_slice::<IVec3, i32>(v).to_vec())),
        _ => return None,
    };
    Some(flat)
}

// ============================================================================
// Encode
// ============================================================================

/// Encode a value as text for the given key.
///
/// Fails if the value's variant disagrees with the key's type prefix.
pub fn encode_value(key: &str, value: &AttributeValue) -> Result<String, CodecError> {
    let kind = classify_key(key);
    let mismatch = || CodecError::TypeMismatch {
        key: key.to_string(),
        expected: kind,
        actual: value.variant_name(),
    };

    let text = match (kind, value) {
        (_, AttributeValue::Struct(_)) => {
            return Err(CodecError::NotEncodable { key: key.to_string(), actual: value.variant_name() })
        }
        (AttributeKind::Int, AttributeValue::Int(v)) => v.to_string(),
        (AttributeKind::Float, AttributeValue::Float(v)) => v.to_string(),
        (AttributeKind::Bool, AttributeValue::Bool(v)) => v.to_string(),
        (AttributeKind::String, AttributeValue::String(v)) => v.clone(),
        (AttributeKind::Vector3, AttributeValue::Vector3(v)) => format!("{} {} {}", v.x, v.y, v.z),
        (AttributeKind::Quaternion, AttributeValue::Quaternion(q)) => {
            format!("{} {} {} {}", q.x, q.y, q.z, q.w)
        }
        (AttributeKind::Color, AttributeValue::Color(c)) => format!("{} {} {} {}", c.x, c.y, c.z, c.w),
        (AttributeKind::Bytes, AttributeValue::Bytes(v)) => STANDARD.encode(v),
        (AttributeKind::TextArray(elem, comps), v) | (AttributeKind::BinaryArray(elem, comps), v) => {
            let (e, c, flat) = flatten_array(v).ok_or_else(mismatch)?;
            if e != elem || c != comps {
                return Err(mismatch());
            }
            if matches!(kind, AttributeKind::TextArray(..)) {
                flat.to_text()
            } else {
                STANDARD.encode(flat.to_le_bytes())
            }
        }
        _ => return Err(mismatch()),
    };
    Ok(text)
}

// ============================================================================
// Decode
// ============================================================================

/// Decode a raw text value according to the key's type prefix.
pub fn decode_value(key: &str, raw: &str) -> Result<AttributeValue, CodecError> {
    let value = match classify_key(key) {
        AttributeKind::Int => AttributeValue::Int(parse_one(key, raw.trim(), "int")?),
        AttributeKind::Float => AttributeValue::Float(parse_one(key, raw.trim(), "float")?),
        AttributeKind::Bool => AttributeValue::Bool(parse_bool(key, raw)?),
        AttributeKind::String => AttributeValue::String(raw.to_string()),
        AttributeKind::Vector3 => {
            let c = parse_components::<f32>(key, raw, 3)?;
            AttributeValue::Vector3(Vec3::new(c[0], c[1], c[2]))
        }
        AttributeKind::Quaternion => {
            let c = parse_components::<f32>(key, raw, 4)?;
            AttributeValue::Quaternion(Quat::from_xyzw(c[0], c[1], c[2], c[3]))
        }
        AttributeKind::Color => {
            let c = parse_components::<f32>(key, raw, 4)?;
            AttributeValue::Color(Vec4::new(c[0], c[1], c[2], c[3]))
        }
        AttributeKind::Bytes => AttributeValue::Bytes(decode_base64(key, raw)?),
        AttributeKind::TextArray(elem, comps) => {
            let flat = match elem {
                ElementType::Double => FlatArray::Double(parse_list(key, raw)?),
                ElementType::Float => FlatArray::Float(parse_list(key, raw)?),
                ElementType::Int => FlatArray::Int(parse_list(key, raw)?),
            };
            if flat.len() % comps as usize != 0 {
                return Err(CodecError::ArrayLength {
                    key: key.to_string(),
                    len: flat.len(),
                    components: comps as usize,
                });
            }
            flat.into_value(comps)
        }
        AttributeKind::BinaryArray(elem, comps) => {
            let bytes = decode_base64(key, raw)?;
            let stride = comps as usize * elem.num_bytes();
            let length_error = || CodecError::BinaryLength { key: key.to_string(), len: bytes.len(), stride };
            if bytes.len() % stride != 0 {
                return Err(length_error());
            }
            FlatArray::from_le_bytes(elem, &bytes).ok_or_else(length_error)?.into_value(comps)
        }
    };
    Ok(value)
}

fn parse_one<T: std::str::FromStr>(key: &str, raw: &str, expected: &'static str) -> Result<T, CodecError> {
    raw.parse().map_err(|_| CodecError::Parse {
        key: key.to_string(),
        raw: raw.to_string(),
        expected,
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, CodecError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(CodecError::Parse { key: key.to_string(), raw: raw.to_string(), expected: "bool" }),
    }
}

fn parse_list<T: std::str::FromStr>(key: &str, raw: &str) -> Result<Vec<T>, CodecError> {
    raw.split_whitespace().map(|s| parse_one(key, s, "number")).collect()
}

fn parse_components<T: std::str::FromStr>(key: &str, raw: &str, n: usize) -> Result<Vec<T>, CodecError> {
    let values: Vec<T> = parse_list(key, raw)?;
    if values.len() != n {
        return Err(CodecError::ComponentCount { key: key.to_string(), expected: n, actual: values.len() });
    }
    Ok(values)
}

fn decode_base64(key: &str, raw: &str) -> Result<Vec<u8>, CodecError> {
    STANDARD
        .decode(raw.trim())
        .map_err(|source| CodecError::Base64 { key: key.to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_prefixes() {
        assert_eq!(classify_key("iSlices"), AttributeKind::Int);
        assert_eq!(classify_key("fRadius"), AttributeKind::Float);
        assert_eq!(classify_key("bClosed"), AttributeKind::Bool);
        assert_eq!(classify_key("vPosition"), AttributeKind::Vector3);
        assert_eq!(classify_key("qOrientation"), AttributeKind::Quaternion);
        assert_eq!(classify_key("cColor"), AttributeKind::Color);
        assert_eq!(classify_key("zd3Vertices"), AttributeKind::TextArray(ElementType::Double, 3));
        assert_eq!(classify_key("xf2UVs"), AttributeKind::BinaryArray(ElementType::Float, 2));
        assert_eq!(classify_key("zi3Tris"), AttributeKind::TextArray(ElementType::Int, 3));
        assert_eq!(classify_key("xbVertices"), AttributeKind::Bytes);
        assert_eq!(classify_key("sName"), AttributeKind::String);
        assert_eq!(classify_key("zq3Odd"), AttributeKind::String);
        assert_eq!(classify_key("zd4Odd"), AttributeKind::String);
        assert_eq!(classify_key(""), AttributeKind::String);
    }

    #[test]
    fn test_vec3_text_roundtrip() {
        let v = AttributeValue::Vector3(Vec3::new(1.0, 2.5, -3.25));
        let text = encode_value("vPosition", &v).unwrap();
        assert_eq!(text, "1 2.5 -3.25");

        let AttributeValue::Vector3(back) = decode_value("vPosition", &text).unwrap() else {
            panic!("expected vector");
        };
        assert!((back - Vec3::new(1.0, 2.5, -3.25)).abs().max_element() < 1e-6);
    }

    #[test]
    fn test_float_text_is_exact() {
        let x = 0.1f32 + 0.2f32;
        let text = encode_value("fValue", &AttributeValue::Float(x)).unwrap();
        assert_eq!(decode_value("fValue", &text).unwrap(), AttributeValue::Float(x));
    }

    #[test]
    fn test_text_array_roundtrip() {
        let pts = vec![DVec3::new(0.0, 1.0, 2.0), DVec3::new(-1.5, 1e-9, 3.25)];
        let v = AttributeValue::Vec3dArray(pts.clone());
        let text = encode_value("zd3Vertices", &v).unwrap();
        assert_eq!(decode_value("zd3Vertices", &text).unwrap(), v);
    }

    #[test]
    fn test_text_array_bad_length_rejected() {
        let err = decode_value("zd3Vertices", "1 2 3 4").unwrap_err();
        assert!(matches!(err, CodecError::ArrayLength { len: 4, components: 3, .. }));
    }

    #[test]
    fn test_binary_array_roundtrip() {
        let uvs = vec![Vec2::new(0.0, 1.0), Vec2::new(0.25, 0.75)];
        let v = AttributeValue::Vec2fArray(uvs);
        let text = encode_value("xf2UVs", &v).unwrap();
        assert_eq!(decode_value("xf2UVs", &text).unwrap(), v);
    }

    #[test]
    fn test_binary_array_corrupt_length() {
        let text = STANDARD.encode([0u8; 10]);
        let err = decode_value("xd2Pts", &text).unwrap_err();
        assert!(matches!(err, CodecError::BinaryLength { len: 10, stride: 16, .. }));
    }

    #[test]
    fn test_empty_arrays() {
        assert_eq!(decode_value("zi3Tris", "").unwrap(), AttributeValue::Int3Array(Vec::new()));
        assert_eq!(decode_value("xi2Pairs", "").unwrap(), AttributeValue::Int2Array(Vec::new()));
    }

    #[test]
    fn test_type_mismatch_on_encode() {
        let err = encode_value("fRadius", &AttributeValue::Int(3)).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));

        let err = encode_value("zd3Vertices", &AttributeValue::Vec3fArray(Vec::new())).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn test_bool_and_parse_errors() {
        assert_eq!(decode_value("bClosed", "1").unwrap(), AttributeValue::Bool(true));
        assert_eq!(decode_value("bClosed", "False").unwrap(), AttributeValue::Bool(false));
        assert!(decode_value("bClosed", "maybe").is_err());
        assert!(decode_value("iCount", "1.5").is_err());
        assert!(decode_value("cColor", "1 1 1").is_err());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let v = AttributeValue::Bytes(vec![0, 1, 2, 250, 255]);
        let text = encode_value("xbData", &v).unwrap();
        assert_eq!(decode_value("xbData", &text).unwrap(), v);
    }
}
