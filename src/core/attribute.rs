//! Attribute values and the attribute tree.
//!
//! An [`AttributeTree`] holds the persisted state of one scene object or one
//! nested struct. Keys carry a type prefix (see [`crate::core::key_codec`]);
//! nested structs live under `"<Type>"` or `"<Type>:<id>"` keys.

use std::fmt;

use crate::util::{DVec2, DVec3, IVec2, IVec3, Quat, Vec2, Vec3, Vec4};

/// A single attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    String(String),
    Vector3(Vec3),
    Quaternion(Quat),
    /// RGBA color.
    Color(Vec4),
    Vec2fArray(Vec<Vec2>),
    Vec3fArray(Vec<Vec3>),
    Vec2dArray(Vec<DVec2>),
    Vec3dArray(Vec<DVec3>),
    Int2Array(Vec<IVec2>),
    Int3Array(Vec<IVec3>),
    /// Raw byte buffer.
    Bytes(Vec<u8>),
    /// Nested struct.
    Struct(AttributeTree),
}

impl AttributeValue {
    /// Short variant name, used in diagnostics.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Vector3(_) => "vector3",
            Self::Quaternion(_) => "quaternion",
            Self::Color(_) => "color",
            Self::Vec2fArray(_) => "vec2f[]",
            Self::Vec3fArray(_) => "vec3f[]",
            Self::Vec2dArray(_) => "vec2d[]",
            Self::Vec3dArray(_) => "vec3d[]",
            Self::Int2Array(_) => "int2[]",
            Self::Int3Array(_) => "int3[]",
            Self::Bytes(_) => "bytes",
            Self::Struct(_) => "struct",
        }
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for AttributeValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec3> for AttributeValue {
    fn from(v: Vec3) -> Self {
        Self::Vector3(v)
    }
}

impl From<Quat> for AttributeValue {
    fn from(v: Quat) -> Self {
        Self::Quaternion(v)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// Build the tree key for a nested struct.
pub fn struct_key(type_name: &str, identifier: Option<&str>) -> String {
    match identifier {
        Some(id) if !id.is_empty() => format!("{type_name}:{id}"),
        _ => type_name.to_string(),
    }
}

/// Split a struct key into type name and optional identifier.
pub fn parse_struct_key(key: &str) -> (&str, Option<&str>) {
    match key.split_once(':') {
        Some((ty, id)) => (ty, Some(id)),
        None => (key, None),
    }
}

/// Insertion-ordered key/value container with exact-key lookup.
#[derive(Clone, Default, PartialEq)]
pub struct AttributeTree {
    entries: Vec<(String, AttributeValue)>,
}

impl AttributeTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing an existing entry with the same key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();

        for (k, v) in &mut self.entries {
            if k == &key {
                *v = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Remove a key and return its value.
    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Number of entries (attributes and structs).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    // === Structs ===

    /// Attach a nested struct.
    pub fn insert_struct(&mut self, type_name: &str, identifier: Option<&str>, tree: AttributeTree) {
        self.insert(struct_key(type_name, identifier), AttributeValue::Struct(tree));
    }

    /// Get a nested struct by type and identifier.
    pub fn get_struct(&self, type_name: &str, identifier: Option<&str>) -> Option<&AttributeTree> {
        match self.get(&struct_key(type_name, identifier))? {
            AttributeValue::Struct(tree) => Some(tree),
            _ => None,
        }
    }

    /// All nested structs of one type, with their identifiers, in insertion order.
    pub fn structs_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = (Option<&'a str>, &'a AttributeTree)> + 'a {
        self.entries.iter().filter_map(move |(k, v)| match v {
            AttributeValue::Struct(tree) => {
                let (ty, id) = parse_struct_key(k);
                (ty == type_name).then_some((id, tree))
            }
            _ => None,
        })
    }

    // === Typed getters ===
    // Each returns None on a missing key or a variant mismatch.

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.get(key)? {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.get(key)? {
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            AttributeValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_vec3(&self, key: &str) -> Option<Vec3> {
        match self.get(key)? {
            AttributeValue::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_quat(&self, key: &str) -> Option<Quat> {
        match self.get(key)? {
            AttributeValue::Quaternion(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_color(&self, key: &str) -> Option<Vec4> {
        match self.get(key)? {
            AttributeValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        match self.get(key)? {
            AttributeValue::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_vec2d_array(&self, key: &str) -> Option<&[DVec2]> {
        match self.get(key)? {
            AttributeValue::Vec2dArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_vec3d_array(&self, key: &str) -> Option<&[DVec3]> {
        match self.get(key)? {
            AttributeValue::Vec3dArray(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for AttributeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl FromIterator<(String, AttributeValue)> for AttributeTree {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        let mut tree = Self::new();
        for (k, v) in iter {
            tree.insert(k, v);
        }
        tree
    }
}
