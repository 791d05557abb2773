//! Scene model and the scene collaborator interface.
//!
//! - [`SceneObject`] / [`ObjectKind`] - Typed objects the serializer persists
//! - [`Scene`] - What store and restore need from a scene
//! - [`MemoryScene`] - Plain in-memory implementation

mod object;

pub use object::{
    BoxShape, CustomObject, Cylinder, Keyframe, Material, MaterialKind, MeshReference, ObjectKind,
    PolyCurve, PolyTube, SceneObject, Sphere, Transform,
};

/// Scene collaborator used by store and restore.
pub trait Scene {
    /// Live objects, transient ones included.
    fn objects(&self) -> Box<dyn Iterator<Item = &SceneObject> + '_>;

    /// Insert a restored object.
    fn add_object(&mut self, object: SceneObject);

    /// Material for restored objects of `type_id` that carry none.
    fn default_material(&self, type_id: &str) -> Material;
}

/// Scene backed by a `Vec`.
#[derive(Clone, Debug, Default)]
pub struct MemoryScene {
    objects: Vec<SceneObject>,
    default_material: Material,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `material` as the default for every type.
    pub fn with_default_material(mut self, material: Material) -> Self {
        self.default_material = material;
        self
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects in insertion order.
    pub fn as_slice(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Find the first object with the given name.
    pub fn find(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }
}

impl Scene for MemoryScene {
    fn objects(&self) -> Box<dyn Iterator<Item = &SceneObject> + '_> {
        Box::new(self.objects.iter())
    }

    fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    fn default_material(&self, _type_id: &str) -> Material {
        self.default_material.clone()
    }
}
