//! Scene object types.

use std::path::PathBuf;

use crate::core::constants::*;
use crate::core::AttributeTree;
use crate::mesh::DMesh;
use crate::util::{DVec2, DVec3, Quat, Vec3, Vec4};

/// Local (object space) transform: translation, rotation, scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self { position: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE };

    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::IDENTITY }
    }

    /// Component-wise comparison within `eps`.
    pub fn abs_diff_eq(&self, other: &Self, eps: f32) -> bool {
        self.position.abs_diff_eq(other.position, eps)
            && self.rotation.abs_diff_eq(other.rotation, eps)
            && self.scale.abs_diff_eq(other.scale, eps)
    }
}

/// Kind of material; the renderer decides what each means.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MaterialKind {
    #[default]
    Standard,
    Flat,
    PerVertexColor,
    Transparent,
}

impl MaterialKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Flat => "flat",
            Self::PerVertexColor => "per_vertex_color",
            Self::Transparent => "transparent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Self::Standard),
            "flat" => Some(Self::Flat),
            "per_vertex_color" => Some(Self::PerVertexColor),
            "transparent" => Some(Self::Transparent),
            _ => None,
        }
    }
}

/// Persisted material: kind, name and RGBA color. Textures are not persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub name: String,
    pub color: Vec4,
}

impl Default for Material {
    fn default() -> Self {
        Self { kind: MaterialKind::Standard, name: "default".to_string(), color: Vec4::ONE }
    }
}

impl Material {
    pub fn new(kind: MaterialKind, name: impl Into<String>, color: Vec4) -> Self {
        Self { kind, name: name.into(), color }
    }
}

/// Transform at a point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub transform: Transform,
}

// ============================================================================
// Per-type payloads
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxShape {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl Default for BoxShape {
    fn default() -> Self {
        Self { width: 1.0, height: 1.0, depth: 1.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub diameter: f32,
}

impl Default for Sphere {
    fn default() -> Self {
        Self { diameter: 1.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cylinder {
    pub radius: f32,
    pub height: f32,
}

impl Default for Cylinder {
    fn default() -> Self {
        Self { radius: 0.5, height: 1.0 }
    }
}

/// Polyline through 3D points.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolyCurve {
    pub vertices: Vec<DVec3>,
    pub closed: bool,
}

/// Polygonal cross-section swept along a polyline.
#[derive(Clone, Debug, PartialEq)]
pub struct PolyTube {
    pub vertices: Vec<DVec3>,
    pub closed: bool,
    pub polygon: Vec<DVec2>,
}

impl Default for PolyTube {
    fn default() -> Self {
        Self { vertices: Vec::new(), closed: false, polygon: Self::circle_section(0.1, 8) }
    }
}

impl PolyTube {
    /// Regular polygon approximating a circle, counter-clockwise.
    pub fn circle_section(radius: f64, slices: usize) -> Vec<DVec2> {
        (0..slices)
            .map(|i| {
                let a = i as f64 / slices as f64 * std::f64::consts::TAU;
                DVec2::new(a.cos(), a.sin()) * radius
            })
            .collect()
    }
}

/// Mesh loaded from an external file.
#[derive(Clone, Debug, Default)]
pub struct MeshReference {
    /// Location of the source file.
    pub path: PathBuf,
    pub mesh: DMesh,
}

/// Object of a type handled by a registered plugin.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomObject {
    pub type_id: String,
    pub attributes: AttributeTree,
}

/// Type-specific payload of a scene object.
#[derive(Clone, Debug)]
pub enum ObjectKind {
    Box(BoxShape),
    Sphere(Sphere),
    Cylinder(Cylinder),
    Pivot,
    PolyCurve(PolyCurve),
    PolyTube(PolyTube),
    MeshReference(MeshReference),
    Mesh(DMesh),
    Custom(CustomObject),
}

impl ObjectKind {
    /// Type identifier written to the stream.
    pub fn type_id(&self) -> &str {
        match self {
            Self::Box(_) => TYPE_BOX,
            Self::Sphere(_) => TYPE_SPHERE,
            Self::Cylinder(_) => TYPE_CYLINDER,
            Self::Pivot => TYPE_PIVOT,
            Self::PolyCurve(_) => TYPE_POLYCURVE,
            Self::PolyTube(_) => TYPE_POLYTUBE,
            Self::MeshReference(_) => TYPE_MESH_REFERENCE,
            Self::Mesh(_) => TYPE_DMESH,
            Self::Custom(c) => &c.type_id,
        }
    }
}

/// One object in the scene.
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub name: String,
    /// Stable unique id.
    pub uuid: String,
    pub transform: Transform,
    pub material: Option<Material>,
    pub keyframes: Vec<Keyframe>,
    /// Transient objects (UI helpers, previews) are never stored.
    pub transient: bool,
    pub kind: ObjectKind,
}

impl SceneObject {
    /// Create an object with a fresh uuid and identity transform.
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            uuid: uuid::Uuid::new_v4().to_string(),
            transform: Transform::IDENTITY,
            material: None,
            keyframes: Vec::new(),
            transient: false,
            kind,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_keyframes(mut self, keyframes: Vec<Keyframe>) -> Self {
        self.keyframes = keyframes;
        self
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn type_id(&self) -> &str {
        self.kind.type_id()
    }

    /// Mesh carried by this object, if any.
    pub fn mesh(&self) -> Option<&DMesh> {
        match &self.kind {
            ObjectKind::Mesh(m) => Some(m),
            ObjectKind::MeshReference(r) => Some(&r.mesh),
            _ => None,
        }
    }
}
