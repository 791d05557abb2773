//! Builds scene objects from restored attribute trees.

use std::path::Path;

use tracing::{debug, info, warn};

use super::reference::resolve_reference;
use super::{Diagnostic, SceneSerializer, Severity, TypeRegistry};
use crate::core::constants::*;
use crate::core::AttributeTree;
use crate::mesh::{decode_mesh, find_mesh_struct, DMesh};
use crate::scene::{
    BoxShape, Cylinder, Keyframe, Material, MaterialKind, MeshReference, ObjectKind, PolyCurve, PolyTube, Scene,
    SceneObject, Sphere, Transform,
};
use crate::util::{DVec2, DVec3, Error, Quat, Result, Vec3, Vec4};

/// Turns one object's attribute tree into a [`SceneObject`].
///
/// Registered builders take precedence over the built-in types. Missing
/// optional attributes fall back to defaults and are noted as
/// [`Severity::Info`] diagnostics; dropped data is noted as a warning.
pub struct ObjectFactory<'a> {
    registry: &'a TypeRegistry,
    serializer: &'a SceneSerializer,
    diagnostics: Vec<Diagnostic>,
    current: Option<String>,
}

impl<'a> ObjectFactory<'a> {
    pub fn new(registry: &'a TypeRegistry, serializer: &'a SceneSerializer) -> Self {
        Self { registry, serializer, diagnostics: Vec::new(), current: None }
    }

    /// Build an object of `type_id`. `Ok(None)` means the record is dropped;
    /// a warning has been recorded.
    pub fn build(&mut self, scene: &dyn Scene, type_id: &str, tree: &AttributeTree) -> Result<Option<SceneObject>> {
        self.current = tree.get_string(ATTR_NAME).map(str::to_string);

        let registry = self.registry;
        if let Some(builder) = registry.builder(type_id) {
            debug!(type_id, "using registered builder");
            return builder(self, scene, tree);
        }

        // Transform is required for every typed object; check before any
        // payload decoding.
        if tree.get_struct(STRUCT_TRANSFORM, None).is_none() {
            return Err(Error::MissingStruct(STRUCT_TRANSFORM.to_string()));
        }

        let kind = match type_id {
            TYPE_BOX => ObjectKind::Box(BoxShape {
                width: self.float_or(tree, ATTR_WIDTH, 1.0),
                height: self.float_or(tree, ATTR_HEIGHT, 1.0),
                depth: self.float_or(tree, ATTR_DEPTH, 1.0),
            }),
            TYPE_SPHERE => ObjectKind::Sphere(Sphere { diameter: self.float_or(tree, ATTR_DIAMETER, 1.0) }),
            TYPE_CYLINDER => ObjectKind::Cylinder(Cylinder {
                radius: self.float_or(tree, ATTR_RADIUS, 0.5),
                height: self.float_or(tree, ATTR_HEIGHT, 1.0),
            }),
            TYPE_PIVOT => ObjectKind::Pivot,
            TYPE_POLYCURVE => ObjectKind::PolyCurve(PolyCurve {
                vertices: self.vertices(tree),
                closed: self.bool_or(tree, ATTR_CLOSED, false),
            }),
            TYPE_POLYTUBE => {
                let polygon = match self.vec2d_array(tree, ATTR_POLYGON_TEXT, ATTR_POLYGON_BINARY) {
                    Some(p) => p,
                    None => {
                        self.info("no cross-section polygon, using default circle");
                        PolyTube::default().polygon
                    }
                };
                ObjectKind::PolyTube(PolyTube {
                    vertices: self.vertices(tree),
                    closed: self.bool_or(tree, ATTR_CLOSED, false),
                    polygon,
                })
            }
            TYPE_DMESH => match self.restore_mesh(tree)? {
                Some(mesh) => ObjectKind::Mesh(mesh),
                None => return Ok(None),
            },
            TYPE_MESH_REFERENCE => match self.restore_mesh_reference(tree)? {
                Some(reference) => ObjectKind::MeshReference(reference),
                None => return Ok(None),
            },
            _ => {
                self.warn(format!("unknown object type '{type_id}'"));
                return Ok(None);
            }
        };

        self.build_object(scene, type_id, tree, kind).map(Some)
    }

    /// Assemble an object from the common attributes (name, uuid, transform,
    /// material, keyframes) and a type-specific payload.
    pub fn build_object(
        &mut self,
        scene: &dyn Scene,
        type_id: &str,
        tree: &AttributeTree,
        kind: ObjectKind,
    ) -> Result<SceneObject> {
        let transform = self.restore_transform(tree)?;

        let name = match tree.get_string(ATTR_NAME) {
            Some(n) => n.to_string(),
            None => {
                self.info("no name");
                String::new()
            }
        };
        let mut object = SceneObject::new(name, kind);
        match tree.get_string(ATTR_UUID) {
            Some(uuid) => object.uuid = uuid.to_string(),
            None => self.info("no uuid, generated a new one"),
        }
        object.transform = transform;
        object.material = Some(self.restore_material(scene, type_id, tree));
        object.keyframes = self.restore_keyframes(tree);
        Ok(object)
    }

    /// Read the required `Transform` struct.
    pub fn restore_transform(&mut self, tree: &AttributeTree) -> Result<Transform> {
        let t = tree
            .get_struct(STRUCT_TRANSFORM, None)
            .ok_or_else(|| Error::MissingStruct(STRUCT_TRANSFORM.to_string()))?;
        Ok(self.transform_fields(t))
    }

    /// Read the `Material` struct, or the scene default when absent.
    pub fn restore_material(&mut self, scene: &dyn Scene, type_id: &str, tree: &AttributeTree) -> Material {
        let Some(m) = tree.get_struct(STRUCT_MATERIAL, None) else {
            self.info("no material, using scene default");
            return scene.default_material(type_id);
        };
        let defaults = Material::default();
        let kind = match m.get_string(ATTR_MATERIAL_TYPE) {
            Some(s) => MaterialKind::parse(s).unwrap_or_else(|| {
                self.warn(format!("unknown material type '{s}', using standard"));
                MaterialKind::Standard
            }),
            None => {
                self.info("material has no type");
                defaults.kind
            }
        };
        let name = m.get_string(ATTR_MATERIAL_NAME).map_or(defaults.name, str::to_string);
        let color = self.color_or(m, ATTR_MATERIAL_COLOR, defaults.color);
        Material { kind, name, color }
    }

    /// Read keyframes, sorted by time. Entries without a time are dropped.
    pub fn restore_keyframes(&mut self, tree: &AttributeTree) -> Vec<Keyframe> {
        let Some(list) = tree.get_struct(STRUCT_KEYFRAME_LIST, None) else {
            return Vec::new();
        };
        let mut keyframes = Vec::new();
        for (_, k) in list.structs_of_type(STRUCT_KEYFRAME) {
            let Some(time) = k.get_float(ATTR_TIME) else {
                self.warn("keyframe without time dropped");
                continue;
            };
            keyframes.push(Keyframe { time, transform: self.transform_fields(k) });
        }
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        keyframes
    }

    /// Decode the mesh payload of a `dmesh` object.
    pub fn restore_mesh(&mut self, tree: &AttributeTree) -> Result<Option<DMesh>> {
        let Some((struct_name, payload)) = find_mesh_struct(tree) else {
            self.warn("mesh object has no mesh payload");
            return Ok(None);
        };
        match decode_mesh(struct_name, payload)? {
            Some(mesh) => Ok(Some(mesh)),
            None => {
                self.warn(format!("{struct_name} lacks vertex or triangle data"));
                Ok(None)
            }
        }
    }

    /// Locate and load a referenced mesh file.
    pub fn restore_mesh_reference(&mut self, tree: &AttributeTree) -> Result<Option<MeshReference>> {
        let relative = tree.get_string(ATTR_RELATIVE_PATH);
        let absolute = tree.get_string(ATTR_ABSOLUTE_PATH);
        if relative.is_none() && absolute.is_none() {
            self.warn("mesh reference has no path");
            return Ok(None);
        }

        let serializer = self.serializer;
        let Some(importer) = serializer.importer() else {
            self.warn("no mesh importer configured, reference dropped");
            return Ok(None);
        };
        let scene_dir = serializer.scene_dir().unwrap_or(Path::new("."));
        let Some(path) = resolve_reference(importer, scene_dir, relative, absolute) else {
            let missing = absolute.or(relative).unwrap_or_default();
            self.warn(Error::ReferenceNotFound(missing.into()).to_string());
            return Ok(None);
        };

        let imported = match importer.read_mesh(&path) {
            Ok(m) => m,
            Err(e) => {
                self.warn(format!("failed to read {}: {e}", path.display()));
                return Ok(None);
            }
        };
        let groups = (!imported.material_ids.is_empty()).then_some(imported.material_ids.as_slice());
        let mesh = DMesh::from_triangles(&imported.vertices, &imported.triangles, groups)?;
        Ok(Some(MeshReference { path, mesh }))
    }

    // ========================================================================
    // Optional attribute helpers
    // ========================================================================

    pub fn float_or(&mut self, tree: &AttributeTree, key: &str, default: f32) -> f32 {
        tree.get_float(key).unwrap_or_else(|| {
            self.info(format!("no {key}, using {default}"));
            default
        })
    }

    pub fn int_or(&mut self, tree: &AttributeTree, key: &str, default: i32) -> i32 {
        tree.get_int(key).unwrap_or_else(|| {
            self.info(format!("no {key}, using {default}"));
            default
        })
    }

    pub fn bool_or(&mut self, tree: &AttributeTree, key: &str, default: bool) -> bool {
        tree.get_bool(key).unwrap_or_else(|| {
            self.info(format!("no {key}, using {default}"));
            default
        })
    }

    pub fn vec3_or(&mut self, tree: &AttributeTree, key: &str, default: Vec3) -> Vec3 {
        tree.get_vec3(key).unwrap_or_else(|| {
            self.info(format!("no {key}"));
            default
        })
    }

    pub fn quat_or(&mut self, tree: &AttributeTree, key: &str, default: Quat) -> Quat {
        tree.get_quat(key).unwrap_or_else(|| {
            self.info(format!("no {key}"));
            default
        })
    }

    pub fn color_or(&mut self, tree: &AttributeTree, key: &str, default: Vec4) -> Vec4 {
        tree.get_color(key).unwrap_or_else(|| {
            self.info(format!("no {key}"));
            default
        })
    }

    /// Record an info diagnostic for the current object.
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message.into());
    }

    /// Record a warning diagnostic for the current object.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message.into());
    }

    /// Record a diagnostic raised outside [`build`](Self::build), keeping
    /// stream order with the factory's own.
    pub(crate) fn record(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn clear_current(&mut self) {
        self.current = None;
    }

    pub(crate) fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn push(&mut self, severity: Severity, message: String) {
        let object = self.current.as_deref().unwrap_or("<unnamed>");
        match severity {
            Severity::Info => info!(object, "{message}"),
            Severity::Warning => warn!(object, "{message}"),
        }
        self.diagnostics.push(Diagnostic { severity, object: self.current.clone(), message });
    }

    fn transform_fields(&mut self, t: &AttributeTree) -> Transform {
        Transform {
            position: self.vec3_or(t, ATTR_POSITION, Vec3::ZERO),
            rotation: self.quat_or(t, ATTR_ORIENTATION, Quat::IDENTITY),
            scale: self.vec3_or(t, ATTR_SCALE, Vec3::ONE),
        }
    }

    fn vertices(&mut self, tree: &AttributeTree) -> Vec<DVec3> {
        let found = tree
            .get_vec3d_array(ATTR_VERTICES_TEXT)
            .or_else(|| tree.get_vec3d_array(ATTR_VERTICES_BINARY));
        match found {
            Some(v) => v.to_vec(),
            None => {
                self.info("no vertices");
                Vec::new()
            }
        }
    }

    fn vec2d_array(&mut self, tree: &AttributeTree, text_key: &str, binary_key: &str) -> Option<Vec<DVec2>> {
        tree.get_vec2d_array(text_key)
            .or_else(|| tree.get_vec2d_array(binary_key))
            .map(<[DVec2]>::to_vec)
    }
}
