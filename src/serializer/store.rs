//! Store: scene objects to writer events.

use tracing::{debug, info, warn};

use super::reference::{portable_string, relative_path};
use super::{write_tree, SceneSerializer, TypeRegistry};
use crate::core::constants::*;
use crate::core::AttributeValue;
use crate::mesh::{encode_mesh, DMesh};
use crate::scene::{Keyframe, Material, MeshReference, ObjectKind, Scene, SceneObject, Transform};
use crate::stream::SceneWriter;
use crate::util::{DVec2, DVec3, Result};

impl SceneSerializer {
    /// Write every non-transient object of `scene`. Returns the number of
    /// objects stored.
    pub fn store(&self, scene: &dyn Scene, writer: &mut dyn SceneWriter, registry: &TypeRegistry) -> Result<usize> {
        writer.begin_scene(SCENE_VERSION)?;
        let mut stored = 0;
        for object in scene.objects() {
            if object.transient {
                debug!(name = %object.name, "skipping transient object");
                continue;
            }
            self.store_object(writer, object, registry)?;
            stored += 1;
        }
        writer.end_scene()?;
        info!(stored, "scene stored");
        Ok(stored)
    }

    /// Write one object record, preferring a registered emitter.
    pub fn store_object(
        &self,
        writer: &mut dyn SceneWriter,
        object: &SceneObject,
        registry: &TypeRegistry,
    ) -> Result<()> {
        debug!(name = %object.name, type_id = object.type_id(), "storing object");
        writer.begin_scene_object()?;
        let handled = match registry.emitter(object.type_id()) {
            Some(emit) => emit(self, &mut *writer, object)?,
            None => false,
        };
        if !handled {
            self.emit_builtin(writer, object)?;
        }
        writer.end_scene_object()
    }

    /// Type id, name and uuid.
    pub fn write_header(&self, writer: &mut dyn SceneWriter, type_id: &str, object: &SceneObject) -> Result<()> {
        writer.add_attribute(ATTR_TYPE, &AttributeValue::String(type_id.to_string()), true)?;
        writer.add_attribute(ATTR_NAME, &AttributeValue::String(object.name.clone()), true)?;
        writer.add_attribute(ATTR_UUID, &AttributeValue::String(object.uuid.clone()), true)
    }

    pub fn write_transform(&self, writer: &mut dyn SceneWriter, transform: &Transform) -> Result<()> {
        writer.begin_struct(STRUCT_TRANSFORM, None)?;
        write_transform_fields(writer, transform)?;
        writer.end_struct()
    }

    pub fn write_material(&self, writer: &mut dyn SceneWriter, material: &Material) -> Result<()> {
        writer.begin_struct(STRUCT_MATERIAL, None)?;
        writer.add_attribute(ATTR_MATERIAL_TYPE, &AttributeValue::String(material.kind.as_str().to_string()), true)?;
        writer.add_attribute(ATTR_MATERIAL_NAME, &AttributeValue::String(material.name.clone()), true)?;
        writer.add_attribute(ATTR_MATERIAL_COLOR, &AttributeValue::Color(material.color), true)?;
        writer.end_struct()
    }

    /// Keyframe list; nothing is written when `keyframes` is empty.
    pub fn write_keyframes(&self, writer: &mut dyn SceneWriter, keyframes: &[Keyframe]) -> Result<()> {
        if keyframes.is_empty() {
            return Ok(());
        }
        writer.begin_struct(STRUCT_KEYFRAME_LIST, None)?;
        for (i, k) in keyframes.iter().enumerate() {
            writer.begin_struct(STRUCT_KEYFRAME, Some(&i.to_string()))?;
            writer.add_attribute(ATTR_TIME, &AttributeValue::Float(k.time), true)?;
            write_transform_fields(writer, &k.transform)?;
            writer.end_struct()?;
        }
        writer.end_struct()
    }

    /// Header, transform, material and keyframes.
    pub fn write_common(&self, writer: &mut dyn SceneWriter, type_id: &str, object: &SceneObject) -> Result<()> {
        self.write_header(writer, type_id, object)?;
        self.write_transform(writer, &object.transform)?;
        if let Some(material) = &object.material {
            self.write_material(writer, material)?;
        }
        self.write_keyframes(writer, &object.keyframes)
    }

    /// Encode a mesh with the configured storage mode and compression.
    pub fn write_mesh(&self, writer: &mut dyn SceneWriter, mesh: &DMesh) -> Result<()> {
        let (struct_name, tree) = encode_mesh(mesh, &self.mesh_encoding())?;
        writer.begin_struct(struct_name, None)?;
        write_tree(writer, &tree)?;
        writer.end_struct()
    }

    fn emit_builtin(&self, writer: &mut dyn SceneWriter, object: &SceneObject) -> Result<()> {
        if let ObjectKind::Custom(custom) = &object.kind {
            warn!(type_id = %custom.type_id, name = %object.name, "no emitter registered, storing generic record");
            self.write_common(writer, &custom.type_id, object)?;
            return write_tree(writer, &custom.attributes);
        }

        self.write_common(writer, object.type_id(), object)?;
        match &object.kind {
            ObjectKind::Box(b) => {
                writer.add_attribute(ATTR_WIDTH, &AttributeValue::Float(b.width), true)?;
                writer.add_attribute(ATTR_HEIGHT, &AttributeValue::Float(b.height), true)?;
                writer.add_attribute(ATTR_DEPTH, &AttributeValue::Float(b.depth), true)
            }
            ObjectKind::Sphere(s) => writer.add_attribute(ATTR_DIAMETER, &AttributeValue::Float(s.diameter), true),
            ObjectKind::Cylinder(c) => {
                writer.add_attribute(ATTR_RADIUS, &AttributeValue::Float(c.radius), true)?;
                writer.add_attribute(ATTR_HEIGHT, &AttributeValue::Float(c.height), true)
            }
            ObjectKind::PolyCurve(c) => {
                writer.add_attribute(ATTR_CLOSED, &AttributeValue::Bool(c.closed), true)?;
                self.write_vertices(writer, &c.vertices)
            }
            ObjectKind::PolyTube(t) => {
                writer.add_attribute(ATTR_CLOSED, &AttributeValue::Bool(t.closed), true)?;
                self.write_vertices(writer, &t.vertices)?;
                self.write_polygon(writer, &t.polygon)
            }
            ObjectKind::MeshReference(r) => self.write_reference(writer, r),
            ObjectKind::Mesh(mesh) => self.write_mesh(writer, mesh),
            ObjectKind::Pivot | ObjectKind::Custom(_) => Ok(()),
        }
    }

    fn write_vertices(&self, writer: &mut dyn SceneWriter, vertices: &[DVec3]) -> Result<()> {
        let key = if self.options().binary_arrays { ATTR_VERTICES_BINARY } else { ATTR_VERTICES_TEXT };
        writer.add_attribute(key, &AttributeValue::Vec3dArray(vertices.to_vec()), false)
    }

    fn write_polygon(&self, writer: &mut dyn SceneWriter, polygon: &[DVec2]) -> Result<()> {
        let key = if self.options().binary_arrays { ATTR_POLYGON_BINARY } else { ATTR_POLYGON_TEXT };
        writer.add_attribute(key, &AttributeValue::Vec2dArray(polygon.to_vec()), false)
    }

    fn write_reference(&self, writer: &mut dyn SceneWriter, reference: &MeshReference) -> Result<()> {
        let relative = self.scene_dir().and_then(|dir| relative_path(dir, &reference.path));
        match relative {
            Some(rel) => {
                writer.add_attribute(ATTR_RELATIVE_PATH, &AttributeValue::String(portable_string(&rel)), true)?
            }
            None => debug!(path = %reference.path.display(), "no relative path for mesh reference"),
        }
        let absolute = reference.path.to_string_lossy().into_owned();
        writer.add_attribute(ATTR_ABSOLUTE_PATH, &AttributeValue::String(absolute), true)
    }
}

fn write_transform_fields(writer: &mut dyn SceneWriter, transform: &Transform) -> Result<()> {
    writer.add_attribute(ATTR_POSITION, &AttributeValue::Vector3(transform.position), true)?;
    writer.add_attribute(ATTR_ORIENTATION, &AttributeValue::Quaternion(transform.rotation), true)?;
    writer.add_attribute(ATTR_SCALE, &AttributeValue::Vector3(transform.scale), true)
}
