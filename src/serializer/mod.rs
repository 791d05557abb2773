//! Scene serializer: full-scene store and restore.
//!
//! Store walks the scene's live, non-transient objects and pushes them
//! through a [`SceneWriter`]. Restore drives a state machine over
//! [`SceneReader`](crate::stream::SceneReader) events, collects one
//! [`AttributeTree`] per object and hands it to the [`ObjectFactory`].
//!
//! Custom object types plug in through a [`TypeRegistry`], passed
//! explicitly to both directions.

mod factory;
mod reference;
mod registry;
mod restore;
mod store;

pub use factory::ObjectFactory;
pub use reference::{reference_candidates, relative_path, resolve_reference, ImportedMesh, MeshImporter};
pub use registry::{BuilderFn, EmitterFn, TypeRegistry};
pub use restore::RestoreState;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::{parse_struct_key, AttributeTree, AttributeValue};
use crate::mesh::{MeshEncoding, StorageMode};
use crate::stream::SceneWriter;
use crate::util::Result;

// ============================================================================
// Options
// ============================================================================

/// Store and restore settings.
#[derive(Clone, Debug)]
pub struct SerializerOptions {
    /// Topology storage mode for meshes.
    pub mesh_storage: StorageMode,
    /// zlib-compress mesh buffers.
    pub compress_meshes: bool,
    /// Prefer speed over ratio when compressing.
    pub fast_compression: bool,
    /// Write curve and tube arrays as base64 (`x...` keys) instead of text.
    pub binary_arrays: bool,
    /// Path of the scene file; mesh references are resolved against its directory.
    pub scene_path: Option<PathBuf>,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            mesh_storage: StorageMode::EdgeRefCounts,
            compress_meshes: true,
            fast_compression: false,
            binary_arrays: false,
            scene_path: None,
        }
    }
}

impl SerializerOptions {
    pub fn with_mesh_storage(mut self, mode: StorageMode) -> Self {
        self.mesh_storage = mode;
        self
    }

    pub fn with_compression(mut self, compress: bool, fast: bool) -> Self {
        self.compress_meshes = compress;
        self.fast_compression = fast;
        self
    }

    pub fn with_binary_arrays(mut self, binary: bool) -> Self {
        self.binary_arrays = binary;
        self
    }

    pub fn with_scene_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.scene_path = Some(path.into());
        self
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Severity of a non-fatal restore message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Optional data absent, default used.
    Info,
    /// Data dropped: object, attribute or buffer skipped.
    Warning,
}

/// Non-fatal message produced during restore.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Name of the object being restored, when known.
    pub object: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            Some(name) => write!(f, "[{:?}] {}: {}", self.severity, name, self.message),
            None => write!(f, "[{:?}] {}", self.severity, self.message),
        }
    }
}

/// Outcome of a successful restore.
#[derive(Clone, Debug, Default)]
pub struct RestoreReport {
    /// Version tag found in the stream.
    pub version: Option<String>,
    /// Objects added to the scene.
    pub restored: usize,
    /// Object records that could not be built.
    pub skipped: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl RestoreReport {
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }
}

// ============================================================================
// Serializer
// ============================================================================

/// Stores scenes to a [`SceneWriter`] and restores them from a reader.
pub struct SceneSerializer {
    options: SerializerOptions,
    importer: Option<Box<dyn MeshImporter>>,
}

impl Default for SceneSerializer {
    fn default() -> Self {
        Self::new(SerializerOptions::default())
    }
}

impl fmt::Debug for SceneSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneSerializer")
            .field("options", &self.options)
            .field("importer", &self.importer.is_some())
            .finish()
    }
}

impl SceneSerializer {
    pub fn new(options: SerializerOptions) -> Self {
        Self { options, importer: None }
    }

    /// Reader used to load referenced mesh files during restore.
    pub fn with_importer(mut self, importer: impl MeshImporter + 'static) -> Self {
        self.importer = Some(Box::new(importer));
        self
    }

    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    pub fn importer(&self) -> Option<&dyn MeshImporter> {
        self.importer.as_deref()
    }

    /// Directory of the scene file, if known.
    pub fn scene_dir(&self) -> Option<&Path> {
        self.options.scene_path.as_deref().and_then(Path::parent)
    }

    /// Mesh codec settings derived from the options.
    pub fn mesh_encoding(&self) -> MeshEncoding {
        MeshEncoding {
            mode: self.options.mesh_storage,
            compress: self.options.compress_meshes,
            fast_compression: self.options.fast_compression,
        }
    }
}

/// Write every entry of `tree`, opening nested structs as they appear.
pub fn write_tree(writer: &mut dyn SceneWriter, tree: &AttributeTree) -> Result<()> {
    for (key, value) in tree.iter() {
        match value {
            AttributeValue::Struct(child) => {
                let (type_name, identifier) = parse_struct_key(key);
                writer.begin_struct(type_name, identifier)?;
                write_tree(writer, child)?;
                writer.end_struct()?;
            }
            value => writer.add_attribute(key, value, false)?,
        }
    }
    Ok(())
}
