//! # sceneio
//!
//! Scene graph persistence: stores a scene of typed objects (primitives,
//! curves, tubes, editable triangle meshes, referenced mesh files and
//! plugin-defined types) as a stream of structural events, and restores it.
//!
//! ## Modules
//!
//! - [`util`] - Errors and math types
//! - [`core`] - Attribute values, the key prefix codec, compression
//! - [`stream`] - Writer/reader event protocol and an in-memory stream
//! - [`mesh`] - Reference-counted triangle mesh and its binary codec
//! - [`scene`] - Scene objects and the scene interface
//! - [`serializer`] - Store, restore, object factory, type registry
//!
//! ## Example
//!
//! ```ignore
//! use sceneio::prelude::*;
//!
//! let serializer = SceneSerializer::default();
//! let registry = TypeRegistry::new();
//!
//! let mut log = EventLog::new();
//! serializer.store(&scene, &mut log, &registry)?;
//!
//! let mut restored = MemoryScene::new();
//! let report = serializer.restore(&mut log, &mut restored, &registry)?;
//! for d in &report.diagnostics {
//!     println!("{d}");
//! }
//! ```

pub mod util;
pub mod core;
pub mod stream;
pub mod mesh;
pub mod scene;
pub mod serializer;

// Re-export commonly used types
pub use util::{Error, Result};
pub use crate::core::{AttributeTree, AttributeValue};
pub use serializer::{SceneSerializer, SerializerOptions, TypeRegistry};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::core::{AttributeTree, AttributeValue};
    pub use crate::stream::{EventLog, SceneEventHandler, SceneReader, SceneWriter, StreamEvent};
    pub use crate::mesh::{DMesh, StorageMode};
    pub use crate::scene::*;
    pub use crate::serializer::{
        Diagnostic, ObjectFactory, RestoreReport, SceneSerializer, SerializerOptions, Severity, TypeRegistry,
    };
}
