//! Registry of custom object types.
//!
//! Builders and emitters are keyed by type identifier. The registry is an
//! ordinary value: fill it before restoring and pass it to both store and
//! restore.

use std::collections::HashMap;
use std::fmt;

use super::{ObjectFactory, SceneSerializer};
use crate::core::AttributeTree;
use crate::scene::{Scene, SceneObject};
use crate::stream::SceneWriter;
use crate::util::Result;

/// Builds an object from its attribute tree. `Ok(None)` drops the record.
pub type BuilderFn =
    dyn Fn(&mut ObjectFactory<'_>, &dyn Scene, &AttributeTree) -> Result<Option<SceneObject>> + Send + Sync;

/// Writes an object's attributes. Returns `false` to fall back to the
/// built-in emitter.
pub type EmitterFn = dyn Fn(&SceneSerializer, &mut dyn SceneWriter, &SceneObject) -> Result<bool> + Send + Sync;

/// Custom builders and emitters by type id.
#[derive(Default)]
pub struct TypeRegistry {
    builders: HashMap<String, Box<BuilderFn>>,
    emitters: HashMap<String, Box<EmitterFn>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder, replacing any previous one for `type_id`.
    pub fn register_builder<F>(&mut self, type_id: impl Into<String>, builder: F)
    where
        F: Fn(&mut ObjectFactory<'_>, &dyn Scene, &AttributeTree) -> Result<Option<SceneObject>>
            + Send
            + Sync
            + 'static,
    {
        self.builders.insert(type_id.into(), Box::new(builder));
    }

    /// Register an emitter, replacing any previous one for `type_id`.
    pub fn register_emitter<F>(&mut self, type_id: impl Into<String>, emitter: F)
    where
        F: Fn(&SceneSerializer, &mut dyn SceneWriter, &SceneObject) -> Result<bool> + Send + Sync + 'static,
    {
        self.emitters.insert(type_id.into(), Box::new(emitter));
    }

    pub fn builder(&self, type_id: &str) -> Option<&BuilderFn> {
        self.builders.get(type_id).map(|b| b.as_ref())
    }

    pub fn emitter(&self, type_id: &str) -> Option<&EmitterFn> {
        self.emitters.get(type_id).map(|e| e.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty() && self.emitters.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builders: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        let mut emitters: Vec<&str> = self.emitters.keys().map(String::as_str).collect();
        builders.sort_unstable();
        emitters.sort_unstable();
        f.debug_struct("TypeRegistry")
            .field("builders", &builders)
            .field("emitters", &emitters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = TypeRegistry::new();
        assert!(registry.is_empty());

        registry.register_builder("light", |_, _, _| Ok(None));
        registry.register_emitter("light", |_, _, _| Ok(false));

        assert!(registry.builder("light").is_some());
        assert!(registry.emitter("light").is_some());
        assert!(registry.builder("box").is_none());
        assert!(format!("{registry:?}").contains("light"));
    }
}
