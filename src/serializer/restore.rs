//! Restore: reader events to scene objects.
//!
//! ```text
//! NoState --BeginScene--> InScene --BeginSceneObject--> InSceneObject
//!    InSceneObject --EndSceneObject--> InScene --EndScene--> Done
//! ```
//!
//! Any other transition is a protocol error and aborts the restore. Objects
//! are committed to the scene only once the stream reaches `Done`.

use std::fmt;

use tracing::{debug, info, trace, warn};

use super::{Diagnostic, ObjectFactory, RestoreReport, SceneSerializer, Severity, TypeRegistry};
use crate::core::constants::{ATTR_NAME, ATTR_TYPE, SCENE_VERSION};
use crate::core::{decode_value, struct_key, AttributeTree, AttributeValue};
use crate::scene::{Scene, SceneObject};
use crate::stream::{SceneEventHandler, SceneReader};
use crate::util::{Error, Result};

/// Position of the restore state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreState {
    NoState,
    InScene,
    InSceneObject,
    Done,
}

impl fmt::Display for RestoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Struct being filled, with the key it will be attached under.
struct OpenStruct {
    key: String,
    tree: AttributeTree,
}

struct RestoreHandler<'a> {
    state: RestoreState,
    factory: ObjectFactory<'a>,
    scene: &'a dyn Scene,
    object: AttributeTree,
    structs: Vec<OpenStruct>,
    pending: Vec<SceneObject>,
    version: Option<String>,
    skipped: usize,
}

impl<'a> RestoreHandler<'a> {
    fn new(factory: ObjectFactory<'a>, scene: &'a dyn Scene) -> Self {
        Self {
            state: RestoreState::NoState,
            factory,
            scene,
            object: AttributeTree::new(),
            structs: Vec::new(),
            pending: Vec::new(),
            version: None,
            skipped: 0,
        }
    }

    fn expect_state(&self, state: RestoreState, event: &str) -> Result<()> {
        if self.state != state {
            return Err(Error::protocol(event, self.state.to_string()));
        }
        Ok(())
    }

    fn current_tree(&mut self) -> &mut AttributeTree {
        match self.structs.last_mut() {
            Some(open) => &mut open.tree,
            None => &mut self.object,
        }
    }

    fn finish(self) -> Result<(Vec<SceneObject>, RestoreReport)> {
        if self.state != RestoreState::Done {
            return Err(Error::protocol("end of stream", self.state.to_string()));
        }
        let report = RestoreReport {
            version: self.version,
            restored: self.pending.len(),
            skipped: self.skipped,
            diagnostics: self.factory.into_diagnostics(),
        };
        Ok((self.pending, report))
    }

    fn skip(&mut self, message: String) {
        self.skipped += 1;
        self.factory.warn(message);
    }
}

impl SceneEventHandler for RestoreHandler<'_> {
    fn on_begin_scene(&mut self, version: &str) -> Result<()> {
        self.expect_state(RestoreState::NoState, "BeginScene")?;
        if version != SCENE_VERSION {
            warn!(version, expected = SCENE_VERSION, "scene version differs, reading anyway");
            self.factory.warn(format!("scene version {version}, expected {SCENE_VERSION}"));
        }
        self.version = Some(version.to_string());
        self.state = RestoreState::InScene;
        Ok(())
    }

    fn on_end_scene(&mut self) -> Result<()> {
        self.expect_state(RestoreState::InScene, "EndScene")?;
        self.state = RestoreState::Done;
        Ok(())
    }

    fn on_begin_scene_object(&mut self) -> Result<()> {
        self.expect_state(RestoreState::InScene, "BeginSceneObject")?;
        self.object = AttributeTree::new();
        self.state = RestoreState::InSceneObject;
        Ok(())
    }

    fn on_end_scene_object(&mut self) -> Result<()> {
        self.expect_state(RestoreState::InSceneObject, "EndSceneObject")?;
        if !self.structs.is_empty() {
            return Err(Error::protocol("EndSceneObject", format!("{} unclosed structs", self.structs.len())));
        }
        self.state = RestoreState::InScene;

        let tree = std::mem::take(&mut self.object);
        let Some(type_id) = tree.get_string(ATTR_TYPE) else {
            self.factory.clear_current();
            self.skip(format!("object without {ATTR_TYPE} dropped"));
            return Ok(());
        };

        let scene = self.scene;
        match self.factory.build(scene, type_id, &tree) {
            Ok(Some(object)) => {
                debug!(name = %object.name, type_id, "restored object");
                self.pending.push(object);
            }
            Ok(None) => self.skipped += 1,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => self.skip(format!("failed to build {type_id}: {e}")),
        }
        self.factory.clear_current();
        Ok(())
    }

    fn on_begin_struct(&mut self, type_name: &str, identifier: Option<&str>) -> Result<()> {
        self.expect_state(RestoreState::InSceneObject, "BeginStruct")?;
        self.structs.push(OpenStruct { key: struct_key(type_name, identifier), tree: AttributeTree::new() });
        Ok(())
    }

    fn on_end_struct(&mut self) -> Result<()> {
        self.expect_state(RestoreState::InSceneObject, "EndStruct")?;
        let open = self.structs.pop().ok_or_else(|| Error::protocol("EndStruct", "no open struct"))?;
        self.current_tree().insert(open.key, AttributeValue::Struct(open.tree));
        Ok(())
    }

    fn on_attribute(&mut self, name: &str, raw: &str) -> Result<()> {
        self.expect_state(RestoreState::InSceneObject, "Attribute")?;
        match decode_value(name, raw) {
            Ok(value) => {
                trace!(attribute = name, kind = value.variant_name(), "attribute decoded");
                self.current_tree().insert(name, value);
            }
            Err(e) => {
                let object = self.object.get_string(ATTR_NAME).map(str::to_string);
                warn!(attribute = name, error = %e, "attribute skipped");
                self.factory.record(Diagnostic {
                    severity: Severity::Warning,
                    object,
                    message: format!("attribute {name} skipped: {e}"),
                });
            }
        }
        Ok(())
    }
}

impl SceneSerializer {
    /// Read a scene from `reader` and add its objects to `scene`.
    ///
    /// Protocol errors abort with nothing inserted. Unreadable attributes
    /// and unbuildable objects are skipped and reported as diagnostics.
    pub fn restore(
        &self,
        reader: &mut dyn SceneReader,
        scene: &mut dyn Scene,
        registry: &TypeRegistry,
    ) -> Result<RestoreReport> {
        let (pending, report) = {
            let mut handler = RestoreHandler::new(ObjectFactory::new(registry, self), &*scene);
            reader.read_scene(&mut handler)?;
            handler.finish()?
        };
        for object in pending {
            scene.add_object(object);
        }
        info!(restored = report.restored, skipped = report.skipped, "scene restored");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::*;
    use crate::scene::MemoryScene;
    use crate::stream::{EventLog, StreamEvent};

    fn attr(name: &str, value: &str) -> StreamEvent {
        StreamEvent::Attribute { name: name.into(), value: value.into(), inline: true }
    }

    fn pivot_events(name: &str) -> Vec<StreamEvent> {
        vec![
            StreamEvent::BeginSceneObject,
            attr(ATTR_TYPE, TYPE_PIVOT),
            attr(ATTR_NAME, name),
            StreamEvent::BeginStruct { type_name: STRUCT_TRANSFORM.into(), identifier: None },
            attr(ATTR_POSITION, "1 2 3"),
            StreamEvent::EndStruct,
            StreamEvent::EndSceneObject,
        ]
    }

    fn scene_events(body: Vec<StreamEvent>) -> EventLog {
        let mut events = vec![StreamEvent::BeginScene { version: SCENE_VERSION.into() }];
        events.extend(body);
        events.push(StreamEvent::EndScene);
        EventLog::from_events(events)
    }

    fn restore(log: &mut EventLog, scene: &mut MemoryScene) -> Result<RestoreReport> {
        SceneSerializer::default().restore(log, scene, &TypeRegistry::new())
    }

    #[test]
    fn test_restore_pivot() {
        let mut log = scene_events(pivot_events("p"));
        let mut scene = MemoryScene::new();
        let report = restore(&mut log, &mut scene).unwrap();

        assert_eq!(report.restored, 1);
        assert_eq!(report.version.as_deref(), Some(SCENE_VERSION));
        let p = scene.find("p").unwrap();
        assert_eq!(p.transform.position, crate::util::Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_attribute_outside_object_is_fatal() {
        let mut body = pivot_events("a");
        body.push(attr(ATTR_NAME, "stray"));
        let mut log = scene_events(body);
        let mut scene = MemoryScene::new();

        let err = restore(&mut log, &mut scene).unwrap_err();
        assert!(err.is_fatal());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_attribute_before_any_object_is_fatal() {
        let mut log = scene_events(vec![attr(ATTR_NAME, "stray")]);
        let mut scene = MemoryScene::new();

        let err = restore(&mut log, &mut scene).unwrap_err();
        assert!(matches!(&err, Error::Protocol { state, .. } if state == "InScene"), "{err}");
        assert!(scene.is_empty());
    }

    #[test]
    fn test_attribute_before_scene_is_fatal() {
        let mut events = vec![attr(ATTR_NAME, "stray"), StreamEvent::BeginScene { version: SCENE_VERSION.into() }];
        events.extend(pivot_events("a"));
        events.push(StreamEvent::EndScene);
        let mut log = EventLog::from_events(events);
        let mut scene = MemoryScene::new();

        let err = restore(&mut log, &mut scene).unwrap_err();
        assert!(matches!(&err, Error::Protocol { state, .. } if state == "NoState"), "{err}");
        assert!(scene.is_empty());
    }

    #[test]
    fn test_diagnostics_follow_stream_order() {
        let mut body = vec![
            StreamEvent::BeginSceneObject,
            attr(ATTR_TYPE, "teapot"),
            attr(ATTR_NAME, "first"),
            StreamEvent::BeginStruct { type_name: STRUCT_TRANSFORM.into(), identifier: None },
            StreamEvent::EndStruct,
            StreamEvent::EndSceneObject,
        ];
        let mut second = pivot_events("second");
        second.insert(3, attr("fScale", "not-a-number"));
        body.extend(second);
        let mut log = scene_events(body);
        let mut scene = MemoryScene::new();

        let report = restore(&mut log, &mut scene).unwrap();
        let warnings: Vec<_> = report.warnings().map(|d| d.object.as_deref()).collect();
        assert_eq!(warnings, vec![Some("first"), Some("second")]);
    }

    #[test]
    fn test_truncated_stream_is_fatal() {
        let mut events = vec![StreamEvent::BeginScene { version: SCENE_VERSION.into() }];
        events.extend(pivot_events("a"));
        let mut log = EventLog::from_events(events);
        let mut scene = MemoryScene::new();

        assert!(restore(&mut log, &mut scene).unwrap_err().is_fatal());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_nested_objects_are_fatal() {
        let mut log = scene_events(vec![StreamEvent::BeginSceneObject, StreamEvent::BeginSceneObject]);
        let mut scene = MemoryScene::new();
        let err = restore(&mut log, &mut scene).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_bad_attribute_is_skipped() {
        let mut body = pivot_events("a");
        body.insert(2, attr("fScale", "not-a-number"));
        let mut log = scene_events(body);
        let mut scene = MemoryScene::new();

        let report = restore(&mut log, &mut scene).unwrap();
        assert_eq!(report.restored, 1);
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn test_untyped_object_is_skipped() {
        let mut body = vec![StreamEvent::BeginSceneObject, attr(ATTR_NAME, "x"), StreamEvent::EndSceneObject];
        body.extend(pivot_events("b"));
        let mut log = scene_events(body);
        let mut scene = MemoryScene::new();

        let report = restore(&mut log, &mut scene).unwrap();
        assert_eq!((report.restored, report.skipped), (1, 1));
        assert!(scene.find("b").is_some());
    }

    #[test]
    fn test_version_mismatch_warns() {
        let mut events = vec![StreamEvent::BeginScene { version: "0.9".into() }];
        events.extend(pivot_events("a"));
        events.push(StreamEvent::EndScene);
        let mut log = EventLog::from_events(events);
        let mut scene = MemoryScene::new();

        let report = restore(&mut log, &mut scene).unwrap();
        assert_eq!(report.restored, 1);
        assert!(report.warnings().any(|d| d.message.contains("0.9")));
    }
}
