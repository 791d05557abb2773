//! In-memory transport.
//!
//! [`EventLog`] records writer calls as [`StreamEvent`]s, with attribute
//! values already text-encoded through the key codec, and replays them to a
//! [`SceneEventHandler`]. It behaves like a text transport without the bytes.

use super::{SceneEventHandler, SceneReader, SceneWriter};
use crate::core::{encode_value, AttributeValue};
use crate::util::{Error, Result};

/// One recorded stream event.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    BeginScene { version: String },
    EndScene,
    BeginSceneObject,
    EndSceneObject,
    BeginStruct { type_name: String, identifier: Option<String> },
    EndStruct,
    Attribute { name: String, value: String, inline: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriterState {
    Idle,
    InScene,
    InObject,
    Closed,
}

/// Recorded event stream; both a [`SceneWriter`] and a [`SceneReader`].
#[derive(Clone, Debug)]
pub struct EventLog {
    events: Vec<StreamEvent>,
    state: WriterState,
    struct_depth: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Create an empty log ready for writing.
    pub fn new() -> Self {
        Self { events: Vec::new(), state: WriterState::Idle, struct_depth: 0 }
    }

    /// Wrap a pre-built event sequence for replay.
    ///
    /// No ordering checks are made; replaying a malformed sequence is how
    /// protocol handling is exercised.
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        Self { events, state: WriterState::Closed, struct_depth: 0 }
    }

    /// Recorded events.
    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    /// Consume the log, returning its events.
    pub fn into_events(self) -> Vec<StreamEvent> {
        self.events
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn expect_state(&self, expected: WriterState, call: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::protocol(call, format!("{:?}", self.state)));
        }
        Ok(())
    }
}

impl SceneWriter for EventLog {
    fn begin_scene(&mut self, version: &str) -> Result<()> {
        self.expect_state(WriterState::Idle, "BeginScene")?;
        self.state = WriterState::InScene;
        self.events.push(StreamEvent::BeginScene { version: version.to_string() });
        Ok(())
    }

    fn end_scene(&mut self) -> Result<()> {
        self.expect_state(WriterState::InScene, "EndScene")?;
        self.state = WriterState::Closed;
        self.events.push(StreamEvent::EndScene);
        Ok(())
    }

    fn begin_scene_object(&mut self) -> Result<()> {
        self.expect_state(WriterState::InScene, "BeginSceneObject")?;
        self.state = WriterState::InObject;
        self.events.push(StreamEvent::BeginSceneObject);
        Ok(())
    }

    fn end_scene_object(&mut self) -> Result<()> {
        self.expect_state(WriterState::InObject, "EndSceneObject")?;
        if self.struct_depth != 0 {
            return Err(Error::protocol("EndSceneObject", format!("{} open structs", self.struct_depth)));
        }
        self.state = WriterState::InScene;
        self.events.push(StreamEvent::EndSceneObject);
        Ok(())
    }

    fn begin_struct(&mut self, type_name: &str, identifier: Option<&str>) -> Result<()> {
        self.expect_state(WriterState::InObject, "BeginStruct")?;
        self.struct_depth += 1;
        self.events.push(StreamEvent::BeginStruct {
            type_name: type_name.to_string(),
            identifier: identifier.map(str::to_string),
        });
        Ok(())
    }

    fn end_struct(&mut self) -> Result<()> {
        self.expect_state(WriterState::InObject, "EndStruct")?;
        if self.struct_depth == 0 {
            return Err(Error::protocol("EndStruct", "no open struct"));
        }
        self.struct_depth -= 1;
        self.events.push(StreamEvent::EndStruct);
        Ok(())
    }

    fn add_attribute(&mut self, name: &str, value: &AttributeValue, inline: bool) -> Result<()> {
        self.expect_state(WriterState::InObject, "AddAttribute")?;
        let encoded = encode_value(name, value)?;
        self.events.push(StreamEvent::Attribute { name: name.to_string(), value: encoded, inline });
        Ok(())
    }
}

impl SceneReader for EventLog {
    fn read_scene(&mut self, handler: &mut dyn SceneEventHandler) -> Result<()> {
        for event in &self.events {
            match event {
                StreamEvent::BeginScene { version } => handler.on_begin_scene(version)?,
                StreamEvent::EndScene => handler.on_end_scene()?,
                StreamEvent::BeginSceneObject => handler.on_begin_scene_object()?,
                StreamEvent::EndSceneObject => handler.on_end_scene_object()?,
                StreamEvent::BeginStruct { type_name, identifier } => {
                    handler.on_begin_struct(type_name, identifier.as_deref())?
                }
                StreamEvent::EndStruct => handler.on_end_struct()?,
                StreamEvent::Attribute { name, value, .. } => handler.on_attribute(name, value)?,
            }
        }
        Ok(())
    }
}
