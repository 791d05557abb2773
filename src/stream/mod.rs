//! Stream protocol between the serializer and a transport binding.
//!
//! These traits are the whole contract a transport (XML, binary container,
//! in-memory log, ...) implements:
//! - [`SceneWriter`] receives strictly nested push calls during store
//! - [`SceneReader`] drives a [`SceneEventHandler`] during restore
//!
//! [`EventLog`] is an in-memory transport implementing both sides.

mod memory;

pub use memory::{EventLog, StreamEvent};

use crate::core::AttributeValue;
use crate::util::Result;

// ============================================================================
// Write side
// ============================================================================

/// Push interface used by the serializer while storing a scene.
///
/// Calls arrive strictly nested:
/// `begin_scene` → (`begin_scene_object` → attributes/structs →
/// `end_scene_object`)* → `end_scene`.
pub trait SceneWriter {
    /// Start the scene and record the format version.
    fn begin_scene(&mut self, version: &str) -> Result<()>;

    /// Finish the scene.
    fn end_scene(&mut self) -> Result<()>;

    /// Start one scene object.
    fn begin_scene_object(&mut self) -> Result<()>;

    /// Finish the current scene object.
    fn end_scene_object(&mut self) -> Result<()>;

    /// Open a nested struct inside the current object or struct.
    fn begin_struct(&mut self, type_name: &str, identifier: Option<&str>) -> Result<()>;

    /// Close the innermost open struct.
    fn end_struct(&mut self) -> Result<()>;

    /// Add an attribute to the innermost open object or struct.
    ///
    /// `inline` asks the transport to encode the value as a property of its
    /// container rather than a child element. It is a presentation hint only.
    fn add_attribute(&mut self, name: &str, value: &AttributeValue, inline: bool) -> Result<()>;
}

// ============================================================================
// Read side
// ============================================================================

/// Receiver of structural events produced by a [`SceneReader`].
///
/// Returning an error aborts the read.
pub trait SceneEventHandler {
    fn on_begin_scene(&mut self, version: &str) -> Result<()>;
    fn on_end_scene(&mut self) -> Result<()>;
    fn on_begin_scene_object(&mut self) -> Result<()>;
    fn on_end_scene_object(&mut self) -> Result<()>;
    fn on_begin_struct(&mut self, type_name: &str, identifier: Option<&str>) -> Result<()>;
    fn on_end_struct(&mut self) -> Result<()>;
    /// Attribute with its raw (still encoded) text value.
    fn on_attribute(&mut self, name: &str, raw_value: &str) -> Result<()>;
}

/// Event source implemented by a transport binding.
pub trait SceneReader {
    /// Emit every event of the stream to `handler`, synchronously and in order.
    fn read_scene(&mut self, handler: &mut dyn SceneEventHandler) -> Result<()>;
}
