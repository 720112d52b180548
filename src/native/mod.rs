//! Boundary to the native switch engine.
//!
//! The engine owns actuator state, timers and hardware access. This crate
//! talks to it only through the [`SwitchEngine`] trait; [`SoftEngine`] is an
//! in-process implementation used by the demo binary and the tests.

pub mod descriptor;
pub mod soft_engine;

pub use descriptor::{
    DescriptorSchema, FieldKind, FieldSpec, FieldValue, StateDescriptor, state_descriptor_schema,
};
pub use soft_engine::SoftEngine;

use std::fmt;
use std::sync::Arc;

/// Returned by `state_get`/`state_toggle` when the state cannot be determined.
pub const RESULT_ERROR: i32 = -1;

/// Opaque native handle: arena slot index plus generation.
///
/// A closed handle's generation is retired, so a stale token never resolves
/// to a newer switch occupying the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId {
    index: u32,
    generation: u32,
}

impl HandleId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Kind of state access reported to the state callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Action {
    /// A read is in progress; the callback must supply the value.
    Get,
    /// A write has been requested; the callback drives the actuator.
    Set,
}

/// Fully populated configuration block handed to `create_handle`.
///
/// `-1` in an integer field means "not set"; the engine substitutes its own
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeConfig {
    pub group_id: i32,
    pub inching_timeout: i32,
    pub inching_lock: bool,
    pub switching_time: i32,
}

impl NativeConfig {
    pub const NOT_SET: i32 = -1;

    pub fn new(group_id: i32, inching_timeout: i32, inching_lock: bool, switching_time: i32) -> Self {
        Self {
            group_id,
            inching_timeout,
            inching_lock,
            switching_time,
        }
    }
}

/// Callback invoked by the engine on every state access.
pub type StateCallback = Arc<dyn Fn(Action, &mut StateDescriptor) -> bool + Send + Sync>;

/// Native switch engine.
///
/// Callbacks are invoked synchronously from inside `state_set`,
/// `state_toggle`, `state_get` or engine-side triggers such as timers.
pub trait SwitchEngine: Send + Sync {
    /// Allocate a handle for `id`. The config block is consumed whether or
    /// not allocation succeeds.
    fn create_handle(&self, id: &str, config: Option<NativeConfig>) -> Option<HandleId>;

    fn state_set(&self, handle: HandleId, state: bool) -> bool;

    /// Returns 1/0 for the new state or another value on failure.
    fn state_toggle(&self, handle: HandleId) -> i32;

    /// Returns 1/0 for the current state or another value on failure.
    fn state_get(&self, handle: HandleId) -> i32;

    /// Install the single state callback for `handle`, replacing any prior one.
    fn state_handler_set(&self, handle: HandleId, callback: StateCallback) -> bool;

    fn state_handler_reset(&self, handle: HandleId);

    fn close_handle(&self, handle: HandleId);
}
