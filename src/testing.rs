//! Call-recording engine for unit tests.

use crate::native::{Action, HandleId, NativeConfig, StateCallback, StateDescriptor, SwitchEngine};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String, Option<NativeConfig>),
    Set(HandleId, bool),
    Toggle(HandleId),
    Get(HandleId),
    HandlerSet(HandleId),
    HandlerReset(HandleId),
    Close(HandleId),
}

/// Engine double: records every call and returns scripted native results.
/// State callbacks only run when a test fires them through [`fire`](Self::fire).
pub struct RecordingEngine {
    next_index: AtomicU32,
    fail_create: AtomicBool,
    native_state: Mutex<HashMap<HandleId, i32>>,
    handlers: Mutex<HashMap<HandleId, StateCallback>>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            next_index: AtomicU32::new(0),
            fail_create: AtomicBool::new(false),
            native_state: Mutex::new(HashMap::new()),
            handlers: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_native_state(&self, handle: HandleId, value: i32) {
        self.native_state.lock().insert(handle, value);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn closed(&self) -> Vec<HandleId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Close(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    pub fn has_handler(&self, handle: HandleId) -> bool {
        self.handlers.lock().contains_key(&handle)
    }

    /// Simulate a native state access. Returns the callback result and the
    /// descriptor value after the callback, or `None` if no callback is set.
    pub fn fire(&self, handle: HandleId, action: Action, value: i32) -> Option<(bool, i32)> {
        let callback = self.handlers.lock().get(&handle).cloned()?;
        let mut descriptor = StateDescriptor::new(handle, value);
        let result = callback(action, &mut descriptor);
        Some((result, descriptor.value()))
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl SwitchEngine for RecordingEngine {
    fn create_handle(&self, id: &str, config: Option<NativeConfig>) -> Option<HandleId> {
        self.record(Call::Create(id.to_string(), config));
        if self.fail_create.load(Ordering::SeqCst) {
            return None;
        }
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        Some(HandleId::new(index, 0))
    }

    fn state_set(&self, handle: HandleId, state: bool) -> bool {
        self.record(Call::Set(handle, state));
        self.set_native_state(handle, state as i32);
        true
    }

    fn state_toggle(&self, handle: HandleId) -> i32 {
        self.record(Call::Toggle(handle));
        let mut states = self.native_state.lock();
        let value = states.entry(handle).or_insert(0);
        *value = match *value {
            0 => 1,
            1 => 0,
            other => other,
        };
        *value
    }

    fn state_get(&self, handle: HandleId) -> i32 {
        self.record(Call::Get(handle));
        self.native_state.lock().get(&handle).copied().unwrap_or(0)
    }

    fn state_handler_set(&self, handle: HandleId, callback: StateCallback) -> bool {
        self.record(Call::HandlerSet(handle));
        self.handlers.lock().insert(handle, callback);
        true
    }

    fn state_handler_reset(&self, handle: HandleId) {
        self.record(Call::HandlerReset(handle));
        self.handlers.lock().remove(&handle);
    }

    fn close_handle(&self, handle: HandleId) {
        self.record(Call::Close(handle));
        self.handlers.lock().remove(&handle);
    }
}
