//! In-process switch engine.
//!
//! Implements the native switch semantics entirely in software: handle
//! allocation, group exclusivity, inching countdowns with optional lock,
//! switching-time settle delays and state-updated notifications. The
//! actuator itself is whatever the registered state callback drives.
//!
//! The engine never holds its internal lock while invoking a state callback,
//! a settle function or a listener, so callbacks may freely query the engine.

use super::{
    Action, HandleId, NativeConfig, RESULT_ERROR, StateCallback, StateDescriptor, SwitchEngine,
};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const NO_GROUP: i32 = 0;
pub const NO_INCHING: i32 = 0;
pub const DEFAULT_SWITCHING_TIME: i32 = 10;

/// Listener notified after every completed state transition.
pub type StateListener = Arc<dyn Fn(HandleId, bool) + Send + Sync>;

/// Engine-side switch configuration, after default substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSwitchConfig {
    pub group_id: i32,
    pub inching_timeout: i32,
    pub inching_lock: bool,
    pub switching_time: i32,
}

impl Default for EngineSwitchConfig {
    fn default() -> Self {
        Self {
            group_id: NO_GROUP,
            inching_timeout: NO_INCHING,
            inching_lock: false,
            switching_time: DEFAULT_SWITCHING_TIME,
        }
    }
}

impl EngineSwitchConfig {
    fn from_native(config: Option<NativeConfig>) -> Self {
        let Some(cfg) = config else {
            return Self::default();
        };
        Self {
            group_id: if cfg.group_id <= 0 { NO_GROUP } else { cfg.group_id },
            inching_timeout: if cfg.inching_timeout <= 0 {
                NO_INCHING
            } else {
                cfg.inching_timeout
            },
            inching_lock: cfg.inching_lock,
            switching_time: if cfg.switching_time < 0 {
                DEFAULT_SWITCHING_TIME
            } else {
                cfg.switching_time
            },
        }
    }
}

struct Slot {
    id: String,
    config: EngineSwitchConfig,
    handler: Option<StateCallback>,
    inching_deadline: Option<Instant>,
}

struct Entry {
    generation: u32,
    slot: Option<Slot>,
}

#[derive(Default)]
struct Arena {
    entries: Vec<Entry>,
    free: Vec<u32>,
    live: usize,
}

impl Arena {
    fn get(&self, handle: HandleId) -> Option<&Slot> {
        self.entries
            .get(handle.index() as usize)
            .filter(|e| e.generation == handle.generation())
            .and_then(|e| e.slot.as_ref())
    }

    fn get_mut(&mut self, handle: HandleId) -> Option<&mut Slot> {
        self.entries
            .get_mut(handle.index() as usize)
            .filter(|e| e.generation == handle.generation())
            .and_then(|e| e.slot.as_mut())
    }

    fn insert(&mut self, slot: Slot) -> HandleId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.slot = Some(slot);
            return HandleId::new(index, entry.generation);
        }
        self.entries.push(Entry {
            generation: 0,
            slot: Some(slot),
        });
        HandleId::new((self.entries.len() - 1) as u32, 0)
    }

    fn remove(&mut self, handle: HandleId) -> Option<Slot> {
        let entry = self.entries.get_mut(handle.index() as usize)?;
        if entry.generation != handle.generation() {
            return None;
        }
        let slot = entry.slot.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.index());
        self.live -= 1;
        Some(slot)
    }

    fn iter(&self) -> impl Iterator<Item = (HandleId, &Slot)> {
        self.entries.iter().enumerate().filter_map(|(index, e)| {
            e.slot
                .as_ref()
                .map(|slot| (HandleId::new(index as u32, e.generation), slot))
        })
    }
}

/// Software implementation of [`SwitchEngine`].
pub struct SoftEngine {
    arena: Mutex<Arena>,
    capacity: Option<usize>,
    settle: Box<dyn Fn(Duration) + Send + Sync>,
    listeners: RwLock<Vec<StateListener>>,
}

impl SoftEngine {
    /// Create an engine with unbounded capacity that sleeps the calling
    /// thread for each switch's switching time.
    pub fn new() -> Self {
        Self {
            arena: Mutex::new(Arena::default()),
            capacity: None,
            settle: Box::new(std::thread::sleep),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Limit the number of live handles; further allocations fail.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Replace the switching-time wait.
    pub fn with_settle<F>(mut self, settle: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.settle = Box::new(settle);
        self
    }

    /// Subscribe to completed state transitions.
    pub fn on_state_updated(&self, listener: StateListener) {
        self.listeners.write().push(listener);
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.arena.lock().live
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self, handle: HandleId) -> Option<EngineSwitchConfig> {
        self.arena.lock().get(handle).map(|s| s.config)
    }

    pub fn switch_id(&self, handle: HandleId) -> Option<String> {
        self.arena.lock().get(handle).map(|s| s.id.clone())
    }

    /// Whether an inching countdown is running for `handle`.
    pub fn is_inching(&self, handle: HandleId) -> bool {
        self.arena
            .lock()
            .get(handle)
            .is_some_and(|s| s.inching_deadline.is_some())
    }

    pub fn has_handler(&self, handle: HandleId) -> bool {
        self.arena
            .lock()
            .get(handle)
            .is_some_and(|s| s.handler.is_some())
    }

    /// Switch off every switch whose inching countdown expired at `now`.
    ///
    /// Returns the number of expired countdowns.
    pub fn run_timers(&self, now: Instant) -> usize {
        let expired: Vec<HandleId> = {
            let mut arena = self.arena.lock();
            let due: Vec<HandleId> = arena
                .iter()
                .filter(|(_, s)| s.inching_deadline.is_some_and(|d| d <= now))
                .map(|(h, _)| h)
                .collect();
            for handle in &due {
                if let Some(slot) = arena.get_mut(*handle) {
                    slot.inching_deadline = None;
                }
            }
            due
        };

        for handle in &expired {
            debug!("Inching of {} expired, switching off", handle);
            if !self.set_off(*handle) {
                warn!("Failed to switch off {} after inching", handle);
            }
        }
        expired.len()
    }

    fn handler(&self, handle: HandleId) -> Option<StateCallback> {
        self.arena.lock().get(handle).and_then(|s| s.handler.clone())
    }

    fn describe(&self, handle: HandleId) -> String {
        self.switch_id(handle).unwrap_or_else(|| handle.to_string())
    }

    fn invoke(&self, handle: HandleId, action: Action, value: i32) -> Option<(bool, i32)> {
        let callback = self.handler(handle)?;
        let mut descriptor = StateDescriptor::new(handle, value);
        let handled = callback(action, &mut descriptor);
        Some((handled, descriptor.value()))
    }

    fn group_siblings(&self, handle: HandleId) -> Vec<HandleId> {
        let arena = self.arena.lock();
        let Some(group_id) = arena.get(handle).map(|s| s.config.group_id) else {
            return Vec::new();
        };
        if group_id == NO_GROUP {
            return Vec::new();
        }
        arena
            .iter()
            .filter(|(h, s)| *h != handle && s.config.group_id == group_id)
            .map(|(h, _)| h)
            .collect()
    }

    fn is_inching_locked(&self, handle: HandleId) -> bool {
        self.arena
            .lock()
            .get(handle)
            .is_some_and(|s| s.config.inching_lock && s.inching_deadline.is_some())
    }

    /// Cancel a running inching countdown. Fails when the countdown is locked.
    fn inching_del(&self, handle: HandleId) -> bool {
        let mut arena = self.arena.lock();
        let Some(slot) = arena.get_mut(handle) else {
            return true;
        };
        if slot.inching_deadline.is_some() {
            if slot.config.inching_lock {
                error!(
                    "Inching of '{}' is locked and cannot be turned off.",
                    slot.id
                );
                return false;
            }
            slot.inching_deadline = None;
        }
        true
    }

    fn settle_and_publish(&self, handle: HandleId, state: bool) {
        let switching_time = self.config(handle).map_or(0, |c| c.switching_time);
        if switching_time > 0 {
            (self.settle)(Duration::from_millis(switching_time as u64));
        }

        let listeners: Vec<StateListener> = self.listeners.read().clone();
        for listener in listeners {
            listener(handle, state);
        }
    }

    fn set_off(&self, handle: HandleId) -> bool {
        if !self.inching_del(handle) {
            return false;
        }

        match self.state_get(handle) {
            RESULT_ERROR => return false,
            0 => return true,
            _ => {}
        }

        if !matches!(self.invoke(handle, Action::Set, 0), Some((true, _))) {
            error!(
                "Error switching '{}' OFF because of state handler failure.",
                self.describe(handle)
            );
            return false;
        }

        self.settle_and_publish(handle, false);
        true
    }

    fn set_on(&self, handle: HandleId) -> bool {
        match self.state_get(handle) {
            RESULT_ERROR => return false,
            1 => return true,
            _ => {}
        }

        if let Some(locked) = self
            .group_siblings(handle)
            .into_iter()
            .find(|s| self.is_inching_locked(*s))
        {
            error!(
                "Error switching '{}' ON. '{}' has inching lock and it is still ON.",
                self.describe(handle),
                self.describe(locked)
            );
            return false;
        }

        if !self.inching_del(handle) {
            error!(
                "Error switching '{}' ON because inching could not be turned off.",
                self.describe(handle)
            );
            return false;
        }

        if !matches!(self.invoke(handle, Action::Set, 1), Some((true, _))) {
            error!(
                "Error switching '{}' ON because of state handler failure.",
                self.describe(handle)
            );
            return false;
        }

        self.settle_and_publish(handle, true);

        let mut arena = self.arena.lock();
        if let Some(slot) = arena.get_mut(handle)
            && slot.config.inching_timeout != NO_INCHING
        {
            let timeout = Duration::from_millis(slot.config.inching_timeout as u64);
            slot.inching_deadline = Some(Instant::now() + timeout);
        }
        true
    }
}

impl Default for SoftEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SwitchEngine for SoftEngine {
    fn create_handle(&self, id: &str, config: Option<NativeConfig>) -> Option<HandleId> {
        if id.is_empty() {
            error!("Error creating switch. The id must not be empty.");
            return None;
        }
        let config = EngineSwitchConfig::from_native(config);

        let mut arena = self.arena.lock();
        if arena.iter().any(|(_, s)| s.id == id) {
            error!("Error creating '{}'. Handle registration failed.", id);
            return None;
        }
        if self.capacity.is_some_and(|cap| arena.live >= cap) {
            error!("Error creating '{}'. Memory allocation failed.", id);
            return None;
        }

        let handle = arena.insert(Slot {
            id: id.to_string(),
            config,
            handler: None,
            inching_deadline: None,
        });
        debug!("Allocated {} for '{}' with {:?}", handle, id, config);
        Some(handle)
    }

    fn state_set(&self, handle: HandleId, state: bool) -> bool {
        if self.handler(handle).is_none() {
            return false;
        }

        if state {
            for sibling in self.group_siblings(handle) {
                if !self.set_off(sibling) {
                    error!(
                        "Error switching '{}' ON because switching off siblings failed.",
                        self.describe(handle)
                    );
                    return false;
                }
            }
            self.set_on(handle)
        } else {
            self.set_off(handle)
        }
    }

    fn state_toggle(&self, handle: HandleId) -> i32 {
        match self.state_get(handle) {
            1 if self.state_set(handle, false) => 0,
            0 if self.state_set(handle, true) => 1,
            _ => RESULT_ERROR,
        }
    }

    fn state_get(&self, handle: HandleId) -> i32 {
        match self.invoke(handle, Action::Get, 0) {
            Some((true, value)) => value,
            Some((false, _)) => {
                error!(
                    "Error reading '{}' state. The state handler failed.",
                    self.describe(handle)
                );
                RESULT_ERROR
            }
            None => RESULT_ERROR,
        }
    }

    // Callbacks may own other switches whose drop re-enters the engine, so
    // replaced handlers and removed slots are dropped after the lock is released.
    fn state_handler_set(&self, handle: HandleId, callback: StateCallback) -> bool {
        let mut arena = self.arena.lock();
        let Some(slot) = arena.get_mut(handle) else {
            drop(arena);
            return false;
        };
        let previous = slot.handler.replace(callback);
        drop(arena);
        drop(previous);
        true
    }

    fn state_handler_reset(&self, handle: HandleId) {
        let previous = self
            .arena
            .lock()
            .get_mut(handle)
            .and_then(|s| s.handler.take());
        drop(previous);
    }

    fn close_handle(&self, handle: HandleId) {
        let slot = self.arena.lock().remove(handle);
        match slot {
            Some(slot) => info!("Closed switch '{}' ({})", slot.id, handle),
            None => warn!("Close of unknown handle {}", handle),
        }
    }
}
