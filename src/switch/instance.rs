//! A created switch and its state operations.

use super::codec::StateValue;
use super::command::SwitchCommand;
use super::handle::SwitchHandle;
use super::marshaller::{HandlerBinding, StateAccessObserver, StateEvent, StateMarshaller};
use crate::native::{Action, HandleId};
use crate::thing::{SwitchInfo, ThingRegistry};
use log::{info, warn};
use parking_lot::RwLock;
use std::sync::Arc;

/// A switch created by [`SwitchFactory`](super::SwitchFactory).
///
/// Owns its native handle; dropping the switch (or calling [`close`](Self::close))
/// releases the handle. State operations run synchronously and may call the
/// installed state handler re-entrantly before returning.
pub struct Switch {
    info: Arc<SwitchInfo>,
    registry: Arc<ThingRegistry>,
    observer: RwLock<Option<Arc<dyn StateAccessObserver>>>,
    handle: SwitchHandle,
}

impl Switch {
    pub(crate) fn new(handle: SwitchHandle, id: &str, registry: Arc<ThingRegistry>) -> Self {
        Self {
            info: Arc::new(SwitchInfo::new(id, handle.id())),
            registry,
            observer: RwLock::new(None),
            handle,
        }
    }

    pub fn id(&self) -> &str {
        self.info.id()
    }

    pub fn handle_id(&self) -> HandleId {
        self.handle.id()
    }

    /// Shared identity, as carried by [`StateEvent::thing`].
    pub fn info(&self) -> &Arc<SwitchInfo> {
        &self.info
    }

    /// Request a new state. Only boolean values reach the engine; any other
    /// value is rejected with `false`.
    pub fn set_state(&self, state: impl Into<StateValue>) -> bool {
        match state.into() {
            StateValue::Bool(on) => self.handle.engine().state_set(self.handle.id(), on),
            other => {
                warn!("Ignoring non-boolean state {} for '{}'", other, self.id());
                false
            }
        }
    }

    pub fn get_state(&self) -> StateValue {
        StateValue::decode(self.handle.engine().state_get(self.handle.id()))
    }

    /// Flip the state; returns the new state.
    pub fn toggle_state(&self) -> StateValue {
        StateValue::decode(self.handle.engine().state_toggle(self.handle.id()))
    }

    /// Apply a text command. Returns whether the engine accepted it.
    pub fn execute(&self, command: SwitchCommand) -> bool {
        match command {
            SwitchCommand::On => self.set_state(true),
            SwitchCommand::Off => self.set_state(false),
            SwitchCommand::Toggle => self.toggle_state().as_bool().is_some(),
        }
    }

    /// Install `handler` with its `user_data` as the state handler, replacing
    /// any previous one.
    pub fn set_state_handler<H, U>(&self, handler: H, user_data: U) -> bool
    where
        H: Fn(Action, &mut StateEvent, &U) -> bool + Send + Sync + 'static,
        U: Send + Sync + 'static,
    {
        self.set_state_observer(Arc::new(HandlerBinding::new(handler, user_data)))
    }

    /// Install `observer` as the state handler, replacing any previous one.
    pub fn set_state_observer(&self, observer: Arc<dyn StateAccessObserver>) -> bool {
        let callback =
            StateMarshaller::new(observer.clone(), self.registry.clone()).into_callback();
        if !self.handle.engine().state_handler_set(self.handle.id(), callback) {
            warn!("Engine rejected the state handler for '{}'", self.id());
            return false;
        }
        let previous = self.observer.write().replace(observer);
        drop(previous);
        true
    }

    /// Detach the state handler. No further accesses reach it.
    pub fn reset_state_handler(&self) {
        self.handle.engine().state_handler_reset(self.handle.id());
        let previous = self.observer.write().take();
        drop(previous);
    }

    pub fn has_state_handler(&self) -> bool {
        self.observer.read().is_some()
    }

    /// Release the native handle.
    pub fn close(self) {
        info!("Closing switch '{}'", self.id());
    }
}

impl std::fmt::Debug for Switch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switch")
            .field("id", &self.id())
            .field("handle", &self.handle)
            .field("has_state_handler", &self.has_state_handler())
            .finish()
    }
}
