//! Bridge between the engine's state callback and user state handlers.
//!
//! Every native state access lands in [`StateMarshaller::dispatch`], which
//! decodes the descriptor into a [`StateEvent`], resolves the owning switch,
//! runs the observer and, for GET accesses, writes the event value back into
//! the descriptor. That write-back is the only path by which a handler
//! supplies state to the engine.

use super::codec::StateValue;
use crate::error::{Result, SwitchError};
use crate::native::{
    Action, DescriptorSchema, FieldValue, HandleId, StateCallback, StateDescriptor,
    state_descriptor_schema,
};
use crate::thing::{SwitchInfo, ThingRegistry};
use log::{debug, error};
use std::sync::Arc;

/// A single state access, materialised for the duration of one callback.
#[derive(Debug, Clone)]
pub struct StateEvent {
    /// Native handle of the accessed switch
    pub handle: HandleId,
    /// Requested value (SET) or value to report (GET)
    pub value: StateValue,
    /// Owning switch, if it is still alive
    pub thing: Option<Arc<SwitchInfo>>,
}

impl StateEvent {
    /// Decode `descriptor` field by field as laid out by `schema`.
    pub fn decode(descriptor: &StateDescriptor, schema: &DescriptorSchema) -> Result<Self> {
        let mut handle = None;
        let mut value = None;
        for field in schema.fields {
            match descriptor.read(field) {
                FieldValue::Handle(h) => handle = Some(h),
                FieldValue::Value(v) => value = Some(StateValue::decode(v)),
            }
        }

        Ok(Self {
            handle: handle.ok_or(SwitchError::MalformedDescriptor("handle"))?,
            value: value.ok_or(SwitchError::MalformedDescriptor("value"))?,
            thing: None,
        })
    }
}

/// Observer of state accesses on one switch.
///
/// On [`Action::Get`] the observer must leave the current state in
/// `event.value`. On [`Action::Set`] it drives the actuator to `event.value`.
/// The return value tells the engine whether the access was handled.
///
/// Runs inside the engine call that triggered the access: it must not block
/// and must not call state operations on the same switch.
pub trait StateAccessObserver: Send + Sync {
    fn on_access(&self, action: Action, event: &mut StateEvent) -> bool;
}

impl<F> StateAccessObserver for F
where
    F: Fn(Action, &mut StateEvent) -> bool + Send + Sync,
{
    fn on_access(&self, action: Action, event: &mut StateEvent) -> bool {
        self(action, event)
    }
}

/// A handler function paired with the user data it is called with.
pub struct HandlerBinding<H, U> {
    handler: H,
    user_data: U,
}

impl<H, U> HandlerBinding<H, U>
where
    H: Fn(Action, &mut StateEvent, &U) -> bool + Send + Sync,
    U: Send + Sync,
{
    pub fn new(handler: H, user_data: U) -> Self {
        Self { handler, user_data }
    }
}

impl<H, U> StateAccessObserver for HandlerBinding<H, U>
where
    H: Fn(Action, &mut StateEvent, &U) -> bool + Send + Sync,
    U: Send + Sync,
{
    fn on_access(&self, action: Action, event: &mut StateEvent) -> bool {
        (self.handler)(action, event, &self.user_data)
    }
}

/// The state callback installed into the engine for one switch.
pub struct StateMarshaller {
    observer: Arc<dyn StateAccessObserver>,
    registry: Arc<ThingRegistry>,
}

impl StateMarshaller {
    pub fn new(observer: Arc<dyn StateAccessObserver>, registry: Arc<ThingRegistry>) -> Self {
        Self { observer, registry }
    }

    pub fn dispatch(&self, action: Action, descriptor: &mut StateDescriptor) -> bool {
        let mut event = match StateEvent::decode(descriptor, state_descriptor_schema()) {
            Ok(event) => event,
            Err(e) => {
                error!("Dropping {} access: {}", action, e);
                return false;
            }
        };
        event.thing = self.registry.resolve(event.handle);

        debug!(
            "{} access on '{}' with {}",
            action,
            event.thing.as_ref().map_or("?", |t| t.id()),
            event.value
        );

        let handled = self.observer.on_access(action, &mut event);

        if action == Action::Get {
            descriptor.write_back(event.value.encode());
        }
        handled
    }

    pub fn into_callback(self) -> StateCallback {
        Arc::new(move |action: Action, descriptor: &mut StateDescriptor| {
            self.dispatch(action, descriptor)
        })
    }
}
