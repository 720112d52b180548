//! Switch lifecycle, state operations and state handler marshalling.
//!
//! A [`SwitchFactory`] creates [`Switch`]es on a native engine. Each switch
//! exposes get/set/toggle and can install a single state handler that sees
//! every state access the engine performs.

pub mod codec;
pub mod command;
pub mod config;
pub mod factory;
pub mod handle;
pub mod hooks;
pub mod instance;
pub mod marshaller;

pub use codec::StateValue;
pub use command::{SwitchCommand, parse_assignment};
pub use config::{SwitchConfig, build_config};
pub use factory::SwitchFactory;
pub use handle::SwitchHandle;
pub use hooks::{CreateHook, CreateHooks};
pub use instance::Switch;
pub use marshaller::{HandlerBinding, StateAccessObserver, StateEvent, StateMarshaller};
