//! Identity registry for created things.
//!
//! Maps native handles back to the switch that owns them so state events can
//! carry a reference to their switch. Entries are weak: the registry never
//! keeps a closed switch alive.

pub mod registry;

pub use registry::{SwitchInfo, ThingRegistry};
