//! Zen switch library.
//!
//! Binary actuators ("switches") driven through a native switch engine,
//! with a single state handler per switch that observes writes and supplies
//! values for reads.

pub mod config;
pub mod error;
pub mod native;
pub mod switch;
pub mod thing;

#[cfg(test)]
mod testing;

pub use error::{Result, SwitchError};
