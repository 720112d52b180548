//! Sparse switch configuration and its translation into a native block.

use crate::native::NativeConfig;
use serde::{Deserialize, Serialize};

/// Optional grouping and timing settings for a switch.
///
/// Every field may be left out; absent fields resolve to the engine's
/// defaults when the switch is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchConfig {
    /// Switches sharing a group id are mutually exclusive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i32>,
    /// Automatic switch-off delay in ms after turning on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inching_timeout: Option<i32>,
    /// Forbid turning off (or turning on a group sibling) while inching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inching_lock: Option<bool>,
    /// Settle delay in ms after every transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switching_time: Option<i32>,
}

/// `None` and explicit `0` both collapse to the not-set sentinel.
fn or_not_set(value: Option<i32>) -> i32 {
    match value {
        Some(v) if v != 0 => v,
        _ => NativeConfig::NOT_SET,
    }
}

/// Build the native configuration block for `cfg`.
///
/// Returns `None` when no config was given, leaving every default to the
/// engine.
pub fn build_config(cfg: Option<&SwitchConfig>) -> Option<NativeConfig> {
    let cfg = cfg?;
    Some(NativeConfig::new(
        or_not_set(cfg.group_id),
        or_not_set(cfg.inching_timeout),
        cfg.inching_lock.unwrap_or(false),
        or_not_set(cfg.switching_time),
    ))
}
