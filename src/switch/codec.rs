//! Conversion between native tri-state integers and switch state values.

use std::fmt;

/// Semantic switch state: a boolean, or a raw native value passed through
/// unchanged (the engine's "unknown/unsupported" sentinels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateValue {
    Bool(bool),
    Other(i32),
}

impl StateValue {
    /// Map native `1 -> true`, `0 -> false`, anything else through unchanged.
    pub fn decode(native: i32) -> Self {
        match native {
            1 => StateValue::Bool(true),
            0 => StateValue::Bool(false),
            other => StateValue::Other(other),
        }
    }

    /// Inverse of [`decode`](Self::decode), used when writing back into a
    /// native descriptor.
    pub fn encode(self) -> i32 {
        match self {
            StateValue::Bool(true) => 1,
            StateValue::Bool(false) => 0,
            StateValue::Other(other) => other,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(b),
            StateValue::Other(_) => None,
        }
    }

    pub fn is_on(self) -> bool {
        self == StateValue::Bool(true)
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Bool(value)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Bool(true) => f.write_str("ON"),
            StateValue::Bool(false) => f.write_str("OFF"),
            StateValue::Other(other) => write!(f, "UNKNOWN({other})"),
        }
    }
}
