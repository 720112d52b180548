use crate::error::{Result, SwitchError};
use std::str::FromStr;

/// Text command accepted by a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum SwitchCommand {
    On,
    Off,
    Toggle,
}

impl SwitchCommand {
    pub fn parse(input: &str) -> Result<Self> {
        Self::from_str(input.trim()).map_err(|_| SwitchError::UnknownCommand(input.to_string()))
    }
}

/// Parse an `<id>=<command>` assignment such as `relay-1=ON`.
pub fn parse_assignment(input: &str) -> Result<(String, SwitchCommand)> {
    let (id, command) = input
        .split_once('=')
        .ok_or_else(|| SwitchError::InvalidCommandArg(input.to_string()))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(SwitchError::InvalidCommandArg(input.to_string()));
    }
    Ok((id.to_string(), SwitchCommand::parse(command)?))
}
