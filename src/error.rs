use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum SwitchError {
    #[error("Failed to allocate native handle for switch '{0}'")]
    AllocationFailed(String),

    #[error("Create hook failed for switch '{id}': {reason}")]
    HookFailed { id: String, reason: String },

    #[error("Malformed state descriptor: missing field '{0}'")]
    MalformedDescriptor(&'static str),

    #[error("Unknown switch command: {0}")]
    UnknownCommand(String),

    #[error("Invalid command argument: {0}")]
    InvalidCommandArg(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SwitchError>;
