use crate::debugger::StepRequest;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- per-command errors ----------------------------------------
    #[error("cannot parse ghci output for `{command}`")]
    ParseMismatch { command: String },
    #[error("cannot evaluate expression: {expression}")]
    Evaluation { expression: String },
    #[error("cannot show type: {expression}")]
    TypeUnavailable { expression: String },
    #[error("command spans several lines: {command:?}")]
    MultilineCommand { command: String },
    #[error("{0} is not supported by the ghci debugger")]
    Unsupported(StepRequest),

    // --------------------------------- session errors --------------------------------------------
    #[error("no response to `{command}` within {waited:?}, restart the debug session")]
    ProtocolDesync { command: String, waited: Duration },
    #[error("debug session is not running")]
    NotRunning,
    #[error("debug session is already running")]
    AlreadyRunning,
    #[error("ghci process exited")]
    ProcessExited,

    // --------------------------------- generic errors --------------------------------------------
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors after which the session can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ProtocolDesync { .. } | Error::ProcessExited | Error::IO(_)
        )
    }
}
