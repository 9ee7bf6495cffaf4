use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("probe timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The previous session for this node has not come back yet.
    #[error("previous probe session is still busy")]
    SessionBusy,

    #[error("no SSH address known for node")]
    NoAddress,

    #[error("probe command exited with status {status}: {stderr}")]
    CommandFailed { status: i32, stderr: String },

    #[error("unparseable probe output: {0}")]
    Parse(String),
}

impl ProbeError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Timeout(_) | ProbeError::SessionBusy => "ProbeTimeout",
            ProbeError::ConnectionFailed(_) | ProbeError::NoAddress => "ProbeConnectionFailed",
            ProbeError::CommandFailed { .. } | ProbeError::Parse(_) => "ProbeOutputInvalid",
        }
    }
}
