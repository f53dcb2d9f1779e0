use thiserror::Error;

/// Failures talking to the native host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Failed to start host `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Host I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Host payload error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Host rejected `{call}`: {message}")]
    Remote { call: String, message: String },

    #[error("Host did not answer `{call}` within {after:?}")]
    Timeout { call: String, after: std::time::Duration },

    #[error("Host process disconnected")]
    Disconnected,

    #[error("Host unavailable: {0}")]
    Unavailable(String),
}

impl HostError {
    pub fn remote<C: Into<String>, M: Into<String>>(call: C, message: M) -> Self {
        HostError::Remote {
            call: call.into(),
            message: message.into(),
        }
    }
}

/// Convenience Result type for host calls.
pub type Result<T> = std::result::Result<T, HostError>;
