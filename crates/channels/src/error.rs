use std::error::Error as StdError;

/// Crate-wide result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed session errors shared by the bridge and the outbound gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No live session is published.
    #[error("WhatsApp not connected")]
    NotConnected,

    /// Input payload or parameter is invalid.
    #[error("invalid session input: {message}")]
    InvalidInput { message: String },

    /// The session provider did not answer in time.
    #[error("session operation timed out: {operation}")]
    Timeout { operation: String },

    /// The session provider answered but refused the request.
    #[error("session provider rejected request: {message}")]
    Rejected { message: String },

    /// Wrapped source error from the transport.
    #[error("session transport failed: {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn timeout(operation: impl std::fmt::Display) -> Self {
        Self::Timeout {
            operation: operation.to_string(),
        }
    }

    #[must_use]
    pub fn rejected(message: impl std::fmt::Display) -> Self {
        Self::Rejected {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn transport(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
