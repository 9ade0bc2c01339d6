//! Session Provider connection seam.

use std::sync::Arc;

use {
    async_trait::async_trait,
    satele_channels::SessionProvider,
    serde::{Deserialize, Serialize},
    tokio::sync::mpsc,
};

use crate::types::WaMessage;

/// Baileys `DisconnectReason.loggedOut`.
pub const LOGGED_OUT_STATUS: u16 = 401;

/// Opaque session material needed to resume without re-pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(pub serde_json::Value);

/// Why a connection closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseReason {
    pub status_code: Option<u16>,
    pub message: String,
}

impl CloseReason {
    pub fn new(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    /// Close without a transport status (socket dropped, stream ended).
    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn logged_out() -> Self {
        Self::new(Some(LOGGED_OUT_STATUS), "logged out")
    }

    /// Explicit logout is the only terminal close.
    pub fn is_logout(&self) -> bool {
        self.status_code == Some(LOGGED_OUT_STATUS)
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (status {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Events emitted by a session, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PairingChallenge(String),
    Open { own_id: String },
    Close(CloseReason),
    CredentialsUpdate(Credentials),
    Messages(Vec<WaMessage>),
}

/// A freshly established session and its event stream.
pub struct Connection {
    pub session: Arc<dyn SessionProvider>,
    /// Unbounded so that media chunks for an in-flight download are never
    /// queued behind events the bridge has not consumed yet.
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Establishes transport sessions.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, credentials: Option<Credentials>) -> satele_channels::Result<Connection>;
}
