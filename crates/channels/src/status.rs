use std::sync::Arc;

use {serde::Serialize, tokio::sync::watch};

/// Lifecycle state of the transport session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingPairing,
    Connected,
    /// Explicit logout. No further reconnection happens.
    LoggedOut,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        self == Self::LoggedOut
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingPairing => "awaiting_pairing",
            Self::Connected => "connected",
            Self::LoggedOut => "logged_out",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of the bridge connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    /// Pending pairing code while the session waits to be linked.
    pub pairing_code: Option<String>,
    /// Account identity once connected.
    pub own_id: Option<String>,
}

/// Shared connection status, written by the lifecycle and read by the gateway.
#[derive(Clone)]
pub struct BridgeStatus {
    tx: Arc<watch::Sender<StatusSnapshot>>,
}

impl Default for BridgeStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeStatus {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.tx.borrow().state
    }

    /// Record a state change. The pairing code only survives while awaiting
    /// pairing, and the identity only while connected.
    pub fn set_state(&self, state: ConnectionState) {
        self.tx.send_modify(|s| {
            s.state = state;
            if state != ConnectionState::AwaitingPairing {
                s.pairing_code = None;
            }
            if state != ConnectionState::Connected {
                s.own_id = None;
            }
        });
    }

    pub fn set_pairing_code(&self, code: impl Into<String>) {
        let code = code.into();
        self.tx.send_modify(|s| s.pairing_code = Some(code));
    }

    pub fn set_own_id(&self, own_id: impl Into<String>) {
        let own_id = own_id.into();
        self.tx.send_modify(|s| s.own_id = Some(own_id));
    }

    /// Watch for changes.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }
}
