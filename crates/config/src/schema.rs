//! Bridge configuration schema.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

pub const DEFAULT_TRIGGER: &str = "satele";
pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:8000/webhook/message";
pub const DEFAULT_GATEWAY_PORT: u16 = 8001;
pub const DEFAULT_SIDECAR_PORT: u16 = 8765;

/// Top-level bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Keyword whose presence in a message forwards it to the backend.
    pub trigger: String,
    /// Bare sender identifiers allowed besides the account owner.
    pub allowed_numbers: Vec<String>,
    /// Backend endpoint receiving forwarded messages.
    pub webhook_url: String,
    pub webhook_timeout_secs: u64,
    /// Directory holding reusable session credentials.
    pub auth_dir: PathBuf,
    /// Directory receiving downloaded attachments.
    pub media_dir: PathBuf,
    pub media_timeout_secs: u64,
    /// Fixed delay before reconnecting after a recoverable close.
    pub reconnect_delay_secs: u64,
    pub gateway: GatewayConfig,
    pub sidecar: SidecarConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            trigger: DEFAULT_TRIGGER.into(),
            allowed_numbers: Vec::new(),
            webhook_url: DEFAULT_WEBHOOK_URL.into(),
            webhook_timeout_secs: 30,
            auth_dir: PathBuf::from(".mudslide_cache"),
            media_dir: PathBuf::from("media"),
            media_timeout_secs: 60,
            reconnect_delay_secs: 5,
            gateway: GatewayConfig::default(),
            sidecar: SidecarConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }

    pub fn media_timeout(&self) -> Duration {
        Duration::from_secs(self.media_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

/// Outbound gateway listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: DEFAULT_GATEWAY_PORT,
        }
    }
}

/// Baileys sidecar connection and supervision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidecarConfig {
    pub host: String,
    pub port: u16,
    /// Directory containing the sidecar's `package.json`.
    pub dir: Option<PathBuf>,
    /// Spawn and supervise the sidecar process.
    pub auto_start: bool,
    pub send_timeout_secs: u64,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_SIDECAR_PORT,
            dir: None,
            auto_start: false,
            send_timeout_secs: 30,
        }
    }
}

impl SidecarConfig {
    /// Websocket URL of the sidecar.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}
