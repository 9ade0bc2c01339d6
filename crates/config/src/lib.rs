//! Configuration loading and environment overrides.
//!
//! Config files: `satele.toml`, `satele.yaml`, or `satele.json`,
//! searched in `./` then `~/.config/satele/`.
//!
//! `BOT_TRIGGER` and `ALLOWED_NUMBERS` override the file values.

pub mod loader;
pub mod schema;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{BridgeConfig, GatewayConfig, SidecarConfig},
};
