use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::schema::{BridgeConfig, DEFAULT_TRIGGER};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["satele.toml", "satele.yaml", "satele.yml", "satele.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<BridgeConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let mut config = parse_config(&raw, path)?;
    normalize_trigger(&mut config);
    Ok(config)
}

/// A blank trigger word would match every message; fall back to the default.
fn normalize_trigger(config: &mut BridgeConfig) {
    let trimmed = config.trigger.trim();
    if trimmed.is_empty() {
        warn!(default = DEFAULT_TRIGGER, "blank trigger in config, using default");
        config.trigger = DEFAULT_TRIGGER.into();
    } else if trimmed.len() != config.trigger.len() {
        config.trigger = trimmed.to_string();
    }
}

/// Load the config and apply environment overrides.
///
/// An explicit path must load. Otherwise the standard locations are searched:
/// 1. `./satele.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/satele/satele.{toml,yaml,yml,json}` (user-global)
///
/// A missing or unreadable discovered file falls back to defaults.
pub fn discover_and_load(explicit: Option<&Path>) -> anyhow::Result<BridgeConfig> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => discover(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

fn discover() -> BridgeConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return BridgeConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            BridgeConfig::default()
        },
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/satele/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "satele").map(|d| d.config_dir().to_path_buf())
}

/// Apply environment overrides on top of file values.
///
/// `lookup` resolves a variable name; taking it as a parameter keeps this
/// testable without touching the process environment.
pub fn apply_env_overrides(config: &mut BridgeConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(trigger) = lookup("BOT_TRIGGER").filter(|t| !t.trim().is_empty()) {
        config.trigger = trigger.trim().to_string();
    }
    if let Some(numbers) = lookup("ALLOWED_NUMBERS") {
        config.allowed_numbers = numbers
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(url) = lookup("SATELE_WEBHOOK_URL") {
        config.webhook_url = url;
    }
    if let Some(port) = lookup("SATELE_GATEWAY_PORT") {
        match port.parse() {
            Ok(port) => config.gateway.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid SATELE_GATEWAY_PORT"),
        }
    }
    if let Some(port) = lookup("SATELE_SIDECAR_PORT") {
        match port.parse() {
            Ok(port) => config.sidecar.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid SATELE_SIDECAR_PORT"),
        }
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<BridgeConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
