//! Client configuration.
//!
//! Read from JSON, then overridden by `SCRIBBLE_*` environment variables.

use crate::phase::HintThresholds;
use crate::stroke::ThrottleSettings;
use crate::surface::parse_hex_color;
use crate::timer::Duration;
use crate::transport::ReconnectPolicy;
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

pub const ENV_SERVER: &str = "SCRIBBLE_SERVER";
pub const ENV_ROOM: &str = "SCRIBBLE_ROOM";
pub const ENV_TOKEN: &str = "SCRIBBLE_TOKEN";
pub const ENV_OUTPUT: &str = "SCRIBBLE_OUTPUT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub interval_ms: u64,
    pub batch_size: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            interval_ms: 8,
            batch_size: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HintUnlockConfig {
    pub chosung: u64,
    pub letter: u64,
}

impl Default for HintUnlockConfig {
    fn default() -> Self {
        Self {
            chosung: 20,
            letter: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub background: String,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background: "#ffffff".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host:port`, `http(s)://...` or `ws(s)://...`.
    pub server_url: String,
    pub room_id: String,
    /// Bearer token issued when joining the room.
    pub token: String,
    pub throttle: ThrottleConfig,
    pub reconnect: ReconnectConfig,
    pub subscribe_delay_ms: u64,
    pub snapshot_interval_ms: u64,
    pub hint_unlock_secs: HintUnlockConfig,
    pub canvas: CanvasConfig,
    pub output_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "localhost:8080".to_string(),
            room_id: String::new(),
            token: String::new(),
            throttle: ThrottleConfig::default(),
            reconnect: ReconnectConfig::default(),
            subscribe_delay_ms: 100,
            snapshot_interval_ms: 1000,
            hint_unlock_secs: HintUnlockConfig::default(),
            canvas: CanvasConfig::default(),
            output_dir: PathBuf::from("snapshots"),
        }
    }
}

/// Turn a user-supplied server address into a WebSocket endpoint ending in `/ws`.
pub fn normalize_server_url(server: &str) -> ConfigResult<String> {
    let server = server.trim().trim_end_matches('/');
    if server.is_empty() {
        return Err(ConfigError::Invalid("server_url is empty".to_string()));
    }

    let (scheme, rest) = match server.split_once("://") {
        Some(("ws", rest)) | Some(("http", rest)) => ("ws", rest),
        Some(("wss", rest)) | Some(("https", rest)) => ("wss", rest),
        Some((other, _)) => {
            return Err(ConfigError::Invalid(format!(
                "unsupported server scheme: {}",
                other
            )))
        }
        None => ("ws", server),
    };

    if rest.is_empty() {
        return Err(ConfigError::Invalid(format!("no host in {}", server)));
    }
    if rest.ends_with("/ws") {
        Ok(format!("{}://{}", scheme, rest))
    } else {
        Ok(format!("{}://{}/ws", scheme, rest))
    }
}

impl ClientConfig {
    /// `<config dir>/scribble/config.json`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scribble").join("config.json"))
    }

    /// Load from `path` if given, else from the default location if it
    /// exists, else defaults. Environment overrides are applied last.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    log::info!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Io(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| ConfigError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_SERVER) {
            self.server_url = v;
        }
        if let Some(v) = get(ENV_ROOM) {
            self.room_id = v;
        }
        if let Some(v) = get(ENV_TOKEN) {
            self.token = v;
        }
        if let Some(v) = get(ENV_OUTPUT) {
            self.output_dir = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        normalize_server_url(&self.server_url)?;
        if self.room_id.trim().is_empty() {
            return Err(ConfigError::Invalid("room_id is required".to_string()));
        }
        if self.token.trim().is_empty() {
            return Err(ConfigError::Invalid("token is required".to_string()));
        }
        if self.throttle.batch_size == 0 {
            return Err(ConfigError::Invalid("throttle.batch_size must be at least 1".to_string()));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::Invalid("canvas size must be non-zero".to_string()));
        }
        self.background_color()?;
        Ok(())
    }

    pub fn websocket_url(&self) -> ConfigResult<String> {
        normalize_server_url(&self.server_url)
    }

    pub fn background_color(&self) -> ConfigResult<Color> {
        parse_hex_color(&self.canvas.background).ok_or_else(|| {
            ConfigError::Invalid(format!("bad background colour: {}", self.canvas.background))
        })
    }

    pub fn throttle_settings(&self) -> ThrottleSettings {
        ThrottleSettings {
            interval: Duration::from_millis(self.throttle.interval_ms),
            batch_size: self.throttle.batch_size.max(1),
        }
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(self.reconnect.base_delay_ms),
            max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
            max_attempts: self.reconnect.max_attempts,
        }
    }

    pub fn hint_thresholds(&self) -> HintThresholds {
        HintThresholds {
            chosung: Duration::from_secs(self.hint_unlock_secs.chosung),
            letter: Duration::from_secs(self.hint_unlock_secs.letter),
        }
    }

    pub fn subscribe_delay(&self) -> Duration {
        Duration::from_millis(self.subscribe_delay_ms)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }
}
