//! Gateway configuration model and loaders

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::heartbeat::DEFAULT_HEARTBEAT_ACK_MAX_CHARS;
use crate::{Error, Result};

/// Channel name used for the web chat surface
pub const WEBCHAT_CHANNEL: &str = "webchat";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsConfig {
    #[serde(default)]
    pub defaults: AgentDefaults,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefaults {
    #[serde(default)]
    pub heartbeat: AgentHeartbeatConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_default: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentHeartbeatConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_max_chars: Option<i64>,
}

impl AgentHeartbeatConfig {
    /// Configured ack limit, falling back to the default and clamped at zero
    pub fn resolved_ack_max_chars(&self) -> usize {
        let configured = self
            .ack_max_chars
            .unwrap_or(DEFAULT_HEARTBEAT_ACK_MAX_CHARS as i64);
        configured.max(0) as usize
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<ChannelConfig>,
    #[serde(flatten)]
    pub channels: HashMap<String, ChannelConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat: Option<ChannelHeartbeatConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelHeartbeatConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_alerts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_indicator: Option<bool>,
}

/// Effective heartbeat visibility for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatVisibility {
    pub show_ok: bool,
    pub show_alerts: bool,
    pub use_indicator: bool,
}

impl Default for HeartbeatVisibility {
    fn default() -> Self {
        Self {
            show_ok: false,
            show_alerts: true,
            use_indicator: true,
        }
    }
}

/// Resolve heartbeat visibility: channel override, then channel defaults, then built-ins.
pub fn resolve_heartbeat_visibility(config: &GatewayConfig, channel: &str) -> HeartbeatVisibility {
    let builtin = HeartbeatVisibility::default();
    let defaults = config
        .channels
        .defaults
        .as_ref()
        .and_then(|c| c.heartbeat.as_ref());
    let scoped = config
        .channels
        .channels
        .get(channel)
        .and_then(|c| c.heartbeat.as_ref());

    let pick = |field: fn(&ChannelHeartbeatConfig) -> Option<bool>, fallback: bool| {
        scoped
            .and_then(field)
            .or_else(|| defaults.and_then(field))
            .unwrap_or(fallback)
    };

    HeartbeatVisibility {
        show_ok: pick(|h| h.show_ok, builtin.show_ok),
        show_alerts: pick(|h| h.show_alerts, builtin.show_alerts),
        use_indicator: pick(|h| h.use_indicator, builtin.use_indicator),
    }
}

/// Synchronous configuration source
pub trait ConfigLoader: Send + Sync {
    fn load(&self) -> Result<GatewayConfig>;
}

/// Loads configuration from a JSON file on every call
#[derive(Debug, Clone)]
pub struct FileConfigLoader {
    path: PathBuf,
}

impl FileConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigLoader for FileConfigLoader {
    fn load(&self) -> Result<GatewayConfig> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(GatewayConfig::default()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(GatewayConfig::default());
        }
        serde_json::from_str(&raw)
            .map_err(|e| Error::ConfigLoad(format!("{}: {}", self.path.display(), e)))
    }
}

/// Returns a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct StaticConfigLoader {
    config: GatewayConfig,
}

impl StaticConfigLoader {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<GatewayConfig> {
        Ok(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn parse(value: serde_json::Value) -> GatewayConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_ack_max_chars_default_and_clamp() {
        let config = GatewayConfig::default();
        assert_eq!(
            config.agents.defaults.heartbeat.resolved_ack_max_chars(),
            DEFAULT_HEARTBEAT_ACK_MAX_CHARS
        );

        let config = parse(json!({
            "agents": { "defaults": { "heartbeat": { "ackMaxChars": -5 } } }
        }));
        assert_eq!(config.agents.defaults.heartbeat.resolved_ack_max_chars(), 0);
    }

    #[test]
    fn test_visibility_layers() {
        let config = parse(json!({
            "channels": {
                "defaults": { "heartbeat": { "showOk": true, "showAlerts": false } },
                "webchat": { "heartbeat": { "showOk": false } },
                "telegram": { "botToken": "ignored" }
            }
        }));

        let webchat = resolve_heartbeat_visibility(&config, WEBCHAT_CHANNEL);
        assert!(!webchat.show_ok);
        assert!(!webchat.show_alerts);
        assert!(webchat.use_indicator);

        let telegram = resolve_heartbeat_visibility(&config, "telegram");
        assert!(telegram.show_ok);
    }

    #[test]
    fn test_visibility_builtin_defaults() {
        let visibility = resolve_heartbeat_visibility(&GatewayConfig::default(), WEBCHAT_CHANNEL);
        assert_eq!(visibility, HeartbeatVisibility::default());
    }

    #[test]
    fn test_file_loader_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let loader = FileConfigLoader::new(temp_dir.path().join("missing.json"));
        let config = loader.load().unwrap();
        assert!(config.agents.defaults.verbose_default.is_none());
    }

    #[test]
    fn test_file_loader_reads_and_rejects() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        std::fs::write(&path, r#"{"agents":{"defaults":{"verboseDefault":"on"}}}"#).unwrap();
        let loader = FileConfigLoader::new(&path);
        let config = loader.load().unwrap();
        assert_eq!(config.agents.defaults.verbose_default.as_deref(), Some("on"));

        std::fs::write(&path, "{ not json").unwrap();
        let err = loader.load().unwrap_err();
        assert!(matches!(err, Error::ConfigLoad(_)));
    }
}
