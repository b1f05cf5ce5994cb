//! Standbot configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StandbotError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandbotConfig {
    /// Command prefix, e.g. `!reply`.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Verbose logging (the `DEBUG=true` switch).
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_prefix() -> String { "!".into() }

impl Default for StandbotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            debug: false,
            discord: DiscordConfig::default(),
            schedule: ScheduleConfig::default(),
            summary: SummaryConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl StandbotConfig {
    /// Load config from the default path (~/.standbot/config.toml), then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StandbotError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| StandbotError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the given path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| StandbotError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `DISCORD_TOKEN` and `DEBUG=true` win over the file.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("DISCORD_TOKEN")
            && !token.is_empty()
        {
            self.discord.bot_token = token;
        }
        if std::env::var("DEBUG").is_ok_and(|v| v == "true") {
            self.debug = true;
        }
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(StandbotError::Config("prefix must not be empty".into()));
        }
        if self.summary.line_limit == 0 || self.summary.segment_limit == 0 {
            return Err(StandbotError::Config(
                "summary line_limit and segment_limit must be positive".into(),
            ));
        }
        if !["sqlite", "json", "memory"].contains(&self.store.backend.as_str()) {
            return Err(StandbotError::Config(format!(
                "unknown store backend '{}'",
                self.store.backend
            )));
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the standbot home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".standbot")
    }
}

/// Discord connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
}

fn default_api_base() -> String { "https://discord.com/api/v10".into() }
fn default_gateway_url() -> String { "wss://gateway.discord.gg/?v=10&encoding=json".into() }
fn default_reconnect_delay() -> u64 { 5000 }

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_api_base(),
            gateway_url: default_gateway_url(),
            reconnect_delay_ms: default_reconnect_delay(),
        }
    }
}

/// When the daily summary fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// `MIN HOUR DOM MON DOW`, evaluated in UTC.
    #[serde(default = "default_expression")]
    pub expression: String,
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

fn bool_true() -> bool { true }
fn default_expression() -> String { "30 10 * * 1-5".into() }

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            expression: default_expression(),
            enabled: true,
        }
    }
}

/// Summary layout limits and the delivery channel created on join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_line_limit")]
    pub line_limit: usize,
    #[serde(default = "default_segment_limit")]
    pub segment_limit: usize,
    #[serde(default = "default_channel_name")]
    pub channel_name: String,
    #[serde(default = "default_channel_topic")]
    pub channel_topic: String,
}

fn default_line_limit() -> usize { 350 }
fn default_segment_limit() -> usize { 800 }
fn default_channel_name() -> String { "daily-standups".into() }
fn default_channel_topic() -> String { "Scrum Standup Meeting Channel".into() }

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            line_limit: default_line_limit(),
            segment_limit: default_segment_limit(),
            channel_name: default_channel_name(),
            channel_topic: default_channel_topic(),
        }
    }
}

/// Where standup documents live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `sqlite`, `json` or `memory`.
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_backend() -> String { "sqlite".into() }
fn default_store_path() -> String { "~/.standbot/standbot.db".into() }

impl StoreConfig {
    /// The store path with `~` expanded.
    pub fn expanded_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StandbotConfig::default();
        assert_eq!(config.prefix, "!");
        assert_eq!(config.schedule.expression, "30 10 * * 1-5");
        assert_eq!(config.summary.line_limit, 350);
        assert_eq!(config.summary.segment_limit, 800);
        assert_eq!(config.summary.channel_name, "daily-standups");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            prefix = "?"

            [schedule]
            expression = "0 9 * * 1"

            [summary]
            line_limit = 10
            segment_limit = 12

            [store]
            backend = "json"
            path = "/tmp/standups.json"
        "#;

        let config: StandbotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.prefix, "?");
        assert_eq!(config.schedule.expression, "0 9 * * 1");
        assert!(config.schedule.enabled);
        assert_eq!(config.summary.line_limit, 10);
        assert_eq!(config.summary.channel_topic, "Scrum Standup Meeting Channel");
        assert_eq!(config.store.backend, "json");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: StandbotConfig = toml::from_str("").unwrap();
        assert_eq!(config.discord.api_base, "https://discord.com/api/v10");
        assert_eq!(config.discord.reconnect_delay_ms, 5000);
        assert_eq!(config.store.backend, "sqlite");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = StandbotConfig::default();
        config.summary.segment_limit = 0;
        assert!(config.validate().is_err());

        let mut config = StandbotConfig::default();
        config.store.backend = "mongo".into();
        assert!(config.validate().is_err());

        let mut config = StandbotConfig::default();
        config.prefix.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = StandbotConfig::default();
        config.summary.segment_limit = 500;
        config.save_to(&path).unwrap();

        let loaded = StandbotConfig::load_from(&path).unwrap();
        assert_eq!(loaded.summary.segment_limit, 500);
    }

    #[test]
    fn test_home_dir() {
        let home = StandbotConfig::home_dir();
        assert!(home.to_string_lossy().contains("standbot"));
    }
}
