//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Tracking behavior (tracked app id, flush cadence)
//! - Limit warning threshold
//! - Notification preferences
//! - Puzzle defaults
//!
//! Configuration is stored at `~/.config/braindetox/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::puzzle::{Difficulty, PuzzleCategory};

/// Tracking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Identifier under which the host app's foreground time is recorded.
    #[serde(default = "default_app_id")]
    pub app_id: String,
    /// Seconds between periodic session flushes.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

/// Limit evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Percentage of a limit at which the pre-breach warning fires.
    #[serde(default = "default_warn_threshold_pct")]
    pub warn_threshold_pct: u8,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Puzzle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzlesConfig {
    #[serde(default)]
    pub default_category: PuzzleCategory,
    #[serde(default)]
    pub default_difficulty: Difficulty,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/braindetox/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub puzzles: PuzzlesConfig,
}

// Default functions
fn default_app_id() -> String {
    "brain-detox".into()
}
fn default_flush_interval_secs() -> u64 {
    30
}
fn default_warn_threshold_pct() -> u8 {
    80
}
fn default_true() -> bool {
    true
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            warn_threshold_pct: default_warn_threshold_pct(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for PuzzlesConfig {
    fn default() -> Self {
        Self {
            default_category: PuzzleCategory::default(),
            default_difficulty: Difficulty::default(),
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::Load {
            path: "<data dir>".into(),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, writing the defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::Load {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Save {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::Save {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Read a config value as a display string by dotted key.
    pub fn get_key(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "tracking.app_id" => self.tracking.app_id.clone(),
            "tracking.flush_interval_secs" => self.tracking.flush_interval_secs.to_string(),
            "limits.warn_threshold_pct" => self.limits.warn_threshold_pct.to_string(),
            "notifications.enabled" => self.notifications.enabled.to_string(),
            "puzzles.default_category" => self.puzzles.default_category.to_string(),
            "puzzles.default_difficulty" => self.puzzles.default_difficulty.to_string(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(value)
    }

    /// Update a config value by dotted key. The caller saves.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "tracking.app_id" => {
                if value.is_empty() {
                    return Err(invalid(key, "app id must not be empty"));
                }
                self.tracking.app_id = value.to_string();
            }
            "tracking.flush_interval_secs" => {
                let secs: u64 = parse(key, value)?;
                if secs == 0 {
                    return Err(invalid(key, "flush interval must be positive"));
                }
                self.tracking.flush_interval_secs = secs;
            }
            "limits.warn_threshold_pct" => {
                let pct: u8 = parse(key, value)?;
                if !(1..=100).contains(&pct) {
                    return Err(invalid(key, "threshold must be between 1 and 100"));
                }
                self.limits.warn_threshold_pct = pct;
            }
            "notifications.enabled" => self.notifications.enabled = parse(key, value)?,
            "puzzles.default_category" => {
                self.puzzles.default_category =
                    value.parse().map_err(|e: String| invalid(key, e))?;
            }
            "puzzles.default_difficulty" => {
                self.puzzles.default_difficulty =
                    value.parse().map_err(|e: String| invalid(key, e))?;
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Keys accepted by [`Config::get_key`] and [`Config::set_key`].
    pub fn keys() -> &'static [&'static str] {
        &[
            "tracking.app_id",
            "tracking.flush_interval_secs",
            "limits.warn_threshold_pct",
            "notifications.enabled",
            "puzzles.default_category",
            "puzzles.default_difficulty",
        ]
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| invalid(key, e.to_string()))
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.tracking.app_id, "brain-detox");
        assert_eq!(parsed.tracking.flush_interval_secs, 30);
        assert_eq!(parsed.limits.warn_threshold_pct, 80);
        assert!(parsed.notifications.enabled);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: Config = toml::from_str("[tracking]\napp_id = \"reader\"\n").unwrap();
        assert_eq!(parsed.tracking.app_id, "reader");
        assert_eq!(parsed.tracking.flush_interval_secs, 30);
        assert_eq!(parsed.limits.warn_threshold_pct, 80);
    }

    #[test]
    fn set_key_updates_known_keys() {
        let mut cfg = Config::default();
        cfg.set_key("tracking.flush_interval_secs", "10").unwrap();
        assert_eq!(cfg.tracking.flush_interval_secs, 10);
        cfg.set_key("notifications.enabled", "false").unwrap();
        assert!(!cfg.notifications.enabled);
        cfg.set_key("puzzles.default_difficulty", "hard").unwrap();
        assert_eq!(cfg.puzzles.default_difficulty, Difficulty::Hard);
    }

    #[test]
    fn set_key_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_key("tracking.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_key_rejects_bad_values() {
        let mut cfg = Config::default();
        assert!(cfg.set_key("tracking.flush_interval_secs", "0").is_err());
        assert!(cfg.set_key("limits.warn_threshold_pct", "150").is_err());
        assert!(cfg.set_key("notifications.enabled", "not_a_bool").is_err());
    }

    #[test]
    fn get_key_covers_every_listed_key() {
        let cfg = Config::default();
        for key in Config::keys() {
            assert!(cfg.get_key(key).is_ok(), "missing key: {key}");
        }
    }
}
