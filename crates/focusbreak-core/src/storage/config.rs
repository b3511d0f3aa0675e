//! TOML-based application configuration.
//!
//! Stores user preferences:
//! - Phase durations and the long-break cadence
//! - Sound and system notification preferences
//! - Title-blink behaviour
//! - Countdown poll interval
//!
//! Configuration is stored at `~/.config/focusbreak/config.toml`. Timer
//! state is never persisted.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;
use crate::notify::BlinkSettings;
use crate::timer::TimerConfig;

const POLL_INTERVAL_MS_RANGE: (u64, u64) = (10, 1000);
const BLINK_INTERVAL_MS_MIN: u64 = 100;

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Ask for system notification permission on the first start.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Try to enable sound when a session opens.
    #[serde(default = "default_true")]
    pub sound: bool,
    /// Path to a custom sound file (optional).
    /// If unset, the platform's default completion sound is played.
    #[serde(default)]
    pub sound_file: Option<String>,
}

/// Title-blink configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_toggles")]
    pub toggles: u32,
    #[serde(default = "default_blink_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusbreak/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub attention: AttentionConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_toggles() -> u32 {
    10
}
fn default_blink_interval_ms() -> u64 {
    1000
}
fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
            sound_file: None,
        }
    }
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            toggles: default_toggles(),
            interval_ms: default_blink_interval_ms(),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                ),
                serde_json::Value::Number(_) => serde_json::Value::Number(
                    value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                        .into(),
                ),
                serde_json::Value::Object(_) => return Err(unknown()),
                // Optional strings are null until set; "none" clears them.
                serde_json::Value::Null | serde_json::Value::String(_) if value == "none" => {
                    serde_json::Value::Null
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location of the config file.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            return Self::load_from(&path);
        }
        let cfg = Self::default();
        cfg.save_to(&path)?;
        Ok(cfg)
    }

    /// Load from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds an
    /// out-of-range value.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content)?;
        cfg.validate()?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(cfg)
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Every leaf as `(dot.key, value)`, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (name, child) in map {
                        let key = if prefix.is_empty() {
                            name.clone()
                        } else {
                            format!("{prefix}.{name}")
                        };
                        walk(&key, child, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Set a config value by dot-separated key. The value is type-checked
    /// against the current one and the whole config re-validated; on error
    /// nothing changes. Call [`Config::save`] to persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or is out of range.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check every value against its bounds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timer.validate().map_err(|e| ConfigError::InvalidValue {
            key: format!("timer.{}", e.field().unwrap_or("?")),
            message: e.to_string(),
        })?;

        let (min, max) = POLL_INTERVAL_MS_RANGE;
        if !(min..=max).contains(&self.driver.poll_interval_ms) {
            return Err(ConfigError::InvalidValue {
                key: "driver.poll_interval_ms".into(),
                message: format!("must be between {min} and {max}"),
            });
        }
        if self.attention.interval_ms < BLINK_INTERVAL_MS_MIN {
            return Err(ConfigError::InvalidValue {
                key: "attention.interval_ms".into(),
                message: format!("must be at least {BLINK_INTERVAL_MS_MIN}"),
            });
        }
        Ok(())
    }

    /// Blink settings for the attention channel. Disabled means zero toggles.
    pub fn blink_settings(&self) -> BlinkSettings {
        BlinkSettings {
            toggles: if self.attention.enabled {
                self.attention.toggles
            } else {
                0
            },
            interval: Duration::from_millis(self.attention.interval_ms),
            ..BlinkSettings::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.driver.poll_interval_ms)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("using default config: {e}");
            Self::default()
        })
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
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.timer.work_minutes, 25);
        assert!(parsed.notifications.sound_file.is_none());
    }

    #[test]
    fn missing_sections_use_defaults() {
        let parsed: Config = toml::from_str("[timer]\nwork_minutes = 50\n").unwrap();
        assert_eq!(parsed.timer.work_minutes, 50);
        assert_eq!(parsed.timer.break_minutes, 5);
        assert_eq!(parsed.attention.toggles, 10);
        assert_eq!(parsed.driver.poll_interval_ms, 100);
    }

    #[test]
    fn get_by_dot_path() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.work_minutes").as_deref(), Some("25"));
        assert_eq!(cfg.get("notifications.sound").as_deref(), Some("true"));
        assert_eq!(cfg.get("timer"), None);
        assert_eq!(cfg.get("nope.nothing"), None);
        assert_eq!(cfg.get(""), None);
    }

    #[test]
    fn set_checks_type_and_bounds() {
        let mut cfg = Config::default();
        cfg.set("timer.work_minutes", "50").unwrap();
        assert_eq!(cfg.timer.work_minutes, 50);

        let err = cfg.set("timer.work_minutes", "200").unwrap_err();
        assert!(
            matches!(&err, ConfigError::InvalidValue { key, .. } if key == "timer.work_minutes"),
            "{err}"
        );
        assert_eq!(cfg.timer.work_minutes, 50);

        assert!(matches!(
            cfg.set("timer.work_minutes", "lots"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set("notifications.sound", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set("timer.colour", "red"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set("timer", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn optional_sound_file_can_be_set_and_cleared() {
        let mut cfg = Config::default();
        cfg.set("notifications.sound_file", "/tmp/ding.wav").unwrap();
        assert_eq!(cfg.notifications.sound_file.as_deref(), Some("/tmp/ding.wav"));
        cfg.set("notifications.sound_file", "none").unwrap();
        assert!(cfg.notifications.sound_file.is_none());
    }

    #[test]
    fn save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.set("attention.toggles", "4").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.blink_settings().toggles, 4);
    }

    #[test]
    fn load_rejects_out_of_range_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[driver]\npoll_interval_ms = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "driver.poll_interval_ms"));
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timer\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseFailed(_))));
        assert!(matches!(
            Config::load_from(&dir.path().join("missing.toml")),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn disabled_attention_means_no_toggles() {
        let mut cfg = Config::default();
        cfg.set("attention.enabled", "false").unwrap();
        assert_eq!(cfg.blink_settings().toggles, 0);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn entries_list_every_leaf() {
        let entries = Config::default().entries();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"timer.sessions_before_long_break"));
        assert!(keys.contains(&"notifications.sound_file"));
        assert!(keys.contains(&"driver.poll_interval_ms"));
    }
}
