mod config;

pub use config::{AttentionConfig, Config, DriverConfig, NotificationsConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/focusbreak[-dev]/` based on FOCUSBREAK_ENV.
///
/// Set FOCUSBREAK_ENV=dev to use the development directory, or
/// FOCUSBREAK_CONFIG_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("FOCUSBREAK_CONFIG_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSBREAK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusbreak-dev")
            } else {
                base_dir.join("focusbreak")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
