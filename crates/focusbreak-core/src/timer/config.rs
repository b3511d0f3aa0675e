//! Timer configuration and its bounds.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const WORK_MINUTES_RANGE: (u32, u32) = (1, 120);
pub const BREAK_MINUTES_RANGE: (u32, u32) = (1, 60);
pub const LONG_BREAK_MINUTES_RANGE: (u32, u32) = (1, 60);
pub const SESSIONS_BEFORE_LONG_BREAK_RANGE: (u32, u32) = (1, 12);

/// Durations of each phase and the long-break cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_sessions_before_long_break")]
    pub sessions_before_long_break: u32,
}

fn default_work_minutes() -> u32 {
    25
}
fn default_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_sessions_before_long_break() -> u32 {
    4
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            sessions_before_long_break: default_sessions_before_long_break(),
        }
    }
}

/// Partial update for [`TimerConfig`]. Unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_break_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions_before_long_break: Option<u32>,
}

impl TimerConfig {
    /// Check every field against its bounds.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidValue` naming the first field that is
    /// out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("work_minutes", self.work_minutes, WORK_MINUTES_RANGE)?;
        check_range("break_minutes", self.break_minutes, BREAK_MINUTES_RANGE)?;
        check_range(
            "long_break_minutes",
            self.long_break_minutes,
            LONG_BREAK_MINUTES_RANGE,
        )?;
        check_range(
            "sessions_before_long_break",
            self.sessions_before_long_break,
            SESSIONS_BEFORE_LONG_BREAK_RANGE,
        )?;
        Ok(())
    }

    /// Apply a patch, returning the merged config without touching `self`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidValue` if the merged config is out of
    /// bounds.
    pub fn merged(&self, patch: &ConfigPatch) -> Result<Self, ValidationError> {
        let merged = Self {
            work_minutes: patch.work_minutes.unwrap_or(self.work_minutes),
            break_minutes: patch.break_minutes.unwrap_or(self.break_minutes),
            long_break_minutes: patch.long_break_minutes.unwrap_or(self.long_break_minutes),
            sessions_before_long_break: patch
                .sessions_before_long_break
                .unwrap_or(self.sessions_before_long_break),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn work_secs(&self) -> u64 {
        u64::from(self.work_minutes).saturating_mul(60)
    }

    pub fn break_secs(&self) -> u64 {
        u64::from(self.break_minutes).saturating_mul(60)
    }

    pub fn long_break_secs(&self) -> u64 {
        u64::from(self.long_break_minutes).saturating_mul(60)
    }

    /// Whether the break following the `completed`-th work session is long.
    ///
    /// `completed` is the count after the just-finished session was added.
    pub fn is_long_break_after(&self, completed: u32) -> bool {
        self.sessions_before_long_break > 0 && completed % self.sessions_before_long_break == 0
    }
}

fn check_range(field: &str, value: u32, (min, max): (u32, u32)) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("must be between {min} and {max}, got {value}"),
        });
    }
    Ok(())
}
