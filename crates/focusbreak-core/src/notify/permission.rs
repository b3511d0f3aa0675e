use serde::{Deserialize, Serialize};

use crate::error::PermissionError;

/// Platform permission state for system notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    NotRequested,
}

/// Platform side effects that need the user's (or the OS's) consent.
///
/// Calls may block (a trial sound plays to completion, a permission prompt
/// waits for the user); the timer runs them off the async executor.
pub trait Capabilities: Send + Sync {
    /// Play a trial sound. `Ok` means audio works and may be enabled.
    fn request_audio(&self) -> Result<(), PermissionError>;

    /// Current notification permission, without prompting.
    fn notification_permission(&self) -> PermissionState;

    /// Prompt for notification permission.
    fn request_notification_permission(&self) -> Result<PermissionState, PermissionError>;
}

/// Capabilities of a host with neither sound nor notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapabilities;

impl Capabilities for NoCapabilities {
    fn request_audio(&self) -> Result<(), PermissionError> {
        Err(PermissionError::Audio("no audio output available".into()))
    }

    fn notification_permission(&self) -> PermissionState {
        PermissionState::Denied
    }

    fn request_notification_permission(&self) -> Result<PermissionState, PermissionError> {
        Err(PermissionError::NotificationsDenied)
    }
}
