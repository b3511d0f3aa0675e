//! Title-blink attention signal.
//!
//! Only fires while the application is not focused. The blink alternates
//! between the alert and the idle title a bounded number of times and stops
//! early as soon as focus comes back. The idle title is always restored.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{ChannelOutcome, SkipReason};
use crate::error::ChannelError;

/// Something with a title that can be used to grab attention
/// (a window, a browser tab, a terminal).
pub trait AttentionSurface: Send + Sync {
    fn set_title(&self, title: &str) -> Result<(), ChannelError>;
}

/// Surface without a title.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl AttentionSurface for NullSurface {
    fn set_title(&self, _title: &str) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlinkSettings {
    /// Number of title changes before giving up. Zero disables the channel.
    pub toggles: u32,
    pub interval: Duration,
    pub idle_title: String,
}

impl Default for BlinkSettings {
    fn default() -> Self {
        Self {
            toggles: 10,
            interval: Duration::from_secs(1),
            idle_title: "focusbreak".into(),
        }
    }
}

pub struct AttentionChannel {
    surface: Arc<dyn AttentionSurface>,
    settings: BlinkSettings,
    focus: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for AttentionChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttentionChannel")
            .field("settings", &self.settings)
            .field("focused", &self.is_focused())
            .finish_non_exhaustive()
    }
}

impl AttentionChannel {
    pub fn new(surface: Arc<dyn AttentionSurface>, settings: BlinkSettings, focused: bool) -> Self {
        let (focus, _) = watch::channel(focused);
        Self {
            surface,
            settings,
            focus,
            task: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &BlinkSettings {
        &self.settings
    }

    pub fn is_focused(&self) -> bool {
        *self.focus.borrow()
    }

    /// Record a focus change. Regaining focus stops a running blink.
    pub fn set_focused(&self, focused: bool) {
        self.focus.send_replace(focused);
    }

    pub fn is_blinking(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Start blinking `alert_title`, replacing any blink in progress.
    ///
    /// # Errors
    ///
    /// Returns a `ChannelError` when there is no tokio runtime to run the
    /// blink on.
    pub fn signal(&self, alert_title: &str) -> Result<ChannelOutcome, ChannelError> {
        if self.settings.toggles == 0 {
            return Ok(ChannelOutcome::Skipped(SkipReason::Disabled));
        }
        if self.is_focused() {
            return Ok(ChannelOutcome::Skipped(SkipReason::Focused));
        }
        let handle = Handle::try_current()
            .map_err(|e| ChannelError::new("attention", format!("no async runtime: {e}")))?;

        let task = handle.spawn(blink(
            Arc::clone(&self.surface),
            self.focus.subscribe(),
            alert_title.to_string(),
            self.settings.clone(),
        ));
        if let Some(previous) = self.lock_task().replace(task) {
            previous.abort();
        }
        Ok(ChannelOutcome::Delivered)
    }

    /// Stop a blink in progress and restore the idle title.
    pub fn cancel(&self) {
        if let Some(task) = self.lock_task().take() {
            if !task.is_finished() {
                task.abort();
                let _ = self.surface.set_title(&self.settings.idle_title);
            }
        }
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AttentionChannel {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn blink(
    surface: Arc<dyn AttentionSurface>,
    mut focus: watch::Receiver<bool>,
    alert_title: String,
    settings: BlinkSettings,
) {
    let mut showing_alert = false;
    for _ in 0..settings.toggles {
        showing_alert = !showing_alert;
        let title = if showing_alert {
            alert_title.as_str()
        } else {
            settings.idle_title.as_str()
        };
        if let Err(e) = surface.set_title(title) {
            tracing::warn!("attention blink stopped: {e}");
            break;
        }

        let focus_regained = async {
            loop {
                if focus.changed().await.is_err() {
                    // Channel owner is gone; nothing left to wait for.
                    return;
                }
                let focused = *focus.borrow_and_update();
                if focused {
                    return;
                }
            }
        };
        tokio::select! {
            _ = tokio::time::sleep(settings.interval) => {}
            _ = focus_regained => {
                tracing::debug!("focus regained, blink cancelled");
                break;
            }
        }
    }
    let _ = surface.set_title(&settings.idle_title);
}
