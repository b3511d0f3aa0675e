use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::{Cue, Notice, NoticeKind};
use crate::error::ChannelError;

/// Plays the audio cue for a notice.
pub trait AudioSink: Send + Sync {
    fn play(&self, cue: Cue) -> Result<(), ChannelError>;
}

/// Shows an OS-level notification.
pub trait SystemNotifier: Send + Sync {
    fn show(&self, notice: &Notice) -> Result<(), ChannelError>;
}

/// Audio sink that plays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play(&self, _cue: Cue) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Notifier that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl SystemNotifier for NullNotifier {
    fn show(&self, _notice: &Notice) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// In-app banner, rendered by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
    pub at: DateTime<Utc>,
}

/// Banner feed for the presentation layer. Never fails: with no subscriber
/// the banner is simply dropped.
#[derive(Debug, Clone)]
pub struct BannerChannel {
    tx: broadcast::Sender<Banner>,
}

impl BannerChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn post(&self, notice: &Notice, at: DateTime<Utc>) {
        let banner = Banner {
            kind: notice.kind,
            title: notice.title.clone(),
            body: notice.body.clone(),
            at,
        };
        // No receivers is fine.
        let _ = self.tx.send(banner);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Banner> {
        self.tx.subscribe()
    }
}

impl Default for BannerChannel {
    fn default() -> Self {
        Self::new(32)
    }
}
