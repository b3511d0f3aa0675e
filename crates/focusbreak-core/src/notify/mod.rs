//! Notification fan-out.
//!
//! A phase event becomes a [`Notice`], which the dispatcher hands to four
//! channels in a fixed order: audio, system notification, in-app banner,
//! attention. Each channel has its own gate and its own failure; a failing
//! channel is logged and recorded, and the next one still runs.

mod attention;
mod channels;
mod permission;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use attention::{AttentionChannel, AttentionSurface, BlinkSettings, NullSurface};
pub use channels::{AudioSink, Banner, BannerChannel, NullNotifier, SilentAudio, SystemNotifier};
pub use permission::{Capabilities, NoCapabilities, PermissionState};

use crate::error::ChannelError;
use crate::events::Event;
use crate::timer::BreakKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    WorkStarted,
    WorkCompleted,
    BreakStarted,
    BreakCompleted,
}

/// Which sound to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// Something begins (work or break).
    Start,
    /// Something ends.
    End,
}

/// User-facing text for one phase event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
    pub cue: Cue,
}

impl Notice {
    /// `None` for events that are not phase events.
    pub fn from_event(event: &Event) -> Option<Self> {
        let notice = match event {
            Event::WorkStarted {
                session,
                duration_secs,
                ..
            } => Notice {
                kind: NoticeKind::WorkStarted,
                title: format!("Focus session {session}"),
                body: format!("Focus for {} minutes.", duration_secs / 60),
                cue: Cue::Start,
            },
            Event::WorkCompleted { .. } => Notice {
                kind: NoticeKind::WorkCompleted,
                title: "Focus session complete".into(),
                body: "Time to move. Do the exercise, then confirm to start your break.".into(),
                cue: Cue::End,
            },
            Event::BreakStarted {
                kind,
                duration_secs,
                ..
            } => Notice {
                kind: NoticeKind::BreakStarted,
                title: match kind {
                    BreakKind::Short => "Short break".into(),
                    BreakKind::Long => "Long break".into(),
                },
                body: format!("Relax for {} minutes.", duration_secs / 60),
                cue: Cue::Start,
            },
            Event::BreakCompleted { .. } => Notice {
                kind: NoticeKind::BreakCompleted,
                title: "Break over".into(),
                body: "Back to focus.".into(),
                cue: Cue::End,
            },
            _ => return None,
        };
        Some(notice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The channel's flag is off.
    Disabled,
    /// The application is in front of the user already.
    Focused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    Delivered,
    Skipped(SkipReason),
    Failed(ChannelError),
}

impl ChannelOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ChannelOutcome::Delivered)
    }
}

/// Per-dispatch flags for the gated channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelGates {
    pub audio: bool,
    pub system: bool,
}

/// What happened on each channel, in fan-out order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub audio: ChannelOutcome,
    pub system: ChannelOutcome,
    pub banner: ChannelOutcome,
    pub attention: ChannelOutcome,
}

impl DispatchReport {
    pub fn failures(&self) -> Vec<&ChannelError> {
        [&self.audio, &self.system, &self.banner, &self.attention]
            .into_iter()
            .filter_map(|outcome| match outcome {
                ChannelOutcome::Failed(err) => Some(err),
                _ => None,
            })
            .collect()
    }
}

pub struct NotificationDispatcher {
    audio: Box<dyn AudioSink>,
    system: Box<dyn SystemNotifier>,
    banner: BannerChannel,
    attention: AttentionChannel,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("attention", &self.attention)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(
        audio: Box<dyn AudioSink>,
        system: Box<dyn SystemNotifier>,
        attention: AttentionChannel,
    ) -> Self {
        Self {
            audio,
            system,
            banner: BannerChannel::default(),
            attention,
        }
    }

    pub fn banners(&self) -> tokio::sync::broadcast::Receiver<Banner> {
        self.banner.subscribe()
    }

    pub fn set_focused(&self, focused: bool) {
        self.attention.set_focused(focused);
    }

    /// Fan a notice out to every channel. Never fails as a whole.
    pub fn dispatch(&self, notice: &Notice, gates: ChannelGates, at: DateTime<Utc>) -> DispatchReport {
        let audio = if gates.audio {
            contain(self.audio.play(notice.cue).map(|()| ChannelOutcome::Delivered))
        } else {
            ChannelOutcome::Skipped(SkipReason::Disabled)
        };

        let system = if gates.system {
            contain(self.system.show(notice).map(|()| ChannelOutcome::Delivered))
        } else {
            ChannelOutcome::Skipped(SkipReason::Disabled)
        };

        self.banner.post(notice, at);
        let banner = ChannelOutcome::Delivered;

        let attention = contain(self.attention.signal(&notice.title));

        let report = DispatchReport {
            audio,
            system,
            banner,
            attention,
        };
        tracing::debug!(kind = ?notice.kind, ?report, "notice dispatched");
        report
    }
}

fn contain(result: Result<ChannelOutcome, ChannelError>) -> ChannelOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!("{err}");
            ChannelOutcome::Failed(err)
        }
    }
}
