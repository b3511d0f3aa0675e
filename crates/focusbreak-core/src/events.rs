use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exercise::Exercise;
use crate::timer::{BreakKind, Phase, TimerConfig};

/// Every state change in the timer produces an Event.
/// The UI subscribes to them; the notification dispatcher fans out the
/// phase events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    WorkStarted {
        session: u32,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// Work countdown exhausted (or skipped). The timer now waits for the
    /// exercise to be acknowledged.
    WorkCompleted {
        session: u32,
        completed_work_sessions: u32,
        at: DateTime<Utc>,
    },
    /// The exercise gate picked an exercise for the pending break.
    ExerciseAssigned {
        exercise: Exercise,
        at: DateTime<Utc>,
    },
    BreakStarted {
        kind: BreakKind,
        session: u32,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    BreakCompleted {
        kind: BreakKind,
        session: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    ConfigUpdated {
        config: TimerConfig,
        at: DateTime<Utc>,
    },
    PermissionChanged {
        capability: Capability,
        enabled: bool,
        at: DateTime<Utc>,
    },
}

/// A runtime permission the timer tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Audio,
    Notifications,
}

impl Event {
    /// Phase events are the ones fanned out to notification channels.
    pub fn is_phase_event(&self) -> bool {
        matches!(
            self,
            Event::WorkStarted { .. }
                | Event::WorkCompleted { .. }
                | Event::BreakStarted { .. }
                | Event::BreakCompleted { .. }
        )
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::WorkStarted { at, .. }
            | Event::WorkCompleted { at, .. }
            | Event::ExerciseAssigned { at, .. }
            | Event::BreakStarted { at, .. }
            | Event::BreakCompleted { at, .. }
            | Event::TimerPaused { at, .. }
            | Event::TimerResumed { at, .. }
            | Event::TimerReset { at }
            | Event::ConfigUpdated { at, .. }
            | Event::PermissionChanged { at, .. } => *at,
        }
    }
}
