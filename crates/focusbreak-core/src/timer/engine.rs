//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller (usually the countdown driver) is responsible
//! for calling `tick()` periodically.
//!
//! Remaining time is never decremented. Each countdown is armed with an anchor
//! (the clock reading at arm time) and a budget in seconds; remaining time is
//! derived from those two and the current clock reading. A caller that misses
//! ticks for any length of time sees the correct value on its next read.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Working -> AwaitingExercise -> (ShortBreak | LongBreak) -> Working -> ...
//!            \______________ pause/resume on any armed phase ______________/
//! ```
//!
//! `AwaitingExercise` is `Idle` with the `awaiting_exercise` flag set: no
//! countdown exists and only `acknowledge_exercise()` or `reset()` leave it.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(TimerConfig::default(), Arc::new(SystemClock));
//! engine.start();
//! // In a loop:
//! let events = engine.tick(); // non-empty when a phase is exhausted
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::config::{ConfigPatch, TimerConfig};
use super::phase::{format_mmss, BreakKind, Phase};
use crate::clock::Clock;
use crate::error::ValidationError;
use crate::events::Event;

/// Derive remaining whole seconds from an armed budget and elapsed time.
///
/// Partial seconds do not count as elapsed, so a fresh countdown reads its
/// full budget until a whole second has passed.
pub fn remaining_after(armed_secs: u64, elapsed_ms: u64) -> u64 {
    armed_secs.saturating_sub(elapsed_ms / 1000)
}

/// Read-only view of the engine for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub remaining_secs: u64,
    pub formatted_time: String,
    pub total_secs: u64,
    pub progress_pct: f64,
    pub current_session: u32,
    pub completed_work_sessions: u32,
    pub is_running: bool,
    pub is_paused: bool,
    pub awaiting_exercise: bool,
    pub config: TimerConfig,
}

/// Core timer engine.
pub struct TimerEngine {
    clock: Arc<dyn Clock>,
    config: TimerConfig,
    phase: Phase,
    running: bool,
    awaiting_exercise: bool,
    /// Clock reading (ms) when the current countdown was last armed or resumed.
    /// `None` while paused or idle.
    anchor_ms: Option<u64>,
    /// Seconds budgeted at the last arm. While paused this is the frozen
    /// remaining time.
    armed_secs: u64,
    current_session: u32,
    completed_work_sessions: u32,
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("phase", &self.phase)
            .field("running", &self.running)
            .field("awaiting_exercise", &self.awaiting_exercise)
            .field("anchor_ms", &self.anchor_ms)
            .field("armed_secs", &self.armed_secs)
            .field("current_session", &self.current_session)
            .field("completed_work_sessions", &self.completed_work_sessions)
            .finish_non_exhaustive()
    }
}

impl TimerEngine {
    /// Create a new timer engine in the `Idle` state.
    ///
    /// The config is trusted here; validate user input with
    /// [`TimerConfig::validate`] or go through [`TimerEngine::update_config`].
    pub fn new(config: TimerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            config,
            phase: Phase::Idle,
            running: false,
            awaiting_exercise: false,
            anchor_ms: None,
            armed_secs: 0,
            current_session: 1,
            completed_work_sessions: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// An armed phase whose countdown is frozen.
    pub fn is_paused(&self) -> bool {
        !self.running && self.phase != Phase::Idle
    }

    pub fn is_awaiting_exercise(&self) -> bool {
        self.awaiting_exercise
    }

    pub fn current_session(&self) -> u32 {
        self.current_session
    }

    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work_sessions
    }

    pub fn remaining_secs(&self) -> u64 {
        match self.anchor_ms {
            Some(anchor) if self.running => {
                let elapsed = self.clock.now_ms().saturating_sub(anchor);
                remaining_after(self.armed_secs, elapsed)
            }
            _ => self.armed_secs,
        }
    }

    /// Full length of the current phase as configured.
    pub fn total_secs(&self) -> u64 {
        match self.phase {
            Phase::Idle => 0,
            Phase::Working => self.config.work_secs(),
            Phase::ShortBreak => self.config.break_secs(),
            Phase::LongBreak => self.config.long_break_secs(),
        }
    }

    /// 0.0 .. 100.0 progress within the current phase.
    pub fn progress_pct(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        let remaining = self.remaining_secs().min(total);
        (total - remaining) as f64 / total as f64 * 100.0
    }

    pub fn formatted_time(&self) -> String {
        format_mmss(self.remaining_secs())
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let remaining_secs = self.remaining_secs();
        TimerSnapshot {
            phase: self.phase,
            remaining_secs,
            formatted_time: format_mmss(remaining_secs),
            total_secs: self.total_secs(),
            progress_pct: self.progress_pct(),
            current_session: self.current_session,
            completed_work_sessions: self.completed_work_sessions,
            is_running: self.running,
            is_paused: self.is_paused(),
            awaiting_exercise: self.awaiting_exercise,
            config: self.config,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a work session from `Idle`, or resume a paused phase.
    /// No-op while running or while waiting for the exercise.
    pub fn start(&mut self) -> Vec<Event> {
        if self.awaiting_exercise {
            tracing::debug!("start ignored: waiting for exercise acknowledgement");
            return Vec::new();
        }
        match self.phase {
            Phase::Idle => vec![self.begin_work()],
            _ if self.running => Vec::new(),
            _ => self.resume(),
        }
    }

    pub fn resume(&mut self) -> Vec<Event> {
        if !self.is_paused() {
            return Vec::new();
        }
        // Re-anchor: the frozen remaining time becomes the new budget.
        self.arm(self.armed_secs);
        tracing::debug!(phase = ?self.phase, remaining_secs = self.armed_secs, "resumed");
        vec![Event::TimerResumed {
            phase: self.phase,
            remaining_secs: self.armed_secs,
            at: self.clock.now(),
        }]
    }

    pub fn pause(&mut self) -> Vec<Event> {
        if !self.running {
            return Vec::new();
        }
        let remaining = self.remaining_secs();
        self.running = false;
        self.anchor_ms = None;
        self.armed_secs = remaining;
        tracing::debug!(phase = ?self.phase, remaining_secs = remaining, "paused");
        vec![Event::TimerPaused {
            phase: self.phase,
            remaining_secs: remaining,
            at: self.clock.now(),
        }]
    }

    /// Back to `Idle` with remaining time zeroed and the session index reset.
    /// `completed_work_sessions` survives resets.
    pub fn reset(&mut self) -> Vec<Event> {
        self.phase = Phase::Idle;
        self.running = false;
        self.awaiting_exercise = false;
        self.anchor_ms = None;
        self.armed_secs = 0;
        self.current_session = 1;
        tracing::debug!("reset");
        vec![Event::TimerReset {
            at: self.clock.now(),
        }]
    }

    /// Run the exhausted transition of the current phase immediately.
    /// No-op from `Idle` and while waiting for the exercise.
    pub fn skip(&mut self) -> Vec<Event> {
        if self.phase == Phase::Idle {
            return Vec::new();
        }
        tracing::debug!(phase = ?self.phase, "skipped");
        self.exhaust()
    }

    /// Call periodically. Returns the transition events when the countdown
    /// has run out.
    pub fn tick(&mut self) -> Vec<Event> {
        if self.running && self.remaining_secs() == 0 {
            return self.exhaust();
        }
        Vec::new()
    }

    /// Leave the exercise gate and arm the break.
    pub fn acknowledge_exercise(&mut self) -> Vec<Event> {
        if !self.awaiting_exercise {
            return Vec::new();
        }
        self.awaiting_exercise = false;
        let kind = if self
            .config
            .is_long_break_after(self.completed_work_sessions)
        {
            BreakKind::Long
        } else {
            BreakKind::Short
        };
        let duration_secs = match kind {
            BreakKind::Short => self.config.break_secs(),
            BreakKind::Long => self.config.long_break_secs(),
        };
        self.phase = kind.phase();
        self.arm(duration_secs);
        tracing::info!(?kind, duration_secs, "break started");
        vec![Event::BreakStarted {
            kind,
            session: self.current_session,
            duration_secs,
            at: self.clock.now(),
        }]
    }

    /// Merge a partial config and reset. In-progress timing is discarded.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidValue` naming the offending field;
    /// the engine is left untouched.
    pub fn update_config(&mut self, patch: &ConfigPatch) -> Result<Vec<Event>, ValidationError> {
        let merged = self.config.merged(patch)?;
        Ok(self.apply_config(merged))
    }

    /// Replace the whole config and reset.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidValue` naming the offending field;
    /// the engine is left untouched.
    pub fn replace_config(&mut self, config: TimerConfig) -> Result<Vec<Event>, ValidationError> {
        config.validate()?;
        Ok(self.apply_config(config))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn apply_config(&mut self, config: TimerConfig) -> Vec<Event> {
        self.config = config;
        tracing::info!(?config, "config updated");
        let mut events = vec![Event::ConfigUpdated {
            config,
            at: self.clock.now(),
        }];
        events.extend(self.reset());
        events
    }

    fn arm(&mut self, secs: u64) {
        self.anchor_ms = Some(self.clock.now_ms());
        self.armed_secs = secs;
        self.running = true;
    }

    fn begin_work(&mut self) -> Event {
        self.phase = Phase::Working;
        let duration_secs = self.config.work_secs();
        self.arm(duration_secs);
        tracing::info!(session = self.current_session, duration_secs, "work started");
        Event::WorkStarted {
            session: self.current_session,
            duration_secs,
            at: self.clock.now(),
        }
    }

    fn exhaust(&mut self) -> Vec<Event> {
        match self.phase {
            Phase::Working => {
                self.completed_work_sessions += 1;
                self.phase = Phase::Idle;
                self.running = false;
                self.anchor_ms = None;
                self.armed_secs = 0;
                self.awaiting_exercise = true;
                tracing::info!(
                    completed = self.completed_work_sessions,
                    "work completed, waiting for exercise"
                );
                vec![Event::WorkCompleted {
                    session: self.current_session,
                    completed_work_sessions: self.completed_work_sessions,
                    at: self.clock.now(),
                }]
            }
            Phase::ShortBreak | Phase::LongBreak => {
                let kind = self.phase.break_kind().unwrap_or(BreakKind::Short);
                let finished = Event::BreakCompleted {
                    kind,
                    session: self.current_session,
                    at: self.clock.now(),
                };
                self.current_session += 1;
                vec![finished, self.begin_work()]
            }
            Phase::Idle => Vec::new(),
        }
    }
}
