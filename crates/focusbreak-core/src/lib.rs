//! # focusbreak Core Library
//!
//! This library provides the core logic for the focusbreak focus/break timer.
//! Front-ends (the `focusbreak` terminal binary, or any GUI) are thin layers
//! over [`FocusTimer`].
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine. Remaining time is
//!   derived from an anchor and an armed budget, never decremented
//! - **Countdown Driver**: A tokio task polling the engine every 100 ms
//! - **Exercise Gate**: Holds the session between work and break until the
//!   user confirms a short mobility exercise
//! - **Notifications**: Audio, system notification, in-app banner and
//!   title-blink channels, each gated and failing on its own
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`FocusTimer`]: The service front-ends talk to
//! - [`TimerEngine`]: Core timer state machine
//! - [`NotificationDispatcher`]: Notification fan-out
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod exercise;
pub mod notify;
pub mod service;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ChannelError, ConfigError, CoreError, PermissionError, ValidationError};
pub use events::{Capability, Event};
pub use exercise::{Exercise, ExerciseGate, ExerciseProvider, ShuffledCatalog};
pub use notify::{
    AttentionSurface, AudioSink, Banner, Capabilities, Cue, DispatchReport, Notice, NoticeKind,
    NotificationDispatcher, PermissionState, SystemNotifier,
};
pub use service::{FocusTimer, FocusTimerBuilder, SessionView};
pub use storage::Config;
pub use timer::{BreakKind, ConfigPatch, Phase, TimerConfig, TimerEngine, TimerSnapshot};
