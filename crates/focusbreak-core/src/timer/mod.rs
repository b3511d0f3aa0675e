mod config;
pub mod driver;
mod engine;
mod phase;

pub use config::{
    ConfigPatch, TimerConfig, BREAK_MINUTES_RANGE, LONG_BREAK_MINUTES_RANGE,
    SESSIONS_BEFORE_LONG_BREAK_RANGE, WORK_MINUTES_RANGE,
};
pub use driver::{CountdownDriver, DEFAULT_POLL_INTERVAL};
pub use engine::{remaining_after, TimerEngine, TimerSnapshot};
pub use phase::{format_mmss, BreakKind, Phase};
