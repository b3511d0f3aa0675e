//! Countdown driver.
//!
//! Runs as a tokio task, calling a poll function at a fixed interval until the
//! poll asks it to stop. The driver knows nothing about phases: the poll
//! function reads the clock through the engine and decides.
//!
//! At most one poll task exists per driver. Arming always aborts the previous
//! task first, and dropping the driver aborts it too.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Finer than the one-second display granularity so the UI never lags a
/// second behind.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct CountdownDriver {
    poll_interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl Default for CountdownDriver {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl CountdownDriver {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            task: None,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Start polling on the current tokio runtime.
    ///
    /// `poll` runs once per interval; returning `ControlFlow::Break` ends the
    /// task. Any previously armed task is aborted first.
    ///
    /// # Errors
    ///
    /// Returns an error if called outside a tokio runtime. The driver is left
    /// disarmed in that case.
    pub fn arm<F>(&mut self, mut poll: F) -> Result<(), TryCurrentError>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        self.disarm();
        let handle = Handle::try_current()?;
        let period = self.poll_interval;
        self.task = Some(handle.spawn(async move {
            let mut ticker = interval(period);
            // After a suspension, poll once and carry on. Never replay.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if poll().is_break() {
                    break;
                }
            }
        }));
        Ok(())
    }

    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for CountdownDriver {
    fn drop(&mut self) {
        self.disarm();
    }
}
