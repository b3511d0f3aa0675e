//! The per-process focus timer.
//!
//! `FocusTimer` owns the engine, the exercise gate, the countdown driver and
//! the notification dispatcher, and is the only thing a front-end talks to.
//! State is published on a `watch` channel and every event on a `broadcast`
//! channel.
//!
//! All transitions run under one session lock, which is never held across
//! an `.await`. Events are broadcast and notices queued while the lock is
//! still held, so every subscriber sees transitions in the order they
//! happened, whichever task caused them. The queue is drained by one
//! dispatcher task that runs the channels on the blocking pool; a slow or
//! stuck channel delays later notices, never the countdown.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::clock::{Clock, SystemClock};
use crate::error::{PermissionError, ValidationError};
use crate::events::{Capability, Event};
use crate::exercise::{Exercise, ExerciseGate, ExerciseProvider, ShuffledCatalog};
use crate::notify::{
    AttentionChannel, AttentionSurface, AudioSink, Banner, BlinkSettings, Capabilities,
    ChannelGates, NoCapabilities, Notice, NotificationDispatcher, NullNotifier, NullSurface,
    PermissionState, SilentAudio, SystemNotifier,
};
use crate::timer::{
    ConfigPatch, CountdownDriver, TimerConfig, TimerEngine, TimerSnapshot, DEFAULT_POLL_INTERVAL,
};

const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub timer: TimerSnapshot,
    pub pending_exercise: Option<Exercise>,
    pub audio_enabled: bool,
    pub notifications_enabled: bool,
}

struct Session {
    engine: TimerEngine,
    gate: ExerciseGate,
    audio_enabled: bool,
    notifications_enabled: bool,
    notification_request_attempted: bool,
}

impl Session {
    fn view(&self) -> SessionView {
        SessionView {
            timer: self.engine.snapshot(),
            pending_exercise: self.gate.pending().cloned(),
            audio_enabled: self.audio_enabled,
            notifications_enabled: self.notifications_enabled,
        }
    }

    fn gates(&self) -> ChannelGates {
        ChannelGates {
            audio: self.audio_enabled,
            system: self.notifications_enabled,
        }
    }

    /// Keep the exercise gate in step with the engine.
    fn settle(&mut self, events: Vec<Event>) -> Vec<Event> {
        let mut settled = Vec::with_capacity(events.len() + 1);
        for event in events {
            let follow_up = match &event {
                Event::WorkCompleted { at, .. } => self
                    .gate
                    .present()
                    .map(|exercise| Event::ExerciseAssigned { exercise, at: *at }),
                Event::BreakStarted { .. } => {
                    self.gate.acknowledge();
                    None
                }
                Event::TimerReset { .. } => {
                    self.gate.clear();
                    None
                }
                _ => None,
            };
            settled.push(event);
            settled.extend(follow_up);
        }
        settled
    }
}

/// Work for the dispatcher task.
enum Job {
    Notify {
        notice: Notice,
        gates: ChannelGates,
        at: DateTime<Utc>,
    },
    Flush(oneshot::Sender<()>),
}

/// Start the dispatcher task, if there is a runtime to run it on.
///
/// The task ends once every sender is gone.
fn spawn_dispatcher(dispatcher: Arc<NotificationDispatcher>) -> Option<mpsc::UnboundedSender<Job>> {
    let handle = Handle::try_current().ok()?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    handle.spawn(async move {
        while let Some(job) = rx.recv().await {
            match job {
                Job::Notify { notice, gates, at } => {
                    let dispatcher = Arc::clone(&dispatcher);
                    let sent = tokio::task::spawn_blocking(move || {
                        dispatcher.dispatch(&notice, gates, at);
                    })
                    .await;
                    if let Err(e) = sent {
                        tracing::error!("notification dispatch aborted: {e}");
                    }
                }
                Job::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    });
    Some(tx)
}

struct Inner {
    session: Mutex<Session>,
    driver: Mutex<CountdownDriver>,
    dispatcher: Arc<NotificationDispatcher>,
    outbox: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    capabilities: Arc<dyn Capabilities>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<Event>,
    state: watch::Sender<SessionView>,
}

impl Inner {
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_driver(&self) -> MutexGuard<'_, CountdownDriver> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one transition under the lock and publish what it produced.
    fn apply<E>(
        self: &Arc<Self>,
        op: impl FnOnce(&mut Session) -> Result<Vec<Event>, E>,
    ) -> Result<Vec<Event>, E> {
        let (events, unsent) = {
            let mut session = self.lock_session();
            let events = op(&mut session)?;
            let events = session.settle(events);
            let unsent = self.publish(&events, session.gates());
            (events, unsent)
        };
        if !events.is_empty() {
            self.dispatch_inline(unsent);
            self.refresh_state();
            self.sync_driver();
        }
        Ok(events)
    }

    /// Broadcast `events` and queue their notices. Called with the session
    /// lock held; returns the notices that found no dispatcher task.
    fn publish(&self, events: &[Event], gates: ChannelGates) -> Vec<Job> {
        let mut unsent = Vec::new();
        for event in events {
            tracing::debug!(?event, "event");
            // Nobody listening is fine.
            let _ = self.events.send(event.clone());
            if let Some(notice) = Notice::from_event(event) {
                let job = Job::Notify {
                    notice,
                    gates,
                    at: event.at(),
                };
                if let Err(job) = self.enqueue(job) {
                    unsent.push(job);
                }
            }
        }
        unsent
    }

    fn enqueue(&self, job: Job) -> Result<(), Job> {
        let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
        if outbox.is_none() {
            *outbox = spawn_dispatcher(Arc::clone(&self.dispatcher));
        }
        let Some(tx) = outbox.as_ref() else {
            return Err(job);
        };
        match tx.send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(job)) => {
                // The runtime that ran the task is gone; try a fresh one next time.
                *outbox = None;
                Err(job)
            }
        }
    }

    /// Without a runtime there is no dispatcher task; fan out right here,
    /// outside the session lock.
    fn dispatch_inline(&self, jobs: Vec<Job>) {
        for job in jobs {
            if let Job::Notify { notice, gates, at } = job {
                self.dispatcher.dispatch(&notice, gates, at);
            }
        }
    }

    /// Resolves once every notice queued so far has been dispatched.
    async fn flush(&self) {
        let (done, finished) = oneshot::channel();
        if self.enqueue(Job::Flush(done)).is_ok() {
            let _ = finished.await;
        }
    }

    fn refresh_state(&self) {
        // Read the session inside the closure so concurrent refreshes
        // cannot publish an older view over a newer one.
        self.state.send_if_modified(|current| {
            let view = self.lock_session().view();
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    /// Arm the poll task while the engine runs, stop it otherwise.
    fn sync_driver(self: &Arc<Self>) {
        let mut driver = self.lock_driver();
        let running = self.lock_session().engine.is_running();
        if !running {
            driver.disarm();
            return;
        }
        let weak = Arc::downgrade(self);
        let armed = driver.arm(move || match weak.upgrade() {
            Some(inner) => inner.poll(),
            None => ControlFlow::Break(()),
        });
        if let Err(e) = armed {
            tracing::warn!("countdown driver not armed, tick manually: {e}");
        }
    }

    fn tick(&self) -> Vec<Event> {
        let (events, unsent) = {
            let mut session = self.lock_session();
            let events = session.engine.tick();
            let events = session.settle(events);
            let unsent = self.publish(&events, session.gates());
            (events, unsent)
        };
        self.dispatch_inline(unsent);
        self.refresh_state();
        events
    }

    /// Driver callback. Never touches the driver itself.
    fn poll(&self) -> ControlFlow<()> {
        self.tick();
        if self.lock_session().engine.is_running() {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    }

    fn set_permission(&self, capability: Capability, enabled: bool) {
        let changed = {
            let mut session = self.lock_session();
            let flag = match capability {
                Capability::Audio => &mut session.audio_enabled,
                Capability::Notifications => &mut session.notifications_enabled,
            };
            let changed = *flag != enabled;
            *flag = enabled;
            if changed {
                tracing::info!(?capability, enabled, "permission changed");
                let _ = self.events.send(Event::PermissionChanged {
                    capability,
                    enabled,
                    at: self.clock.now(),
                });
            }
            changed
        };
        if changed {
            self.refresh_state();
        }
    }
}

/// Handle to the focus timer. Cheap to clone; all clones drive the same
/// session.
#[derive(Clone)]
pub struct FocusTimer {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for FocusTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusTimer")
            .field("view", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl FocusTimer {
    pub fn builder() -> FocusTimerBuilder {
        FocusTimerBuilder::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionView {
        self.inner.lock_session().view()
    }

    pub fn config(&self) -> TimerConfig {
        *self.inner.lock_session().engine.config()
    }

    pub fn pending_exercise(&self) -> Option<Exercise> {
        self.inner.lock_session().gate.pending().cloned()
    }

    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.inner.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    pub fn banners(&self) -> broadcast::Receiver<Banner> {
        self.inner.dispatcher.banners()
    }

    pub fn is_driver_armed(&self) -> bool {
        self.inner.lock_driver().is_armed()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume the countdown.
    ///
    /// The first call also asks for notification permission, after the
    /// countdown is armed. A failed request is logged, not returned.
    pub async fn start(&self) -> Vec<Event> {
        let events = self.infallible(|session| session.engine.start());

        let first_start = {
            let mut session = self.inner.lock_session();
            !std::mem::replace(&mut session.notification_request_attempted, true)
        };
        if first_start {
            match self.request_notifications().await {
                Ok(state) => tracing::info!(?state, "notification permission"),
                Err(e) => tracing::warn!("notification permission request failed: {e}"),
            }
        }
        events
    }

    pub fn pause(&self) -> Vec<Event> {
        self.infallible(|session| session.engine.pause())
    }

    pub fn resume(&self) -> Vec<Event> {
        self.infallible(|session| session.engine.resume())
    }

    pub fn reset(&self) -> Vec<Event> {
        self.infallible(|session| session.engine.reset())
    }

    pub fn skip(&self) -> Vec<Event> {
        self.infallible(|session| session.engine.skip())
    }

    /// Confirm the pending exercise and start the break.
    pub fn acknowledge_exercise(&self) -> Vec<Event> {
        self.infallible(|session| session.engine.acknowledge_exercise())
    }

    /// Merge `patch` into the config and reset the session.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidValue` for an out-of-range field.
    /// Nothing changes in that case.
    pub fn update_config(&self, patch: &ConfigPatch) -> Result<Vec<Event>, ValidationError> {
        self.inner
            .apply(|session| session.engine.update_config(patch))
    }

    /// Replace the whole config and reset the session.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidValue` for an out-of-range field.
    /// Nothing changes in that case.
    pub fn replace_config(&self, config: TimerConfig) -> Result<Vec<Event>, ValidationError> {
        self.inner
            .apply(|session| session.engine.replace_config(config))
    }

    /// Poll once by hand. The driver does this on its own when a runtime
    /// is available.
    pub fn tick(&self) -> Vec<Event> {
        self.inner.tick()
    }

    pub fn set_focused(&self, focused: bool) {
        self.inner.dispatcher.set_focused(focused);
    }

    /// Wait until every notice published so far went through its channels.
    pub async fn flush_notifications(&self) {
        self.inner.flush().await;
    }

    /// Turn audio off, or try to turn it on with a trial sound.
    ///
    /// Returns the new state of the flag.
    ///
    /// # Errors
    ///
    /// Returns the `PermissionError` from the trial; audio stays off.
    /// Dropping the future before it completes also leaves audio off.
    pub async fn toggle_audio(&self) -> Result<bool, PermissionError> {
        let enabled = self.inner.lock_session().audio_enabled;
        if enabled {
            self.inner.set_permission(Capability::Audio, false);
            return Ok(false);
        }
        let capabilities = Arc::clone(&self.inner.capabilities);
        let trial = tokio::task::spawn_blocking(move || capabilities.request_audio()).await?;
        if let Err(e) = trial {
            tracing::warn!("audio trial failed: {e}");
            return Err(e);
        }
        self.inner.set_permission(Capability::Audio, true);
        Ok(true)
    }

    /// Ask the platform for notification permission.
    ///
    /// A state that is already decided is taken as is: a denial is never
    /// prompted again.
    ///
    /// # Errors
    ///
    /// Returns the `PermissionError` from the prompt. Notifications stay off.
    pub async fn request_notifications(&self) -> Result<PermissionState, PermissionError> {
        let capabilities = Arc::clone(&self.inner.capabilities);
        let state = match capabilities.notification_permission() {
            PermissionState::NotRequested => {
                tokio::task::spawn_blocking(move || capabilities.request_notification_permission())
                    .await??
            }
            decided => decided,
        };
        self.inner
            .set_permission(Capability::Notifications, state == PermissionState::Granted);
        Ok(state)
    }

    fn infallible(&self, op: impl FnOnce(&mut Session) -> Vec<Event>) -> Vec<Event> {
        match self
            .inner
            .apply(|session| Ok::<_, std::convert::Infallible>(op(session)))
        {
            Ok(events) => events,
            Err(never) => match never {},
        }
    }
}

/// Builds a [`FocusTimer`]. Every part has a quiet default, so tests only
/// replace what they observe.
pub struct FocusTimerBuilder {
    config: TimerConfig,
    clock: Arc<dyn Clock>,
    capabilities: Arc<dyn Capabilities>,
    audio: Box<dyn AudioSink>,
    notifier: Box<dyn SystemNotifier>,
    surface: Arc<dyn AttentionSurface>,
    blink: BlinkSettings,
    focused: bool,
    provider: Box<dyn ExerciseProvider>,
    poll_interval: Duration,
    event_capacity: usize,
}

impl Default for FocusTimerBuilder {
    fn default() -> Self {
        Self {
            config: TimerConfig::default(),
            clock: Arc::new(SystemClock),
            capabilities: Arc::new(NoCapabilities),
            audio: Box::new(SilentAudio),
            notifier: Box::new(NullNotifier),
            surface: Arc::new(NullSurface),
            blink: BlinkSettings::default(),
            focused: true,
            provider: Box::new(ShuffledCatalog::builtin()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl FocusTimerBuilder {
    pub fn with_config(mut self, config: TimerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Arc<dyn Capabilities>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_audio(mut self, audio: Box<dyn AudioSink>) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn SystemNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_attention(mut self, surface: Arc<dyn AttentionSurface>, blink: BlinkSettings) -> Self {
        self.surface = surface;
        self.blink = blink;
        self
    }

    /// Initial focus state. Defaults to focused.
    pub fn with_focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn with_exercises(mut self, provider: Box<dyn ExerciseProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// # Errors
    ///
    /// Returns `ValidationError::InvalidValue` when the config is out of
    /// range.
    pub fn build(self) -> Result<FocusTimer, ValidationError> {
        self.config.validate()?;

        let session = Session {
            engine: TimerEngine::new(self.config, Arc::clone(&self.clock)),
            gate: ExerciseGate::new(self.provider),
            audio_enabled: false,
            notifications_enabled: false,
            notification_request_attempted: false,
        };
        let (state, _) = watch::channel(session.view());
        let (events, _) = broadcast::channel(self.event_capacity);
        let dispatcher = Arc::new(NotificationDispatcher::new(
            self.audio,
            self.notifier,
            AttentionChannel::new(self.surface, self.blink, self.focused),
        ));

        Ok(FocusTimer {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                driver: Mutex::new(CountdownDriver::new(self.poll_interval)),
                dispatcher,
                outbox: Mutex::new(None),
                capabilities: self.capabilities,
                clock: self.clock,
                events,
                state,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::timer::Phase;

    fn timer() -> (FocusTimer, ManualClock) {
        let clock = ManualClock::new(0);
        let timer = FocusTimer::builder()
            .with_clock(Arc::new(clock.clone()))
            .with_exercises(Box::new(ShuffledCatalog::builtin().with_seed(3)))
            .build()
            .unwrap();
        (timer, clock)
    }

    #[test]
    fn build_rejects_invalid_config() {
        let err = FocusTimer::builder()
            .with_config(TimerConfig {
                break_minutes: 0,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert_eq!(err.field(), Some("break_minutes"));
    }

    #[tokio::test(start_paused = true)]
    async fn start_arms_driver_and_publishes_view() {
        let (timer, _clock) = timer();
        let mut view = timer.watch();
        assert!(!timer.is_driver_armed());

        timer.start().await;
        assert!(timer.is_driver_armed());
        assert!(view.has_changed().unwrap());
        let current = view.borrow_and_update().clone();
        assert_eq!(current.timer.phase, Phase::Working);
        assert_eq!(current.timer.remaining_secs, 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_disarms_driver() {
        let (timer, _clock) = timer();
        timer.start().await;
        timer.pause();
        assert!(!timer.is_driver_armed());
        timer.resume();
        assert!(timer.is_driver_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn work_completion_assigns_exercise() {
        let (timer, _clock) = timer();
        let mut events = timer.subscribe();
        timer.start().await;
        timer.skip();

        assert!(matches!(events.recv().await.unwrap(), Event::WorkStarted { .. }));
        assert!(matches!(events.recv().await.unwrap(), Event::WorkCompleted { .. }));
        let assigned = match events.recv().await.unwrap() {
            Event::ExerciseAssigned { exercise, .. } => exercise,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(timer.pending_exercise(), Some(assigned));
        assert!(!timer.is_driver_armed());

        timer.acknowledge_exercise();
        assert!(timer.pending_exercise().is_none());
        assert_eq!(timer.snapshot().timer.phase, Phase::ShortBreak);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_drops_pending_exercise() {
        let (timer, _clock) = timer();
        timer.start().await;
        timer.skip();
        assert!(timer.pending_exercise().is_some());
        timer.reset();
        assert!(timer.pending_exercise().is_none());
        assert!(!timer.snapshot().timer.awaiting_exercise);
    }

    #[test]
    fn manual_tick_without_runtime() {
        let (timer, clock) = timer();
        let events = timer.infallible(|session| session.engine.start());
        assert_eq!(events.len(), 1);
        assert!(!timer.is_driver_armed());

        clock.advance_secs(1500);
        let events = timer.tick();
        assert!(matches!(events.first(), Some(Event::WorkCompleted { .. })));
        assert!(timer.snapshot().pending_exercise.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn replace_config_resets_or_leaves_session_alone() {
        let (timer, clock) = timer();
        timer.start().await;
        clock.advance_secs(100);

        let err = timer
            .replace_config(TimerConfig {
                sessions_before_long_break: 0,
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.field(), Some("sessions_before_long_break"));
        assert_eq!(timer.config(), TimerConfig::default());
        assert!(timer.snapshot().timer.is_running);
        assert!(timer.is_driver_armed());

        let replacement = TimerConfig {
            work_minutes: 50,
            break_minutes: 10,
            long_break_minutes: 30,
            sessions_before_long_break: 3,
        };
        let events = timer.replace_config(replacement).unwrap();
        assert!(matches!(
            events.as_slice(),
            [Event::ConfigUpdated { .. }, Event::TimerReset { .. }]
        ));
        assert_eq!(timer.config(), replacement);
        let view = timer.snapshot();
        assert_eq!(view.timer.phase, Phase::Idle);
        assert!(!view.timer.is_running);
        assert!(!timer.is_driver_armed());

        timer.start().await;
        assert_eq!(timer.snapshot().timer.remaining_secs, 50 * 60);
    }

    #[test]
    fn view_serializes_flat() {
        let (timer, _clock) = timer();
        let json = serde_json::to_value(timer.snapshot()).unwrap();
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["formatted_time"], "00:00");
        assert_eq!(json["audio_enabled"], false);
        assert!(json["pending_exercise"].is_null());
    }
}
