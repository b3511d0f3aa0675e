//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use focusbreak_core::error::{ChannelError, PermissionError};
use focusbreak_core::notify::{AttentionSurface, AudioSink, Capabilities, Cue, Notice, PermissionState, SystemNotifier};
use focusbreak_core::{Clock, Event};
use tokio::sync::broadcast;

/// Wall clock that follows tokio's (pausable) time.
pub struct TokioClock {
    base: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            base: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        1_700_000_000_000 + self.base.elapsed().as_millis() as u64
    }
}

pub struct FakeCapabilities {
    pub audio_works: bool,
    pub permission: Mutex<PermissionState>,
    /// What the prompt answers.
    pub prompt_answer: PermissionState,
    /// The prompt itself errors out instead of answering.
    pub prompt_fails: bool,
    /// How long the audio trial and the prompt block.
    pub delay: Duration,
    pub prompts: AtomicU32,
    pub audio_trials: AtomicU32,
}

impl FakeCapabilities {
    pub fn new(audio_works: bool, permission: PermissionState, prompt_answer: PermissionState) -> Arc<Self> {
        Arc::new(Self::plain(audio_works, permission, prompt_answer))
    }

    /// A platform whose notification prompt fails.
    pub fn broken_prompt() -> Arc<Self> {
        Arc::new(Self {
            prompt_fails: true,
            ..Self::plain(true, PermissionState::NotRequested, PermissionState::Granted)
        })
    }

    /// Audio trial and prompt both take `delay` to answer, and succeed.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::plain(true, PermissionState::NotRequested, PermissionState::Granted)
        })
    }

    fn plain(audio_works: bool, permission: PermissionState, prompt_answer: PermissionState) -> Self {
        Self {
            audio_works,
            permission: Mutex::new(permission),
            prompt_answer,
            prompt_fails: false,
            delay: Duration::ZERO,
            prompts: AtomicU32::new(0),
            audio_trials: AtomicU32::new(0),
        }
    }

    pub fn prompts(&self) -> u32 {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl Capabilities for FakeCapabilities {
    fn request_audio(&self) -> Result<(), PermissionError> {
        self.audio_trials.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if self.audio_works {
            Ok(())
        } else {
            Err(PermissionError::Audio("no output device".into()))
        }
    }

    fn notification_permission(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    fn request_notification_permission(&self) -> Result<PermissionState, PermissionError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if self.prompt_fails {
            return Err(PermissionError::Notifications("no notification daemon".into()));
        }
        *self.permission.lock().unwrap() = self.prompt_answer;
        Ok(self.prompt_answer)
    }
}

/// Records what each channel was asked to do, optionally failing.
#[derive(Clone, Default)]
pub struct Recorder {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
    /// Blocks for the given time whenever it records this entry.
    pub stall: Option<(String, Duration)>,
}

impl Recorder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn stalling_on(entry: &str, delay: Duration) -> Self {
        Self {
            stall: Some((entry.to_string(), delay)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, channel: &'static str, entry: String) -> Result<(), ChannelError> {
        if let Some((stall_on, delay)) = &self.stall {
            if *stall_on == entry {
                std::thread::sleep(*delay);
            }
        }
        self.calls.lock().unwrap().push(entry);
        if self.fail {
            Err(ChannelError::new(channel, "broken on purpose"))
        } else {
            Ok(())
        }
    }
}

impl AudioSink for Recorder {
    fn play(&self, cue: Cue) -> Result<(), ChannelError> {
        self.record("audio", format!("{cue:?}"))
    }
}

impl SystemNotifier for Recorder {
    fn show(&self, notice: &Notice) -> Result<(), ChannelError> {
        self.record("system", notice.title.clone())
    }
}

impl AttentionSurface for Recorder {
    fn set_title(&self, title: &str) -> Result<(), ChannelError> {
        self.record("attention", title.to_string())
    }
}

/// Everything currently buffered on an event receiver.
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}
