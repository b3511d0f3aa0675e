//! Desktop side effects: sound through the platform's command-line player,
//! notifications through notify-rust, attention through the terminal title.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use crossterm::execute;
use crossterm::terminal::SetTitle;
use focusbreak_core::error::{ChannelError, PermissionError};
use focusbreak_core::notify::{
    AttentionSurface, AudioSink, Capabilities, Cue, Notice, PermissionState, SystemNotifier,
};
use notify_rust::Notification;

const START_SOUNDS: &[(&str, &str)] = &[
    ("paplay", "/usr/share/sounds/freedesktop/stereo/bell.oga"),
    ("aplay", "/usr/share/sounds/sound-icons/guitar-13.wav"),
    ("afplay", "/System/Library/Sounds/Glass.aiff"),
];

const END_SOUNDS: &[(&str, &str)] = &[
    ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
    ("aplay", "/usr/share/sounds/sound-icons/guitar-11.wav"),
    ("aplay", "/usr/share/sounds/generic.wav"),
    ("afplay", "/System/Library/Sounds/Hero.aiff"),
];

/// Plays sounds by shelling out to `paplay`, `aplay` or `afplay`.
#[derive(Debug, Clone, Default)]
pub struct SoundPlayer {
    custom: Option<PathBuf>,
}

impl SoundPlayer {
    pub fn new(custom: Option<String>) -> Self {
        Self {
            custom: custom.map(PathBuf::from),
        }
    }

    /// First player/file pair that exists on this machine.
    fn pick(&self, cue: Cue) -> Option<(&'static str, PathBuf)> {
        if let Some(file) = &self.custom {
            if file.exists() {
                let player = if cfg!(target_os = "macos") { "afplay" } else { "paplay" };
                return Some((player, file.clone()));
            }
            tracing::warn!(file = %file.display(), "custom sound file not found, using default");
        }
        let candidates = match cue {
            Cue::Start => START_SOUNDS,
            Cue::End => END_SOUNDS,
        };
        candidates
            .iter()
            .find(|(_, file)| Path::new(file).exists())
            .map(|(player, file)| (*player, PathBuf::from(file)))
    }

    fn command(player: &str, file: &Path) -> Command {
        let mut cmd = Command::new(player);
        cmd.arg(file).stdout(Stdio::null()).stderr(Stdio::null());
        cmd
    }
}

impl AudioSink for SoundPlayer {
    fn play(&self, cue: Cue) -> Result<(), ChannelError> {
        let (player, file) = self
            .pick(cue)
            .ok_or_else(|| ChannelError::new("audio", "no sound file found"))?;
        // The timer does not wait for the sound to end.
        spawn_reaped(Self::command(player, &file))
            .map(|_| ())
            .map_err(|e| ChannelError::new("audio", format!("{player}: {e}")))
    }
}

/// Spawn `cmd` and wait for it on a detached thread, so the finished
/// process does not linger as a zombie.
fn spawn_reaped(mut cmd: Command) -> io::Result<thread::JoinHandle<io::Result<ExitStatus>>> {
    let mut child = cmd.spawn()?;
    thread::Builder::new()
        .name("sound-reaper".into())
        .spawn(move || child.wait())
}

/// OS notifications via notify-rust.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl SystemNotifier for DesktopNotifier {
    fn show(&self, notice: &Notice) -> Result<(), ChannelError> {
        Notification::new()
            .summary(&notice.title)
            .body(&notice.body)
            .appname("focusbreak")
            .icon("alarm-clock")
            .show()
            .map(|_| ())
            .map_err(|e| ChannelError::new("system", e.to_string()))
    }
}

/// The terminal window title.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalTitle;

impl AttentionSurface for TerminalTitle {
    fn set_title(&self, title: &str) -> Result<(), ChannelError> {
        execute!(std::io::stdout(), SetTitle(title))
            .map_err(|e| ChannelError::new("attention", e.to_string()))
    }
}

/// What this desktop allows. Notifications can be switched off by the user
/// (config or `--no-notify`), which reads as a denial.
#[derive(Debug, Clone)]
pub struct DesktopCapabilities {
    sound: SoundPlayer,
    notifications: bool,
}

impl DesktopCapabilities {
    pub fn new(sound: SoundPlayer, notifications: bool) -> Self {
        Self {
            sound,
            notifications,
        }
    }
}

impl Capabilities for DesktopCapabilities {
    /// Plays the end cue to completion.
    fn request_audio(&self) -> Result<(), PermissionError> {
        let (player, file) = self
            .sound
            .pick(Cue::End)
            .ok_or_else(|| PermissionError::Audio("no sound file found".into()))?;
        let status = SoundPlayer::command(player, &file)
            .status()
            .map_err(|e| PermissionError::Audio(format!("{player}: {e}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(PermissionError::Audio(format!("{player} exited with {status}")))
        }
    }

    fn notification_permission(&self) -> PermissionState {
        if self.notifications {
            PermissionState::NotRequested
        } else {
            PermissionState::Denied
        }
    }

    fn request_notification_permission(&self) -> Result<PermissionState, PermissionError> {
        check_notification_server()?;
        Ok(PermissionState::Granted)
    }
}

/// A freedesktop notification server has to be running.
#[cfg(all(unix, not(target_os = "macos")))]
fn check_notification_server() -> Result<(), PermissionError> {
    notify_rust::get_server_information()
        .map(|info| tracing::debug!(server = %info.name, "notification server found"))
        .map_err(|e| PermissionError::Notifications(e.to_string()))
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn check_notification_server() -> Result<(), PermissionError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_custom_sound_falls_back() {
        let player = SoundPlayer::new(Some("/definitely/not/here.wav".into()));
        // Falls back to whatever the machine has, possibly nothing.
        if let Some((_, file)) = player.pick(Cue::End) {
            assert_ne!(file, PathBuf::from("/definitely/not/here.wav"));
        }
    }

    #[cfg(unix)]
    #[test]
    fn spawned_player_is_waited_for() {
        let reaper = spawn_reaped(Command::new("true")).unwrap();
        let status = reaper.join().unwrap().unwrap();
        assert!(status.success());

        assert!(spawn_reaped(Command::new("/definitely/not/a/player")).is_err());
    }

    #[test]
    fn disabled_notifications_read_as_denied() {
        let caps = DesktopCapabilities::new(SoundPlayer::default(), false);
        assert_eq!(caps.notification_permission(), PermissionState::Denied);
        let caps = DesktopCapabilities::new(SoundPlayer::default(), true);
        assert_eq!(caps.notification_permission(), PermissionState::NotRequested);
    }
}
