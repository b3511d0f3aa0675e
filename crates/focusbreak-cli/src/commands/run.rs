use std::io::IsTerminal;
use std::sync::Arc;

use clap::Args;
use focusbreak_core::error::Result;
use focusbreak_core::notify::{AttentionSurface, NullSurface};
use focusbreak_core::{Config, ConfigPatch, Event, FocusTimer, Phase, SessionView};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::desktop::{DesktopCapabilities, DesktopNotifier, SoundPlayer, TerminalTitle};

#[derive(Args)]
pub struct RunArgs {
    /// Work minutes (1-120)
    #[arg(long)]
    work: Option<u32>,
    /// Short break minutes (1-60)
    #[arg(long = "break")]
    break_minutes: Option<u32>,
    /// Long break minutes (1-60)
    #[arg(long)]
    long_break: Option<u32>,
    /// Work sessions before a long break (1-12)
    #[arg(long)]
    sessions: Option<u32>,
    /// Do not try to enable sound
    #[arg(long)]
    no_sound: bool,
    /// Do not ask for system notifications
    #[arg(long)]
    no_notify: bool,
    /// Start the first work session right away
    #[arg(long)]
    autostart: bool,
}

const HELP: &str = "\
commands:
  start            start or resume
  pause            pause the countdown
  resume           resume the countdown
  reset            back to idle
  skip             end the current phase now
  done             confirm the exercise and start the break
  audio            toggle sound
  status           show the timer
  json             show the timer as JSON
  set <field> <n>  change work | break | long-break | sessions
  focus on|off     tell the timer whether you are looking at it
  help             this text
  quit             leave";

pub fn run(args: RunArgs) -> Result<()> {
    let config = Config::load_or_default();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(session(config, args))
}

async fn session(config: Config, args: RunArgs) -> Result<()> {
    let overrides = ConfigPatch {
        work_minutes: args.work,
        break_minutes: args.break_minutes,
        long_break_minutes: args.long_break,
        sessions_before_long_break: args.sessions,
    };
    let timer_config = config.timer.merged(&overrides)?;

    let sound = SoundPlayer::new(config.notifications.sound_file.clone());
    let notifications = config.notifications.enabled && !args.no_notify;
    let surface: Arc<dyn AttentionSurface> = if std::io::stdout().is_terminal() {
        Arc::new(TerminalTitle)
    } else {
        Arc::new(NullSurface)
    };

    let timer = FocusTimer::builder()
        .with_config(timer_config)
        .with_capabilities(Arc::new(DesktopCapabilities::new(sound.clone(), notifications)))
        .with_audio(Box::new(sound))
        .with_notifier(Box::new(DesktopNotifier))
        .with_attention(surface, config.blink_settings())
        .with_focused(false)
        .with_poll_interval(config.poll_interval())
        .build()?;

    let printer = spawn_printer(&timer);
    tracing::info!(config = ?timer_config, "session opened");
    print_status(&timer.snapshot());

    if config.notifications.sound && !args.no_sound {
        if let Err(e) = timer.toggle_audio().await {
            eprintln!("sound disabled: {e}");
        }
    }
    if args.autostart {
        timer.start().await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let rest: Vec<&str> = words.collect();
        match command {
            "start" | "s" => report(timer.start().await),
            "pause" | "p" => report(timer.pause()),
            "resume" | "r" => report(timer.resume()),
            "reset" => report(timer.reset()),
            "skip" => report(timer.skip()),
            "done" | "d" => report(timer.acknowledge_exercise()),
            "audio" => match timer.toggle_audio().await {
                Ok(true) => println!("sound on"),
                Ok(false) => println!("sound off"),
                Err(e) => eprintln!("error: {e}"),
            },
            "status" => print_status(&timer.snapshot()),
            "json" => println!("{}", serde_json::to_string_pretty(&timer.snapshot())?),
            "set" => match parse_patch(&rest) {
                Ok(patch) => match timer.update_config(&patch) {
                    Ok(_) => print_status(&timer.snapshot()),
                    Err(e) => eprintln!("error: {e}"),
                },
                Err(message) => eprintln!("error: {message}"),
            },
            "focus" => match rest.as_slice() {
                ["on"] => timer.set_focused(true),
                ["off"] => timer.set_focused(false),
                _ => eprintln!("error: usage: focus on|off"),
            },
            "help" | "?" => println!("{HELP}"),
            "quit" | "q" | "exit" => break,
            other => eprintln!("unknown command: {other} (try help)"),
        }
    }

    printer.abort();
    Ok(())
}

fn parse_patch(args: &[&str]) -> Result<ConfigPatch, String> {
    let [field, value] = args else {
        return Err("usage: set <field> <value>".into());
    };
    let value: u32 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a whole number"))?;
    let mut patch = ConfigPatch::default();
    match *field {
        "work" | "work_minutes" => patch.work_minutes = Some(value),
        "break" | "break_minutes" => patch.break_minutes = Some(value),
        "long-break" | "long_break_minutes" => patch.long_break_minutes = Some(value),
        "sessions" | "sessions_before_long_break" => {
            patch.sessions_before_long_break = Some(value)
        }
        other => return Err(format!("unknown field: {other}")),
    }
    Ok(patch)
}

fn report(events: Vec<Event>) {
    if events.is_empty() {
        println!("nothing to do");
    }
}

fn print_status(view: &SessionView) {
    let timer = &view.timer;
    let state = if timer.awaiting_exercise {
        "waiting for exercise"
    } else if timer.is_paused {
        "paused"
    } else if timer.is_running {
        "running"
    } else {
        "stopped"
    };
    println!(
        "{} {} ({state}) session {} | {} done | sound {} | notifications {}",
        timer.phase.display_name(),
        timer.formatted_time,
        timer.current_session,
        timer.completed_work_sessions,
        on_off(view.audio_enabled),
        on_off(view.notifications_enabled),
    );
    if let Some(exercise) = &view.pending_exercise {
        print_exercise(&exercise.name, &exercise.instructions);
    }
}

fn print_exercise(name: &str, instructions: &str) {
    println!("exercise: {name}");
    println!("  {instructions}");
    println!("  type 'done' when finished");
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Prints banners and the events banners do not cover.
fn spawn_printer(timer: &FocusTimer) -> JoinHandle<()> {
    let mut events = timer.subscribe();
    let mut banners = timer.banners();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                banner = banners.recv() => match banner {
                    Ok(banner) => println!("* {}: {}", banner.title, banner.body),
                    Err(RecvError::Lagged(n)) => tracing::warn!("{n} banners dropped"),
                    Err(RecvError::Closed) => break,
                },
                event = events.recv() => match event {
                    Ok(event) => print_event(&event),
                    Err(RecvError::Lagged(n)) => tracing::warn!("{n} events dropped"),
                    Err(RecvError::Closed) => break,
                },
            }
        }
    })
}

fn print_event(event: &Event) {
    match event {
        Event::ExerciseAssigned { exercise, .. } => {
            print_exercise(&exercise.name, &exercise.instructions);
        }
        Event::TimerPaused {
            phase,
            remaining_secs,
            ..
        } => println!(
            "paused {} with {} left",
            phase.display_name(),
            focusbreak_core::timer::format_mmss(*remaining_secs)
        ),
        Event::TimerResumed { phase, .. } => println!("resumed {}", phase.display_name()),
        Event::TimerReset { .. } => println!("reset: {}", Phase::Idle.display_name()),
        Event::ConfigUpdated { config, .. } => println!(
            "config: work {}m, break {}m, long break {}m every {} sessions",
            config.work_minutes,
            config.break_minutes,
            config.long_break_minutes,
            config.sessions_before_long_break
        ),
        // Phase events arrive as banners; permission changes are answered
        // where they are requested.
        _ => {}
    }
}
