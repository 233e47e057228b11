//! flick-back-replay - run a recorded touch trace through the edge back gesture
//!
//! Reads JSON lines (from a file or stdin), one record per line:
//!
//! ```text
//! {"type":"touch","x":2.0,"y":500.0,"timestamp_ms":0,"action":"down"}
//! {"type":"exclusion","strict":[[0,400,100,200]]}
//! {"type":"insets","left":0.0,"right":0.0}
//! {"type":"ime","visible":true,"height":900.0}
//! {"type":"frame","dt_ms":16.0}
//! {"type":"dark","is_dark":true}
//! {"type":"navigation_mode","mode":"three_button"}
//! {"type":"long_swipe","enabled":true}
//! ```
//!
//! and prints every resolution (and optionally every visual state) as a JSON
//! line on stdout.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use calloop::channel::{self, Channel, Event};
use calloop::EventLoop;
use clap::Parser;
use serde::{Deserialize, Serialize};
use smithay::utils::{Logical, Point, Rectangle, Size};
use tracing::{info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flick_edge_back::{
    DisplayId, EdgeConfig, ExclusionMailbox, ExclusionUpdate, GestureObserver, GestureResolution,
    HapticEffect, InputMonitor, InputSession, MonitorChannel, NavigationMode, Region, TouchSample,
    VisualState, WindowManager,
};

#[derive(Parser, Debug)]
#[command(name = "flick-back-replay")]
#[command(about = "Replay a touch trace through the Flick edge back gesture", long_about = None)]
struct Args {
    /// Trace file (JSON lines); stdin when omitted
    trace: Option<PathBuf>,

    /// Edge back config (TOML); the user config or defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Display width in pixels
    #[arg(long, default_value_t = 1080)]
    width: i32,

    /// Display height in pixels
    #[arg(long, default_value_t = 2340)]
    height: i32,

    /// Also print every visual state change
    #[arg(long)]
    visual: bool,

    /// Print the session diagnostics when the trace ends
    #[arg(long)]
    dump: bool,

    /// Enable verbose debug output
    #[arg(short, long)]
    debug: bool,
}

/// One line of a trace
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TraceRecord {
    Touch(TouchSample),
    Exclusion {
        /// `[x, y, width, height]`
        strict: Vec<[i32; 4]>,
        #[serde(default)]
        unrestricted: Option<Vec<[i32; 4]>>,
    },
    Insets {
        left: f64,
        right: f64,
    },
    Ime {
        visible: bool,
        height: f64,
    },
    Frame {
        dt_ms: f64,
    },
    Dark {
        /// The content under the arrow is dark
        is_dark: bool,
    },
    NavigationMode {
        mode: NavigationMode,
    },
    LongSwipe {
        enabled: bool,
    },
}

fn region(rects: &[[i32; 4]]) -> Region {
    Region::from_rects(rects.iter().map(|&[x, y, w, h]| {
        Rectangle::new(Point::<i32, Logical>::from((x, y)), Size::from((w, h)))
    }))
}

/// Output line
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Report<'a> {
    Resolved(&'a GestureResolution),
    Visual(&'a VisualState),
    Haptic { effect: HapticEffect },
}

struct StdoutObserver {
    visual: bool,
    resolved: usize,
}

impl StdoutObserver {
    fn print(&self, report: &Report<'_>) {
        match serde_json::to_string(report) {
            Ok(line) => {
                let mut stdout = io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{}", line) {
                    warn!("Failed to write report: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize report: {}", e),
        }
    }
}

impl GestureObserver for StdoutObserver {
    fn on_resolved(&mut self, resolution: &GestureResolution) {
        self.resolved += 1;
        self.print(&Report::Resolved(resolution));
    }

    fn on_visual_state_changed(&mut self, state: &VisualState) {
        if self.visual {
            self.print(&Report::Visual(state));
        }
    }

    fn on_haptic(&mut self, effect: HapticEffect) {
        if self.visual {
            self.print(&Report::Haptic { effect });
        }
    }
}

/// Monitor channel of the replay: there is nothing below to pilfer from
struct ReplayChannel;

impl MonitorChannel for ReplayChannel {
    fn pilfer_pointers(&mut self) {
        tracing::debug!("Pilfering pointers");
    }

    fn dispose(&mut self) {
        tracing::debug!("Input monitor disposed");
    }
}

struct ReplayMonitor;

impl InputMonitor for ReplayMonitor {
    fn monitor_gesture_input(
        &mut self,
        name: &str,
        display_id: DisplayId,
    ) -> flick_edge_back::Result<Box<dyn MonitorChannel>> {
        info!("Monitoring {} input on display {}", name, display_id);
        Ok(Box::new(ReplayChannel))
    }
}

struct ReplayWindowManager {
    size: Size<i32, Logical>,
}

impl WindowManager for ReplayWindowManager {
    fn display_size(&self, _display_id: DisplayId) -> Size<i32, Logical> {
        self.size
    }

    fn register_exclusion_listener(
        &mut self,
        _display_id: DisplayId,
        _mailbox: ExclusionMailbox,
    ) -> flick_edge_back::Result<()> {
        Ok(())
    }

    fn unregister_exclusion_listener(&mut self, _display_id: DisplayId) -> flick_edge_back::Result<()> {
        Ok(())
    }
}

type ReplaySession = InputSession<ReplayMonitor, ReplayWindowManager, StdoutObserver>;

struct ReplayState {
    session: ReplaySession,
    mailbox: ExclusionMailbox,
    records: usize,
    done: bool,
}

impl ReplayState {
    fn apply(&mut self, record: TraceRecord) {
        self.records += 1;
        match record {
            TraceRecord::Touch(sample) => self.session.on_touch(&sample),
            TraceRecord::Exclusion {
                strict,
                unrestricted,
            } => self.mailbox.publish(ExclusionUpdate {
                display_id: self.session.display_id(),
                strict: region(&strict),
                unrestricted: unrestricted.as_deref().map(region),
            }),
            TraceRecord::Insets { left, right } => self.session.set_insets(left, right),
            TraceRecord::Ime { visible, height } => {
                self.session.on_ime_visibility_changed(visible, height)
            }
            TraceRecord::Frame { dt_ms } => self.session.on_frame(dt_ms),
            TraceRecord::Dark { is_dark } => self.session.on_region_darkness_changed(is_dark),
            TraceRecord::NavigationMode { mode } => self.session.on_navigation_mode_changed(mode),
            TraceRecord::LongSwipe { enabled } => self.session.set_long_swipe_enabled(enabled),
        }
    }
}

/// Parse trace lines on a separate thread and feed them to the event loop
fn spawn_reader(trace: Option<PathBuf>) -> Result<Channel<TraceRecord>> {
    let input: Box<dyn BufRead + Send> = match &trace {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open trace {:?}", path))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let (sender, channel) = channel::channel();

    std::thread::Builder::new()
        .name("trace-reader".into())
        .spawn(move || {
            for (index, line) in input.lines().enumerate() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Failed to read trace: {}", e);
                        break;
                    }
                };
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                match serde_json::from_str::<TraceRecord>(line) {
                    Ok(record) => {
                        if sender.send(record).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Skipping trace line {}: {}", index + 1, e),
                }
            }
        })
        .context("Failed to spawn trace reader")?;

    Ok(channel)
}

fn main() -> Result<()> {
    // Set up panic hook to log panics before crashing
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        if let Ok(home) = std::env::var("HOME") {
            let crash_log = format!("{}/.local/state/flick/replay-crash.log", home);
            if let Ok(mut f) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let _ = writeln!(f, "[{}] PANIC: {}", chrono::Local::now(), panic_info);
            }
        }
    }));

    let log_dir = std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".local/state")))
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("flick");

    std::fs::create_dir_all(&log_dir).ok();

    let args = Args::parse();

    let file_appender = rolling::daily(&log_dir, "edge-back-replay.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Quiet by default, verbose with --debug
    let default_filter = if args.debug {
        "debug,flick_edge_back=trace"
    } else {
        "warn,flick_edge_back=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let config = match &args.config {
        Some(path) => EdgeConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => EdgeConfig::load_or_default(),
    };

    info!(
        width = args.width,
        height = args.height,
        "Replaying edge back gesture trace"
    );

    let mut session = InputSession::new(
        0,
        config,
        ReplayMonitor,
        ReplayWindowManager {
            size: Size::from((args.width, args.height)),
        },
        StdoutObserver {
            visual: args.visual,
            resolved: 0,
        },
    );
    session.on_nav_bar_attached();
    session.on_navigation_mode_changed(NavigationMode::Gestural);
    let mailbox = session.exclusion_mailbox();

    let mut event_loop: EventLoop<ReplayState> =
        EventLoop::try_new().context("Failed to create event loop")?;
    let channel = spawn_reader(args.trace.clone())?;
    event_loop
        .handle()
        .insert_source(channel, |event, _, state: &mut ReplayState| match event {
            Event::Msg(record) => state.apply(record),
            Event::Closed => state.done = true,
        })
        .map_err(|e| anyhow::anyhow!("Failed to insert trace source: {}", e.error))?;

    let mut state = ReplayState {
        session,
        mailbox,
        records: 0,
        done: false,
    };

    while !state.done {
        event_loop
            .dispatch(Some(Duration::from_millis(100)), &mut state)
            .context("Event loop dispatch failed")?;
    }

    // Let the arrow finish its animation
    let mut settle_frames = 0;
    while state.session.is_animating() && settle_frames < 600 {
        state.session.on_frame(16.0);
        settle_frames += 1;
    }

    info!(
        records = state.records,
        resolved = state.session.observer().resolved,
        "Trace finished"
    );

    if args.dump {
        eprintln!("{}", state.session.dump());
    }

    Ok(())
}
