mod ui;

use chrono::{DateTime, Local};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use puffcoach::{
    app_dirs::AppDirs,
    clock::{Clock, MonotonicClock},
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    runtime::{CrosstermEventSource, FixedTicker, FrameTimer, Runner, TrainerEvent},
    session::{FrameInput, InputEvent, SceneLayout, Snapshot, TrainerSession, Trackable},
    sim::{CameraRig, HandShaker},
    spatial::Vec3,
    steps::TRAINING_STEPS,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fmt::Write as _,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};
use tracing::info;

const DEFAULT_TICK_MS: u64 = 16;
const PAN_STEP_RADIANS: f32 = 0.06;
const SHAKE_BURST_SECS: f32 = 0.8;
const CAMERA_EYE: Vec3 = Vec3::new(0.0, 1.3, 1.2);

/// guided metered-dose inhaler training in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Walks through the metered-dose inhaler procedure step by step: shake, uncap, inhale, hold, repeat, recap. Objects are picked up with the keyboard and shaken with a simulated hand."
)]
pub struct Cli {
    /// path to a JSON config file (defaults to the platform config dir)
    #[clap(long)]
    config: Option<PathBuf>,

    /// write logs to this file instead of the platform state dir
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// print the training steps and exit
    #[clap(long)]
    list_steps: bool,

    /// save the effective configuration to the config path and exit
    #[clap(long)]
    write_config: bool,

    /// simulation tick interval in milliseconds
    #[clap(long, default_value_t = DEFAULT_TICK_MS, value_parser = clap::value_parser!(u64).range(1..=1000))]
    tick_ms: u64,
}

impl Cli {
    fn config_store(&self) -> FileConfigStore {
        self.config
            .as_ref()
            .map(FileConfigStore::with_path)
            .unwrap_or_default()
    }
}

pub struct App<C: Clock + Clone> {
    pub session: TrainerSession<C>,
    pub rig: CameraRig,
    pub hand: HandShaker,
    pub snapshot: Snapshot,
    pub hovered: Option<Trackable>,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    timer: FrameTimer<C>,
    pending: Vec<InputEvent>,
}

impl<C: Clock + Clone> App<C> {
    pub fn new(config: &Config, clock: C) -> Self {
        let layout = SceneLayout::default();
        let session = TrainerSession::new(config, layout, clock.clone());
        let snapshot = session.snapshot();

        Self {
            session,
            rig: CameraRig::aimed_at(CAMERA_EYE, layout.inhaler.position),
            hand: HandShaker::default(),
            snapshot,
            hovered: None,
            started_at: Local::now(),
            finished_at: None,
            timer: FrameTimer::new(clock),
            pending: Vec::new(),
        }
    }

    /// Handles one key press. Returns false when the app should quit.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => return false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
            KeyCode::Char('i') => self.pending.push(InputEvent::primary(Trackable::Inhaler)),
            KeyCode::Char('c') => self.pending.push(InputEvent::primary(Trackable::Clipboard)),
            KeyCode::Enter => {
                if let Some(target) = self.session.hovered() {
                    self.pending.push(InputEvent::primary(target));
                }
            }
            KeyCode::Backspace | KeyCode::Char('x') => {
                self.pending.push(InputEvent::secondary(Trackable::Inhaler));
                self.pending.push(InputEvent::secondary(Trackable::Clipboard));
            }
            KeyCode::Char('d') => self.pending.push(InputEvent::double(Trackable::Inhaler)),
            KeyCode::Char('s') => self.hand.burst(SHAKE_BURST_SECS),
            KeyCode::Left => self.rig.pan(PAN_STEP_RADIANS, 0.0),
            KeyCode::Right => self.rig.pan(-PAN_STEP_RADIANS, 0.0),
            KeyCode::Char('r') => {
                self.pending.push(InputEvent::ResetTraining);
                self.hand.stop();
                self.started_at = Local::now();
                self.finished_at = None;
            }
            _ => {}
        }
        true
    }

    /// Advances the simulation by one frame
    pub fn on_tick(&mut self) {
        let dt = self.timer.delta();
        let input = FrameInput {
            dt,
            camera: self.rig.camera(),
            hand_offset: self.hand.offset(dt),
            events: std::mem::take(&mut self.pending),
        };
        self.snapshot = self.session.tick(&input);
        self.hovered = self.session.hovered();

        if self.snapshot.training.is_training_complete && self.finished_at.is_none() {
            let now = Local::now();
            self.finished_at = Some(now);
            info!(secs = (now - self.started_at).num_seconds(), "walkthrough finished");
        }
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Local::now) - self.started_at
    }
}

fn step_table() -> String {
    let mut out = String::new();
    for step in TRAINING_STEPS.iter() {
        let _ = writeln!(
            out,
            "{:>2}  {:<12} {}{}",
            step.id,
            step.action.to_string(),
            step.text,
            if step.optional { " (optional)" } else { "" }
        );
    }
    out
}

fn init_logging(cli: &Cli) {
    let Some(path) = cli.log_file.clone().or_else(AppDirs::log_path) else {
        return;
    };
    if let Err(err) = logging::init_file_logging(&path) {
        eprintln!("puffcoach: logging disabled: {err}");
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.list_steps {
        print!("{}", step_table());
        return Ok(());
    }

    init_logging(&cli);
    let store = cli.config_store();
    let config = store.load();

    if cli.write_config {
        store.save(&config)?;
        println!("wrote {}", store.path().display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&config, MonotonicClock::new());
    info!(config = %store.path().display(), "walkthrough started");
    let result = start_tui(&mut terminal, &mut app, Duration::from_millis(cli.tick_ms));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, C: Clock + Clone>(
    terminal: &mut Terminal<B>,
    app: &mut App<C>,
    tick: Duration,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::new(tick));

    terminal.draw(|f| ui::draw(app, f))?;
    loop {
        match runner.step() {
            TrainerEvent::Tick => app.on_tick(),
            TrainerEvent::Resize => {}
            TrainerEvent::Key(key) => {
                if !app.on_key(key) {
                    break;
                }
            }
        }
        terminal.draw(|f| ui::draw(app, f))?;
    }

    Ok(())
}
