mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use glovetype::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    game::Game,
    logger::SessionLogger,
    runtime::{AppEvent, AppEventSource, ChannelEventSource, FixedTicker, Runner, Ticker},
    serial::{self, FrameSource, PortSettings, ReplaySource},
    words::WordPicker,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};
use tracing_subscriber::EnvFilter;

/// typing challenge driven by a serial keypad glove
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type the word shown on screen with the glove's keypad. Completion time earns a skill tier; every round is appended to a results log and the glove's sensor stream is saved per round."
)]
pub struct Cli {
    /// serial port the glove is attached to
    #[clap(short = 'p', long)]
    port: Option<String>,

    /// baud rate of the glove link
    #[clap(short = 'b', long)]
    baud: Option<u32>,

    /// cumulative results log (csv, appended)
    #[clap(long)]
    results: Option<PathBuf>,

    /// directory for the per round sensor logs
    #[clap(long)]
    telemetry_dir: Option<PathBuf>,

    /// always play this word instead of a random one
    #[clap(short = 'w', long)]
    word: Option<String>,

    /// read frames from a recorded capture instead of the serial port
    #[clap(long)]
    replay: Option<PathBuf>,

    /// pause between replayed frames
    #[clap(long, default_value_t = 250)]
    replay_delay_ms: u64,

    /// list available serial ports and exit
    #[clap(long)]
    list_ports: bool,

    /// diagnostic log file (filter with RUST_LOG)
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// persist the port and log settings of this run
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Overlay command line flags on the stored configuration
    fn apply_to(&self, mut config: Config) -> Config {
        if let Some(ref port) = self.port {
            config.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(ref results) = self.results {
            config.results_path = results.clone();
        }
        if let Some(ref dir) = self.telemetry_dir {
            config.telemetry_dir = dir.clone();
        }
        config
    }

    fn word_picker(&self) -> Result<WordPicker, glovetype::GameError> {
        match self.word {
            Some(ref word) => WordPicker::fixed(word),
            None => Ok(WordPicker::new()),
        }
    }

    /// Open the glove (or the replay) and describe it for the footer
    fn open_source(
        &self,
        config: &Config,
    ) -> Result<(Box<dyn FrameSource>, String), glovetype::GameError> {
        if let Some(ref path) = self.replay {
            let delay = Duration::from_millis(self.replay_delay_ms);
            let source = ReplaySource::open(path, delay)?;
            return Ok((Box::new(source), format!("replay {}", path.display())));
        }

        let settings = PortSettings {
            name: config.port.clone(),
            baud_rate: config.baud_rate,
            read_timeout: Duration::from_millis(config.read_timeout_ms),
        };
        let source = serial::open_port(&settings)?;
        Ok((
            Box::new(source),
            format!("{} @ {}", settings.name, settings.baud_rate),
        ))
    }
}

pub struct App {
    pub game: Game,
    pub input_label: String,
}

impl App {
    pub fn new(game: Game, input_label: String) -> Self {
        Self { game, input_label }
    }

    /// Returns true when the app should quit
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }

        match key.code {
            KeyCode::Esc => true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => true,
            KeyCode::Char('s') | KeyCode::Enter => {
                if let Err(e) = self.game.start() {
                    tracing::error!(error = %e, "could not start a round");
                }
                false
            }
            _ => false,
        }
    }

    /// Returns true when the screen needs a redraw
    pub fn on_event(&mut self, event: AppEvent) -> Option<bool> {
        match event {
            // the timer only needs refreshing while it runs
            AppEvent::Tick => Some(self.game.stopwatch.is_running()),
            AppEvent::Resize => Some(true),
            AppEvent::Game { round, event } => {
                self.game.on_game_event(round, event);
                Some(true)
            }
            AppEvent::Key(key) => {
                if self.on_key(key) {
                    None
                } else {
                    Some(true)
                }
            }
        }
    }
}

fn init_tracing(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.list_ports {
        let ports = serial::list_ports();
        if ports.is_empty() {
            println!("no serial ports found");
        }
        for port in ports {
            println!("{}", port);
        }
        return Ok(());
    }

    let log_path = cli.log_file.clone().unwrap_or_else(AppDirs::log_path);
    init_tracing(&log_path)?;

    let store = FileConfigStore::new();
    let config = cli.apply_to(store.load());
    if cli.save_config {
        store.save(&config)?;
        tracing::info!(path = %store.path().display(), "configuration saved");
    }

    let picker = cli.word_picker()?;

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let (source, input_label) = cli.open_source(&config)?;

    let events = ChannelEventSource::new().with_terminal_input();
    let logger = SessionLogger::new(&config.results_path, &config.telemetry_dir);
    let game = Game::new(source, events.sender(), picker, logger);
    let mut app = App::new(game, input_label);
    let runner = Runner::new(events, FixedTicker::default());

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app, &runner);
    app.game.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend, E: AppEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;

    while let Some(redraw) = app.on_event(runner.step()) {
        if redraw {
            terminal.draw(|f| ui(app, f))?;
        }
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
