pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use floorrush::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    game::{ClickOutcome, GameController, GameSettings, Phase, RestartPolicy},
    logging,
    report::{HttpReporter, NullReporter, Reporter},
    runtime::{CrosstermEventSource, GameEvent, Runner},
};
use log::{debug, info};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

const TICK_RATE_MS: u64 = 50;
const REPORT_FLUSH_TIMEOUT: Duration = Duration::from_secs(3);
const GRID_COLUMNS: usize = 2;

/// elevator reaction-time game: find the floor, hit the button
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "An elevator reaction-time game. You are shown a target floor; once you confirm, find and press its button as fast as you can across four button layouts."
)]
pub struct Cli {
    /// after a restart, pick a new target at once (auto) or wait on the Start button (manual)
    #[clap(short = 'r', long, value_enum)]
    restart_policy: Option<RestartPolicy>,

    /// pause in milliseconds between a hit and the next pattern
    #[clap(short = 'd', long)]
    delay_ms: Option<u64>,

    /// endpoint that receives the times of a finished session
    #[clap(long)]
    report_url: Option<String>,

    /// never send session times anywhere
    #[clap(long)]
    no_report: bool,

    /// seed for target floor selection
    #[clap(long)]
    seed: Option<u64>,

    /// log file (default: ~/.local/state/floorrush/floorrush.log)
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// write the effective settings to the config file
    #[clap(long)]
    save_config: bool,
}

/// Effective settings: CLI flags layered over the config file
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub restart_policy: RestartPolicy,
    pub report_enabled: bool,
    pub report_url: String,
    pub advance_delay_ms: u64,
    pub seed: Option<u64>,
}

impl Settings {
    fn resolve(cli: &Cli, config: &Config) -> Self {
        Self {
            restart_policy: cli.restart_policy.unwrap_or(config.restart_policy),
            report_enabled: config.report_enabled && !cli.no_report,
            report_url: cli
                .report_url
                .clone()
                .unwrap_or_else(|| config.report_url.clone()),
            advance_delay_ms: cli.delay_ms.unwrap_or(config.advance_delay_ms),
            seed: cli.seed,
        }
    }

    fn game_settings(&self) -> GameSettings {
        GameSettings {
            restart_policy: self.restart_policy,
            advance_delay: Duration::from_millis(self.advance_delay_ms),
        }
    }

    fn reporter(&self) -> Box<dyn Reporter> {
        if self.report_enabled {
            Box::new(HttpReporter::new(self.report_url.clone()))
        } else {
            Box::new(NullReporter)
        }
    }
}

impl From<&Settings> for Config {
    fn from(s: &Settings) -> Self {
        Self {
            restart_policy: s.restart_policy,
            report_enabled: s.report_enabled,
            report_url: s.report_url.clone(),
            advance_delay_ms: s.advance_delay_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

pub struct App {
    pub game: GameController,
    /// Index into the current layout of the keyboard-selected button
    pub selected: usize,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let mut game =
            GameController::new(settings.game_settings()).with_reporter(settings.reporter());
        if let Some(seed) = settings.seed {
            game = game.with_seed(seed);
        }

        Self { game, selected: 0 }
    }

    /// The one button shown outside of the floor grid
    fn primary_action(&mut self) {
        let result = match self.game.phase() {
            Phase::Idle => self.game.request_round(),
            Phase::AwaitingConfirm => self.game.confirm_round().map(|_| self.selected = 0),
            Phase::Finished => self.game.restart(),
            Phase::Active => Ok(()),
        };
        if let Err(e) = result {
            debug!("ignored input: {e}");
        }
    }

    fn click_floor(&mut self, floor: u8) {
        match self.game.click_floor(floor) {
            Ok(ClickOutcome::Hit { elapsed }) => debug!("hit floor {floor} after {elapsed:.3}s"),
            Ok(ClickOutcome::Miss) => debug!("missed with floor {floor}"),
            Err(e) => debug!("ignored click on floor {floor}: {e}"),
        }
    }

    fn move_selection(&mut self, code: KeyCode) {
        let count = self
            .game
            .current_layout()
            .map(|layout| layout.floors().len())
            .unwrap_or(0);
        if count == 0 {
            return;
        }

        let (row, col) = (self.selected / GRID_COLUMNS, self.selected % GRID_COLUMNS);
        let rows = count / GRID_COLUMNS;
        let (row, col) = match code {
            KeyCode::Up => (row.saturating_sub(1), col),
            KeyCode::Down => ((row + 1).min(rows - 1), col),
            KeyCode::Left => (row, 0),
            KeyCode::Right => (row, GRID_COLUMNS - 1),
            _ => (row, col),
        };
        self.selected = row * GRID_COLUMNS + col;
    }

    pub fn on_key(&mut self, key: KeyEvent) -> AppAction {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return AppAction::Quit;
        }

        match (self.game.phase(), key.code) {
            (Phase::Active, KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right) => {
                self.move_selection(key.code)
            }
            (Phase::Active, KeyCode::Enter | KeyCode::Char(' ')) => {
                let floor = self
                    .game
                    .current_layout()
                    .and_then(|layout| layout.floors().get(self.selected).copied());
                if let Some(floor) = floor {
                    self.click_floor(floor);
                }
            }
            (Phase::Idle, KeyCode::Char('s'))
            | (Phase::Finished, KeyCode::Char('r'))
            | (_, KeyCode::Enter | KeyCode::Char(' ')) => self.primary_action(),
            _ => {}
        }
        AppAction::Continue
    }

    /// Returns true when the click landed on something
    pub fn on_mouse(&mut self, mouse: MouseEvent, area: Rect) -> bool {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return false;
        }

        let view = self.game.view();
        if view.phase == Phase::Active {
            match ui::floor_at(area, &view, mouse.column, mouse.row) {
                Some(floor) => {
                    self.click_floor(floor);
                    true
                }
                None => false,
            }
        } else if ui::action_at(area, view.phase, mouse.column, mouse.row) {
            self.primary_action();
            true
        } else {
            false
        }
    }

    /// Returns true when a deferred transition fired
    pub fn on_tick(&mut self) -> bool {
        self.game.poll()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(path) = cli.log_file.clone().or_else(AppDirs::log_path) {
        if let Err(e) = logging::init(&path) {
            eprintln!("floorrush: logging disabled: {e}");
        }
    }

    let store = FileConfigStore::new();
    let settings = Settings::resolve(&cli, &store.load());
    if cli.save_config {
        store.save(&Config::from(&settings))?;
        info!("saved settings to {}", store.path().display());
    }
    info!("starting with {settings:?}");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(settings);
    let result = start_tui(&mut terminal, &mut app);
    app.game.flush_reports(REPORT_FLUSH_TIMEOUT);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );

    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            GameEvent::Tick => {
                if app.on_tick() {
                    terminal.draw(|f| ui(app, f))?;
                }
            }
            GameEvent::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            GameEvent::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.on_key(key) == AppAction::Quit {
                    break;
                }
                terminal.draw(|f| ui(app, f))?;
            }
            GameEvent::Mouse(mouse) => {
                let size = terminal.size()?;
                let area = Rect::new(0, 0, size.width, size.height);
                if app.on_mouse(mouse, area) {
                    terminal.draw(|f| ui(app, f))?;
                }
            }
        }
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
