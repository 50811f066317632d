mod config;
mod game;
mod input;
mod ui;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    cursor, execute,
    terminal::{self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info, LevelFilter};
use simplelog::WriteLogger;
use std::backtrace::Backtrace;
use std::fs::File;
use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tui::{backend::CrosstermBackend, Terminal};

use config::Config;
use game::{Bounds, Game, ScoreTimer, Scoreboard};
use input::{InputSource, KeyboardInput, ThreadedInput};
use ui::{Canvas, TerminalBell, TerminalSurface};

/// Serpent - snake for the terminal
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Cli {
    /// Config file to use instead of the one in the user config directory
    #[clap(long)]
    config: Option<PathBuf>,

    /// Board width in cells
    #[clap(long)]
    width: Option<u16>,

    /// Board height in cells
    #[clap(long)]
    height: Option<u16>,

    /// Read keys on a dedicated thread
    #[clap(long)]
    threaded_input: bool,

    /// Where to write the log
    #[clap(long, default_value = "serpent.log")]
    log_file: PathBuf,

    /// Log debug details
    #[clap(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(width) = cli.width {
        config.board.width = width;
    }
    if let Some(height) = cli.height {
        config.board.height = height;
    }
    if cli.threaded_input {
        config.input.threaded_reader = true;
    }

    config.validate()?;
    Ok(config)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)
        .context("Failed to leave alternate screen")?;
    Ok(())
}

// Puts the terminal back and stops the game before reporting the panic
fn install_panic_hook(running: Arc<AtomicBool>) {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        running.store(false, Ordering::Relaxed);
        let _ = restore_terminal();

        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        let thread = std::thread::current();

        error!(
            "Panic in thread '{}' at {}: {}\n{}",
            thread.name().unwrap_or("unnamed"),
            location,
            message,
            Backtrace::force_capture()
        );
        default_hook(info);
    }));
}

fn run_game<I: InputSource>(
    config: &Config,
    canvas: Arc<Canvas>,
    scoreboard: Arc<Scoreboard>,
    input: I,
    running: Arc<AtomicBool>,
) {
    let bell = TerminalBell::new(Arc::clone(&canvas));
    let mut game = Game::new(
        config,
        canvas,
        scoreboard,
        input,
        Box::new(bell),
        running,
        rand::thread_rng(),
    );
    game.run();
}

fn run(config: &Config, running: Arc<AtomicBool>) -> Result<()> {
    let bounds = Bounds::new(config.board.width, config.board.height);
    let (columns, rows) = terminal::size().context("Failed to read terminal size")?;
    // One cell of frame on every side, the score sits in the top one
    let (needed_columns, needed_rows) = (bounds.width.saturating_add(2), bounds.height.saturating_add(2));
    if columns < needed_columns || rows < needed_rows {
        bail!(
            "Terminal is {}x{}, a {}x{} board needs at least {}x{}",
            columns,
            rows,
            bounds.width,
            bounds.height,
            needed_columns,
            needed_rows
        );
    }

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to build terminal backend")?;
    terminal.hide_cursor().context("Failed to hide cursor")?;

    let canvas = Arc::new(Canvas::new(TerminalSurface::new(
        terminal,
        bounds,
        config.glyphs.clone(),
    )));
    let scoreboard = Arc::new(Scoreboard::new());

    let timer = ScoreTimer::spawn(
        Duration::from_secs(config.rules.score_interval_secs),
        bounds.width,
        config.rules.survival_bonus,
        Arc::clone(&canvas),
        Arc::clone(&scoreboard),
    )?;

    if config.input.threaded_reader {
        let input = ThreadedInput::spawn(config.key_bindings.clone(), Arc::clone(&running))?;
        run_game(config, canvas, scoreboard, input, running);
    } else {
        let input = KeyboardInput::new(config.key_bindings.clone());
        run_game(config, canvas, scoreboard, input, running);
    }

    drop(timer);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let log_file = File::create(&cli.log_file)
        .with_context(|| format!("Failed to create log file: {:?}", cli.log_file))?;
    WriteLogger::init(level, simplelog::Config::default(), log_file)
        .context("Failed to initialize logger")?;

    info!("Starting serpent");

    let config = load_config(&cli)?;
    let running = Arc::new(AtomicBool::new(true));
    install_panic_hook(Arc::clone(&running));

    let res = run(&config, running);

    // Restore terminal
    if let Err(err) = restore_terminal() {
        error!("{:?}", err);
    }

    if let Err(err) = res {
        // {:?} carries the whole context chain
        error!("Fatal: {:?}", err);
        return Err(err);
    }

    info!("Exiting");
    Ok(())
}
