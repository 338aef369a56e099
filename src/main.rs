//! AlchemyWatch - search shows, pick an episode, watch it
//!
//! # Usage
//!
//! ```bash
//! # Launch interactive TUI
//! alchemywatch
//!
//! # CLI mode (for automation)
//! alchemywatch search "crash landing"
//! alchemywatch episodes /show/1 --json
//! alchemywatch play /episode/1-1
//! ```

mod commands;

use std::io::{stdout, Stdout};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use alchemywatch::app::App;
use alchemywatch::catalog::Catalog;
use alchemywatch::cli::{self, Cli, Command, ExitCode, Output};
use alchemywatch::config::Config;
use alchemywatch::debounce::Debouncer;
use alchemywatch::player::LocalPlayer;
use alchemywatch::query::QueryClient;

/// Terminal type alias for convenience
type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    init_logging(cli.is_cli_mode());

    let client = commands::query_client(&config, cli.api_url.as_deref());

    if cli.is_cli_mode() {
        let exit_code = run_cli(cli, &config, &client).await;
        std::process::exit(exit_code.into());
    } else {
        run_tui(&config, client).await
    }
}

/// Logs go to stderr in CLI mode and to a file in TUI mode
fn init_logging(cli_mode: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("alchemywatch=info"));

    if cli_mode {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return;
    }

    match open_log_file() {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::sink)
            .init(),
    }
}

fn open_log_file() -> Result<std::fs::File> {
    let dir = dirs::cache_dir()
        .context("no cache directory")?
        .join("alchemywatch");
    std::fs::create_dir_all(&dir)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("alchemywatch.log"))?;
    Ok(file)
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli, config: &Config, client: &QueryClient) -> ExitCode {
    let output = Output::new(&cli);

    match cli.command {
        Some(Command::Search(cmd)) => commands::search_cmd(cmd, client, &output).await,

        Some(Command::Episodes(cmd)) => {
            if let Err(e) = cli::validate_path(&cmd.path) {
                return output.error(e, ExitCode::InvalidArgs);
            }
            commands::episodes_cmd(cmd, client, &output).await
        }

        Some(Command::Servers(cmd)) => {
            if let Err(e) = cli::validate_path(&cmd.path) {
                return output.error(e, ExitCode::InvalidArgs);
            }
            commands::servers_cmd(cmd, client, &output).await
        }

        Some(Command::Play(cmd)) => {
            if let Err(e) = cli::validate_path(&cmd.path) {
                return output.error(e, ExitCode::InvalidArgs);
            }
            commands::play_cmd(cmd, config, client, &output).await
        }

        None => ExitCode::Success,
    }
}

// =============================================================================
// TUI Mode
// =============================================================================

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run interactive TUI
async fn run_tui(config: &Config, client: QueryClient) -> Result<()> {
    let mut terminal = init_terminal()?;

    let mut app = App::new(
        Catalog::new(client),
        Debouncer::new("", config.debounce_delay()),
        config.autoplay(),
    );
    let player = LocalPlayer::new(config.player_type());
    tracing::info!(player = %player.player_type(), "tui started");

    let result = run_event_loop(&mut terminal, &mut app, player).await;

    // Always restore terminal, even on error
    restore_terminal(&mut terminal)?;

    result
}

/// Main event loop - input, settled queries, rendering
async fn run_event_loop(terminal: &mut Tui, app: &mut App, player: LocalPlayer) -> Result<()> {
    const TICK_RATE: Duration = Duration::from_millis(50);

    while app.running {
        terminal.draw(|frame| alchemywatch::ui::render(frame, app))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (ignore releases on Windows)
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        app.tick();

        if let Some(request) = app.take_play_request() {
            match player.play(&request) {
                Ok(mut child) => {
                    tokio::spawn(async move {
                        let _ = child.wait().await;
                    });
                }
                Err(e) => tracing::warn!(error = %e, "could not start player"),
            }
        }

        // Let spawned query tasks make progress between frames
        tokio::task::yield_now().await;
    }

    Ok(())
}
