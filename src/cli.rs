//! CLI - Command Line Interface for AlchemyWatch
//!
//! Every step of the search → episodes → servers chain is scriptable.
//! All output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! alchemywatch search "crash landing" --json
//! alchemywatch episodes /show/1
//! alchemywatch servers /episode/1-1
//! alchemywatch play /episode/1-1 --player vlc
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::player::PlayerType;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error (after retries)
    NetworkError = 3,
    /// No streams available
    NoStreams = 5,
    /// Player could not be started
    PlayerFailed = 6,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// AlchemyWatch - search shows, pick an episode, watch it
///
/// Run without arguments to launch the interactive TUI.
/// Use subcommands for scripting.
#[derive(Parser, Debug)]
#[command(
    name = "alchemywatch",
    version,
    about = "Search shows, pick an episode, watch it",
    after_help = "EXAMPLES:\n\
                  alchemywatch                        Launch interactive TUI\n\
                  alchemywatch search \"crash\"         Search for shows\n\
                  alchemywatch episodes /show/1       List episodes of a show\n\
                  alchemywatch play /episode/1-1      Resolve and play an episode"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL (overrides config and ALCHEMY_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Subcommand to run (omit for TUI mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Check if running in CLI mode (has subcommand)
    pub fn is_cli_mode(&self) -> bool {
        self.command.is_some()
    }

    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search shows by title
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// List episodes of a show
    #[command(visible_alias = "ep")]
    Episodes(PathCmd),

    /// Resolve stream URLs for an episode
    #[command(visible_alias = "sv")]
    Servers(PathCmd),

    /// Resolve an episode and open it in a local player
    #[command(visible_alias = "pl")]
    Play(PlayCmd),
}

/// Search shows by free text
#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Search text
    #[arg(required = true)]
    pub text: String,

    /// Maximum number of results
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

/// Any command keyed by a catalog path
#[derive(Args, Debug)]
pub struct PathCmd {
    /// Catalog path (from a previous search or episodes listing)
    #[arg(required = true)]
    pub path: String,
}

/// Resolve and play an episode
#[derive(Args, Debug)]
pub struct PlayCmd {
    /// Episode path
    #[arg(required = true)]
    pub path: String,

    /// Title shown by the player
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Player to use (defaults to config, then mpv)
    #[arg(long, short = 'p', value_enum)]
    pub player: Option<PlayerChoice>,

    /// Open paused
    #[arg(long)]
    pub paused: bool,

    /// Open fullscreen
    #[arg(long)]
    pub fullscreen: bool,

    /// Hide player controls
    #[arg(long)]
    pub no_controls: bool,

    /// Index into the resolved server list
    #[arg(long, default_value = "0")]
    pub server: usize,
}

/// Player choice on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerChoice {
    Mpv,
    Vlc,
}

impl From<PlayerChoice> for PlayerType {
    fn from(choice: PlayerChoice) -> Self {
        match choice {
            PlayerChoice::Mpv => PlayerType::Mpv,
            PlayerChoice::Vlc => PlayerType::Vlc,
        }
    }
}

/// Validate a catalog path (non-empty, absolute)
pub fn validate_path(path: &str) -> Result<&str, &'static str> {
    if path.starts_with('/') && path.len() > 1 && !path.chars().any(char::is_whitespace) {
        Ok(path)
    } else {
        Err("Invalid catalog path (expected something like /show/1)")
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// JSON envelope for scripted output
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }
}

impl JsonOutput<()> {
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> Self {
        Self {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&JsonOutput::success(data))?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            if let Ok(json) = serde_json::to_string_pretty(&JsonOutput::error_msg(&msg, code)) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet and JSON mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
