//! Local Player - mpv/VLC playback
//!
//! Hands a resolved stream URL to an external player process. Playback
//! itself is entirely the player's business.

use std::process::Stdio;
use thiserror::Error;
use tokio::process::{Child, Command};

use crate::models::PlayRequest;

/// Supported local players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerType {
    /// mpv media player (default)
    #[default]
    Mpv,
    /// VLC media player
    Vlc,
}

impl PlayerType {
    /// Parse a player name from config or CLI
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mpv" => Some(PlayerType::Mpv),
            "vlc" => Some(PlayerType::Vlc),
            _ => None,
        }
    }

    /// Get the command name for this player
    pub fn command(&self) -> &'static str {
        match self {
            PlayerType::Mpv => "mpv",
            PlayerType::Vlc => {
                // On macOS, VLC is an app bundle
                #[cfg(target_os = "macos")]
                if std::path::Path::new("/Applications/VLC.app").exists() {
                    return "/Applications/VLC.app/Contents/MacOS/VLC";
                }
                "vlc"
            }
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlayerType::Mpv => "mpv",
            PlayerType::Vlc => "VLC",
        }
    }
}

impl std::fmt::Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Errors from local player operations
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),
    #[error("Empty stream URL")]
    EmptyUrl,
}

/// Local player for streaming content
#[derive(Debug, Clone, Copy)]
pub struct LocalPlayer {
    player_type: PlayerType,
}

impl LocalPlayer {
    pub fn new(player_type: PlayerType) -> Self {
        Self { player_type }
    }

    pub fn player_type(&self) -> PlayerType {
        self.player_type
    }

    /// Command-line arguments for `request`
    pub fn args(&self, request: &PlayRequest) -> Vec<String> {
        let mut args = vec![request.url.clone()];

        match self.player_type {
            PlayerType::Mpv => {
                args.push("--force-window=immediate".into());
                if !request.autoplay {
                    args.push("--pause".into());
                }
                if !request.inline {
                    args.push("--fullscreen".into());
                }
                if !request.controls {
                    args.push("--osc=no".into());
                }
                if let Some(title) = &request.title {
                    args.push(format!("--force-media-title={}", title));
                }
            }
            PlayerType::Vlc => {
                args.push("--no-video-title-show".into());
                if !request.autoplay {
                    args.push("--start-paused".into());
                }
                if !request.inline {
                    args.push("--fullscreen".into());
                }
                if !request.controls {
                    args.push("--qt-minimal-view".into());
                }
                if let Some(title) = &request.title {
                    args.push(format!("--meta-title={}", title));
                }
            }
        }
        args
    }

    /// Spawn the player for `request`
    pub fn play(&self, request: &PlayRequest) -> Result<Child, PlayerError> {
        if request.url.trim().is_empty() {
            return Err(PlayerError::EmptyUrl);
        }

        let mut cmd = Command::new(self.player_type.command());
        cmd.args(self.args(request));
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        tracing::info!(player = %self.player_type, url = %request.url, "starting player");

        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlayerError::NotFound(self.player_type.command().to_string())
            } else {
                PlayerError::StartFailed(e)
            }
        })
    }

    /// Play and wait for the player to close
    pub async fn play_and_wait(&self, request: &PlayRequest) -> Result<(), PlayerError> {
        let mut child = self.play(request)?;
        let _ = child.wait().await;
        Ok(())
    }
}
