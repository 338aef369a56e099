//! Data structures and types for AlchemyWatch
//!
//! Shared models organized by domain:
//! - **Catalog**: shows and episodes returned by the remote fetcher
//! - **Streams**: resolved server info for a chosen episode
//! - **Player**: what gets handed to the external video player

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// =============================================================================
// Catalog Models
// =============================================================================

/// A catalog entry: a show from a search, or an episode of a show.
///
/// Only `title` and `path` carry meaning on this side. Anything else the
/// remote sends is kept in `extra` and serialized back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub title: String,
    pub path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Video {
    pub fn new(title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            extra: Map::new(),
        }
    }
}

impl fmt::Display for Video {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// One result of a search
pub type Show = Video;

/// A video reference one level below a show
pub type Episode = Video;

// =============================================================================
// Stream Models
// =============================================================================

/// Resolved playable endpoints for one episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Title inherited from the episode
    pub title: String,
    pub urls: Vec<String>,
}

impl ServerInfo {
    /// First URL, the one handed to the player
    pub fn primary_url(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }
}

impl fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} servers)", self.title, self.urls.len())
    }
}

// =============================================================================
// Player Models
// =============================================================================

/// Request for the external video player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRequest {
    pub url: String,
    /// Start playing immediately
    pub autoplay: bool,
    /// Play in the current window instead of going fullscreen
    pub inline: bool,
    /// Show on-screen controls
    pub controls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl PlayRequest {
    /// Build a request for the primary URL of `info`.
    ///
    /// Returns `None` when the server list is empty.
    pub fn from_server_info(info: &ServerInfo, autoplay: bool) -> Option<Self> {
        info.primary_url().map(|url| Self {
            url: url.to_string(),
            autoplay,
            inline: true,
            controls: true,
            title: Some(info.title.clone()),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
