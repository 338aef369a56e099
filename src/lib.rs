//! AlchemyWatch - search shows, pick an episode, watch it
//!
//! A terminal client over a catalog backend with three dependent calls:
//! search, list episodes, resolve stream servers.
//!
//! # Modules
//!
//! - `models` - Shows, episodes, server info, player requests
//! - `api` - Fetcher backend client
//! - `query` - Retrying query client and per-query status
//! - `debounce` - Search input debouncing
//! - `catalog` - Selection state machine driving the three queries
//! - `player` - External player launcher
//! - `config` - Config file and fallback chains
//! - `cli` - Command line surface
//! - `app` / `ui` - TUI state and rendering

pub mod api;
pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod debounce;
pub mod models;
pub mod player;
pub mod query;
pub mod ui;

// Re-export commonly used types
pub use models::{Episode, PlayRequest, ServerInfo, Show, Video};

pub use api::{ApiError, CatalogApi, FetcherClient};
pub use app::App;
pub use catalog::{Catalog, Phase, Settled};
pub use debounce::Debouncer;
pub use query::{QueryClient, QueryError, QueryKind, QueryStatus, RetryPolicy};
