//! API clients for external services
//!
//! - Fetcher: show search, episode listing and stream server resolution

pub mod fetcher;

pub use fetcher::{ApiError, CatalogApi, FetcherClient};
