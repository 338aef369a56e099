//! CLI Command Handlers
//!
//! Each handler runs one query through the retrying query client and
//! reports through `Output`, returning an `ExitCode`.

use std::sync::Arc;

use alchemywatch::api::FetcherClient;
use alchemywatch::cli::{ExitCode, Output, PathCmd, PlayCmd, SearchCmd};
use alchemywatch::config::Config;
use alchemywatch::models::{PlayRequest, ServerInfo};
use alchemywatch::player::LocalPlayer;
use alchemywatch::query::QueryClient;

/// Build the query client from config, with an optional URL override
pub fn query_client(config: &Config, api_url: Option<&str>) -> QueryClient {
    let url = api_url
        .map(str::to_string)
        .unwrap_or_else(|| config.api_url());
    tracing::debug!(%url, "using fetcher backend");
    QueryClient::new(
        Arc::new(FetcherClient::with_base_url(url)),
        config.retry_policy(),
    )
}

// =============================================================================
// Search Command
// =============================================================================

pub async fn search_cmd(cmd: SearchCmd, client: &QueryClient, output: &Output) -> ExitCode {
    if cmd.text.trim().is_empty() {
        return output.error("Search text must not be empty", ExitCode::InvalidArgs);
    }

    output.info(format!("Searching for: {}", cmd.text));

    match client.search(&cmd.text).await {
        Ok(mut shows) => {
            if let Some(limit) = cmd.limit {
                shows.truncate(limit);
            }
            if shows.is_empty() {
                output.info("No shows found.");
            }
            if let Err(e) = output.print(&shows) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Search failed: {}", e), ExitCode::NetworkError),
    }
}

// =============================================================================
// Episodes Command
// =============================================================================

pub async fn episodes_cmd(cmd: PathCmd, client: &QueryClient, output: &Output) -> ExitCode {
    output.info(format!("Listing episodes for: {}", cmd.path));

    match client.episodes(&cmd.path).await {
        Ok(episodes) => {
            if episodes.is_empty() {
                output.info("No episodes are available.");
            }
            if let Err(e) = output.print(&episodes) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Episode listing failed: {}", e), ExitCode::NetworkError),
    }
}

// =============================================================================
// Servers Command
// =============================================================================

pub async fn servers_cmd(cmd: PathCmd, client: &QueryClient, output: &Output) -> ExitCode {
    output.info(format!("Resolving servers for: {}", cmd.path));

    match client.servers(&cmd.path).await {
        Ok(urls) if urls.is_empty() => output.error("No streams found", ExitCode::NoStreams),
        Ok(urls) => {
            if let Err(e) = output.print(&urls) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Server resolution failed: {}", e), ExitCode::NetworkError),
    }
}

// =============================================================================
// Play Command
// =============================================================================

pub async fn play_cmd(
    cmd: PlayCmd,
    config: &Config,
    client: &QueryClient,
    output: &Output,
) -> ExitCode {
    output.info(format!("Resolving servers for: {}", cmd.path));

    let urls = match client.servers(&cmd.path).await {
        Ok(urls) => urls,
        Err(e) => {
            return output.error(format!("Server resolution failed: {}", e), ExitCode::NetworkError)
        }
    };

    let info = ServerInfo {
        title: cmd.title.clone().unwrap_or_else(|| cmd.path.clone()),
        urls,
    };
    let Some(url) = info.urls.get(cmd.server) else {
        return output.error(
            format!("No stream at index {} ({} available)", cmd.server, info.urls.len()),
            ExitCode::NoStreams,
        );
    };

    let request = PlayRequest {
        url: url.clone(),
        autoplay: !cmd.paused,
        inline: !cmd.fullscreen,
        controls: !cmd.no_controls,
        title: Some(info.title.clone()),
    };

    let player = LocalPlayer::new(
        cmd.player
            .map(Into::into)
            .unwrap_or_else(|| config.player_type()),
    );
    output.info(format!("Opening {} in {}", info.title, player.player_type()));

    if let Err(e) = output.print(&request) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }

    match player.play_and_wait(&request).await {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(e.to_string(), ExitCode::PlayerFailed),
    }
}
