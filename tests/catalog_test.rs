//! Catalog orchestration tests
//!
//! Drives the search → episodes → servers chain against a scripted
//! in-memory backend on a paused clock, so retries and delays are
//! deterministic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alchemywatch::api::{ApiError, CatalogApi};
use alchemywatch::catalog::{Catalog, Phase, Settled};
use alchemywatch::debounce::Debouncer;
use alchemywatch::models::{Episode, ServerInfo, Show, Video};
use alchemywatch::query::{QueryClient, QueryError, QueryKind, QueryStatus, RetryPolicy};
use async_trait::async_trait;
use tokio::time::Instant;

// =============================================================================
// Scripted Backend
// =============================================================================

/// How one key answers: after `delay`, fail `fail_times` times, then `value`
/// (or keep failing when `value` is `None`).
struct Route<T> {
    delay: Duration,
    fail_times: u32,
    value: Option<T>,
}

#[derive(Default)]
struct FakeCatalog {
    search: Mutex<HashMap<String, Route<Vec<Show>>>>,
    episodes: Mutex<HashMap<String, Route<Vec<Episode>>>>,
    servers: Mutex<HashMap<String, Route<Vec<String>>>>,
    calls: Mutex<Vec<(QueryKind, String)>>,
}

impl FakeCatalog {
    fn on_search(self, text: &str, delay_ms: u64, value: Option<Vec<Show>>) -> Self {
        self.search.lock().unwrap().insert(text.into(), route(delay_ms, 0, value));
        self
    }

    fn on_episodes(self, path: &str, delay_ms: u64, value: Option<Vec<Episode>>) -> Self {
        self.episodes.lock().unwrap().insert(path.into(), route(delay_ms, 0, value));
        self
    }

    fn on_servers(self, path: &str, delay_ms: u64, value: Option<Vec<String>>) -> Self {
        self.servers.lock().unwrap().insert(path.into(), route(delay_ms, 0, value));
        self
    }

    fn flaky_search(self, text: &str, fail_times: u32, value: Vec<Show>) -> Self {
        self.search
            .lock()
            .unwrap()
            .insert(text.into(), route(0, fail_times, Some(value)));
        self
    }

    fn calls(&self, kind: QueryKind) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, key)| key.clone())
            .collect()
    }

    async fn respond<T: Clone>(
        &self,
        kind: QueryKind,
        table: &Mutex<HashMap<String, Route<T>>>,
        key: &str,
    ) -> Result<T, ApiError> {
        self.calls.lock().unwrap().push((kind, key.to_string()));

        let (delay, outcome) = {
            let mut table = table.lock().unwrap();
            match table.get_mut(key) {
                None => (Duration::ZERO, Err(ApiError::Status(404))),
                Some(route) if route.fail_times > 0 => {
                    route.fail_times -= 1;
                    (route.delay, Err(ApiError::Status(503)))
                }
                Some(route) => (
                    route.delay,
                    route.value.clone().ok_or(ApiError::Status(500)),
                ),
            }
        };

        tokio::time::sleep(delay).await;
        outcome
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn search(&self, text: &str) -> Result<Vec<Show>, ApiError> {
        self.respond(QueryKind::Search, &self.search, text).await
    }

    async fn episodes(&self, path: &str) -> Result<Vec<Episode>, ApiError> {
        self.respond(QueryKind::Episodes, &self.episodes, path).await
    }

    async fn servers(&self, path: &str) -> Result<Vec<String>, ApiError> {
        self.respond(QueryKind::Servers, &self.servers, path).await
    }
}

fn route<T>(delay_ms: u64, fail_times: u32, value: Option<T>) -> Route<T> {
    Route {
        delay: Duration::from_millis(delay_ms),
        fail_times,
        value,
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn crash_landing() -> Show {
    Video::new("Crash Landing on You", "/show/1")
}

fn episode(n: u32) -> Episode {
    Video::new(format!("Episode {}", n), format!("/episode/1-{}", n))
}

fn standard_backend() -> FakeCatalog {
    FakeCatalog::default()
        .on_search("Crash", 20, Some(vec![crash_landing()]))
        .on_episodes("/show/1", 20, Some(vec![episode(1), episode(2)]))
        .on_servers(
            "/episode/1-1",
            20,
            Some(vec!["https://a.test/1-1.m3u8".into(), "https://b.test/1-1.mp4".into()]),
        )
        .on_servers("/episode/1-2", 20, Some(vec!["https://a.test/1-2.m3u8".into()]))
}

fn catalog_with(api: &Arc<FakeCatalog>) -> Catalog {
    let api: Arc<dyn CatalogApi> = api.clone();
    Catalog::new(QueryClient::new(api, RetryPolicy::default()))
}

/// Search "Crash", open the show, wait for its episodes
async fn drill_to_episodes(catalog: &mut Catalog) {
    catalog.start_search("Crash");
    assert_eq!(catalog.settle_next().await, Some(Settled::Shows(1)));
    assert!(catalog.select_show(0));
    assert_eq!(catalog.settle_next().await, Some(Settled::Episodes(2)));
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_debounced_term_searches_and_lists_show() {
    let api = Arc::new(standard_backend());
    let mut catalog = catalog_with(&api);
    let mut debouncer = Debouncer::new("", Duration::from_millis(500));
    let mut settled_terms = debouncer.subscribe();

    let started = Instant::now();
    for prefix in ["C", "Cr", "Cra", "Cras", "Crash"] {
        debouncer.input(prefix);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let last_keystroke = Instant::now();

    settled_terms.changed().await.unwrap();
    let term = settled_terms.borrow_and_update().clone();
    assert_eq!(term, "Crash");
    assert!(Instant::now() - last_keystroke >= Duration::from_millis(450));
    assert!(Instant::now() - started >= Duration::from_millis(650));

    assert!(catalog.on_debounced(&term));
    assert_eq!(catalog.phase(), Phase::Searching);
    assert!(catalog.is_loading());

    assert_eq!(catalog.settle_next().await, Some(Settled::Shows(1)));
    assert_eq!(catalog.shows(), &[crash_landing()]);
    assert_eq!(catalog.phase(), Phase::ShowsListed);

    // Intermediate keystrokes never reached the backend
    assert_eq!(api.calls(QueryKind::Search), vec!["Crash"]);
}

#[tokio::test(start_paused = true)]
async fn test_show_with_no_episodes() {
    let api = Arc::new(
        FakeCatalog::default()
            .on_search("Crash", 0, Some(vec![crash_landing()]))
            .on_episodes("/show/1", 0, Some(vec![])),
    );
    let mut catalog = catalog_with(&api);

    catalog.start_search("Crash");
    catalog.settle_next().await;
    assert!(catalog.select_show(0));
    assert_eq!(catalog.settle_next().await, Some(Settled::Episodes(0)));

    assert!(catalog.episodes().is_empty());
    assert!(catalog.no_episodes_available());
    assert_eq!(catalog.phase(), Phase::EpisodesListed);
    assert_eq!(api.calls(QueryKind::Episodes), vec!["/show/1"]);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_episode_is_ignored() {
    let api = Arc::new(
        FakeCatalog::default()
            .on_search("Crash", 0, Some(vec![crash_landing()]))
            .on_episodes("/show/1", 0, Some(vec![episode(1)])),
    );
    let mut catalog = catalog_with(&api);

    catalog.start_search("Crash");
    catalog.settle_next().await;
    catalog.select_show(0);
    catalog.settle_next().await;

    assert!(!catalog.select_episode(2));

    assert!(api.calls(QueryKind::Servers).is_empty());
    assert!(catalog.server_info().is_none());
    assert_eq!(catalog.query(QueryKind::Servers).status(), QueryStatus::Idle);
    assert!(!catalog.is_loading());
    assert!(catalog.poll_completions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_search_failure_after_five_attempts() {
    let api = Arc::new(FakeCatalog::default().on_search("Crash", 0, None));
    let mut catalog = catalog_with(&api);

    catalog.start_search("Crash");
    let settled = catalog.settle_next().await.unwrap();

    match settled {
        Settled::Failed(QueryKind::Search, QueryError::Exhausted { attempts, .. }) => {
            assert_eq!(attempts, 5)
        }
        other => panic!("expected exhausted search, got {:?}", other),
    }
    assert_eq!(api.calls(QueryKind::Search).len(), 5);
    assert!(catalog.is_error());
    assert!(!catalog.is_loading());
    assert!(catalog.shows().is_empty());
    assert!(!catalog.no_shows_found());
}

#[tokio::test(start_paused = true)]
async fn test_empty_term_fetches_nothing() {
    let api = Arc::new(standard_backend());
    let mut catalog = catalog_with(&api);

    assert!(!catalog.on_debounced(""));
    assert!(api.calls(QueryKind::Search).is_empty());
    assert_eq!(catalog.phase(), Phase::Idle);

    // Clearing the box after a search keeps what is on screen
    catalog.on_debounced("Crash");
    catalog.settle_next().await;
    assert!(!catalog.on_debounced(""));
    assert_eq!(catalog.shows().len(), 1);
    assert_eq!(api.calls(QueryKind::Search), vec!["Crash"]);
}

// =============================================================================
// Search Behaviour
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_search_preserves_result_order() {
    let shows = vec![
        Video::new("C", "/show/3"),
        Video::new("A", "/show/1"),
        Video::new("B", "/show/2"),
    ];
    let api = Arc::new(FakeCatalog::default().on_search("x", 0, Some(shows.clone())));
    let mut catalog = catalog_with(&api);

    catalog.start_search("x");
    catalog.settle_next().await;

    assert_eq!(catalog.shows(), shows.as_slice());
}

#[tokio::test(start_paused = true)]
async fn test_empty_search_result_is_displayed_state() {
    let api = Arc::new(FakeCatalog::default().on_search("zzz", 0, Some(vec![])));
    let mut catalog = catalog_with(&api);

    catalog.start_search("zzz");
    assert_eq!(catalog.settle_next().await, Some(Settled::Shows(0)));

    assert!(catalog.no_shows_found());
    assert!(!catalog.is_error());
    assert_eq!(catalog.phase(), Phase::ShowsListed);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_absorbed() {
    let api = Arc::new(FakeCatalog::default().flaky_search("Crash", 2, vec![crash_landing()]));
    let mut catalog = catalog_with(&api);

    let started = Instant::now();
    catalog.start_search("Crash");
    assert_eq!(catalog.settle_next().await, Some(Settled::Shows(1)));

    assert_eq!(api.calls(QueryKind::Search).len(), 3);
    assert!(!catalog.is_error());
    // Backoff of 1s then 2s
    assert!(Instant::now() - started >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_stale_search_response_is_discarded() {
    let api = Arc::new(
        FakeCatalog::default()
            .on_search("Cr", 300, Some(vec![Video::new("Crayon Pop", "/show/9")]))
            .on_search("Crash", 10, Some(vec![crash_landing()])),
    );
    let mut catalog = catalog_with(&api);

    catalog.start_search("Cr");
    catalog.start_search("Crash");

    assert_eq!(catalog.settle_next().await, Some(Settled::Shows(1)));
    assert_eq!(catalog.settle_next().await, Some(Settled::Stale(QueryKind::Search)));

    assert_eq!(catalog.shows(), &[crash_landing()]);
    assert_eq!(catalog.query(QueryKind::Search).status(), QueryStatus::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn test_new_search_clears_previous_cycle() {
    let api = Arc::new(
        standard_backend().on_search("Hospital", 0, Some(vec![Video::new("Hospital Playlist", "/show/7")])),
    );
    let mut catalog = catalog_with(&api);

    drill_to_episodes(&mut catalog).await;
    catalog.select_episode(0);
    assert_eq!(catalog.settle_next().await, Some(Settled::Server));
    assert!(catalog.server_info().is_some());

    catalog.start_search("Hospital");

    assert!(catalog.shows().is_empty());
    assert!(catalog.episodes().is_empty());
    assert!(catalog.server_info().is_none());
    assert_eq!(catalog.query(QueryKind::Episodes).status(), QueryStatus::Idle);
    assert_eq!(catalog.query(QueryKind::Servers).status(), QueryStatus::Idle);
    assert_eq!(catalog.phase(), Phase::Searching);

    assert_eq!(catalog.settle_next().await, Some(Settled::Shows(1)));
    assert_eq!(catalog.shows()[0].title, "Hospital Playlist");
}

#[tokio::test(start_paused = true)]
async fn test_new_search_clears_error_flag() {
    let api = Arc::new(
        FakeCatalog::default()
            .on_search("bad", 0, None)
            .on_search("Crash", 0, Some(vec![crash_landing()])),
    );
    let mut catalog = catalog_with(&api);

    catalog.start_search("bad");
    catalog.settle_next().await;
    assert!(catalog.is_error());

    catalog.start_search("Crash");
    assert!(!catalog.is_error());
    catalog.settle_next().await;
    assert!(!catalog.is_error());
    assert_eq!(catalog.shows().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_episodes_dropped_by_new_search() {
    let api = Arc::new(
        FakeCatalog::default()
            .on_search("Crash", 0, Some(vec![crash_landing()]))
            .on_search("Other", 50, Some(vec![Video::new("Other", "/show/2")]))
            .on_episodes("/show/1", 500, Some(vec![episode(1)])),
    );
    let mut catalog = catalog_with(&api);

    catalog.start_search("Crash");
    catalog.settle_next().await;
    catalog.select_show(0);
    catalog.start_search("Other");

    assert_eq!(catalog.settle_next().await, Some(Settled::Shows(1)));
    assert_eq!(catalog.settle_next().await, Some(Settled::Stale(QueryKind::Episodes)));
    assert!(catalog.episodes().is_empty());
    assert_eq!(catalog.shows()[0].path, "/show/2");
}

// =============================================================================
// Reset Idempotence
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_repeating_search_gives_same_outcome() {
    let api = Arc::new(
        FakeCatalog::default()
            .on_search("Crash", 0, Some(vec![crash_landing()]))
            .on_search("bad", 0, None),
    );
    let mut catalog = catalog_with(&api);

    catalog.start_search("Crash");
    let first = catalog.settle_next().await;
    let first_shows = catalog.shows().to_vec();
    catalog.start_search("Crash");
    let second = catalog.settle_next().await;
    assert_eq!(first, second);
    assert_eq!(catalog.shows(), first_shows.as_slice());
    assert!(!catalog.is_error());

    catalog.start_search("bad");
    let first = catalog.settle_next().await;
    catalog.start_search("bad");
    let second = catalog.settle_next().await;
    assert_eq!(first, second);
    assert!(catalog.is_error());
}

// =============================================================================
// Show / Episode Selection
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_select_show_keeps_show_list() {
    let api = Arc::new(standard_backend());
    let mut catalog = catalog_with(&api);

    drill_to_episodes(&mut catalog).await;

    assert_eq!(catalog.shows(), &[crash_landing()]);
    assert_eq!(catalog.episodes(), &[episode(1), episode(2)]);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_show_is_ignored() {
    let api = Arc::new(standard_backend());
    let mut catalog = catalog_with(&api);

    catalog.start_search("Crash");
    catalog.settle_next().await;

    assert!(!catalog.select_show(5));
    assert!(api.calls(QueryKind::Episodes).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_server_info_takes_episode_title() {
    let api = Arc::new(standard_backend());
    let mut catalog = catalog_with(&api);

    drill_to_episodes(&mut catalog).await;
    assert!(catalog.select_episode(0));
    assert!(catalog.is_loading());
    assert_eq!(catalog.settle_next().await, Some(Settled::Server));

    assert_eq!(
        catalog.server_info(),
        Some(&ServerInfo {
            title: "Episode 1".into(),
            urls: vec!["https://a.test/1-1.m3u8".into(), "https://b.test/1-1.mp4".into()],
        })
    );
    assert_eq!(catalog.phase(), Phase::ServerResolved);
    assert_eq!(api.calls(QueryKind::Servers), vec!["/episode/1-1"]);
}

#[tokio::test(start_paused = true)]
async fn test_other_episode_overwrites_server_info() {
    let api = Arc::new(standard_backend());
    let mut catalog = catalog_with(&api);

    drill_to_episodes(&mut catalog).await;
    catalog.select_episode(0);
    catalog.settle_next().await;
    catalog.select_episode(1);
    catalog.settle_next().await;

    let info = catalog.server_info().unwrap();
    assert_eq!(info.title, "Episode 2");
    assert_eq!(info.urls, vec!["https://a.test/1-2.m3u8"]);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_episode_switch_keeps_latest() {
    let api = Arc::new(
        standard_backend()
            .on_servers("/episode/1-1", 400, Some(vec!["https://slow.test/1-1".into()]))
            .on_servers("/episode/1-2", 10, Some(vec!["https://fast.test/1-2".into()])),
    );
    let mut catalog = catalog_with(&api);

    drill_to_episodes(&mut catalog).await;
    catalog.select_episode(0);
    catalog.select_episode(1);

    assert_eq!(catalog.settle_next().await, Some(Settled::Server));
    assert_eq!(catalog.settle_next().await, Some(Settled::Stale(QueryKind::Servers)));

    let info = catalog.server_info().unwrap();
    assert_eq!(info.title, "Episode 2");
    assert_eq!(info.urls, vec!["https://fast.test/1-2"]);
}

#[tokio::test(start_paused = true)]
async fn test_server_failure_keeps_previous_info() {
    let api = Arc::new(standard_backend().on_servers("/episode/1-2", 0, None));
    let mut catalog = catalog_with(&api);

    drill_to_episodes(&mut catalog).await;
    catalog.select_episode(0);
    catalog.settle_next().await;

    catalog.select_episode(1);
    let settled = catalog.settle_next().await.unwrap();
    assert!(matches!(settled, Settled::Failed(QueryKind::Servers, _)));

    assert!(catalog.is_error());
    assert!(!catalog.is_loading());
    assert_eq!(catalog.server_info().unwrap().title, "Episode 1");
    assert_eq!(api.calls(QueryKind::Servers).len(), 1 + 5);
}

#[tokio::test(start_paused = true)]
async fn test_episode_failure_sets_error() {
    let api = Arc::new(
        FakeCatalog::default()
            .on_search("Crash", 0, Some(vec![crash_landing()]))
            .on_episodes("/show/1", 0, None),
    );
    let mut catalog = catalog_with(&api);

    catalog.start_search("Crash");
    catalog.settle_next().await;
    catalog.select_show(0);
    let settled = catalog.settle_next().await.unwrap();

    assert!(matches!(settled, Settled::Failed(QueryKind::Episodes, _)));
    assert!(catalog.is_error());
    assert_eq!(catalog.shows().len(), 1);
    assert!(!catalog.no_episodes_available());
    assert_eq!(catalog.phase(), Phase::ShowsListed);
}
