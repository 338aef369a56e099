//! Catalog orchestration
//!
//! [`Catalog`] owns the show list, the episode list and the resolved server
//! info, together with the status of the three queries that fill them. The
//! front end only reads projections and calls the named transitions
//! (`start_search`, `select_show`, `select_episode`); completions of the
//! spawned queries come back over a channel and are applied with
//! [`Catalog::poll_completions`] or [`Catalog::settle_next`].

use tokio::sync::mpsc;

use crate::models::{Episode, ServerInfo, Show};
use crate::query::{QueryClient, QueryError, QueryKind, QueryState, Ticket};

// =============================================================================
// Phases and Completions
// =============================================================================

/// Where the user is in the drill-down, derived from the held state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing searched yet
    Idle,
    /// Search in flight
    Searching,
    /// Search succeeded
    ShowsListed,
    /// A show's episodes arrived
    EpisodesListed,
    /// An episode's stream info arrived
    ServerResolved,
}

/// A finished query, as sent back by its task
#[derive(Debug)]
pub enum Completion {
    Search {
        ticket: Ticket,
        result: Result<Vec<Show>, QueryError>,
    },
    Episodes {
        ticket: Ticket,
        result: Result<Vec<Episode>, QueryError>,
    },
    Servers {
        ticket: Ticket,
        result: Result<Vec<String>, QueryError>,
    },
}

impl Completion {
    pub fn kind(&self) -> QueryKind {
        match self {
            Completion::Search { .. } => QueryKind::Search,
            Completion::Episodes { .. } => QueryKind::Episodes,
            Completion::Servers { .. } => QueryKind::Servers,
        }
    }
}

/// What applying a completion changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// Show list replaced with this many entries
    Shows(usize),
    /// Episode list replaced with this many entries
    Episodes(usize),
    /// Server info replaced
    Server,
    /// A query failed after its retries
    Failed(QueryKind, QueryError),
    /// A superseded call finished and was dropped
    Stale(QueryKind),
}

// =============================================================================
// Catalog
// =============================================================================

/// Selection state machine for search → episodes → servers
pub struct Catalog {
    client: QueryClient,

    search: QueryState,
    episodes_query: QueryState,
    servers_query: QueryState,

    shows: Vec<Show>,
    episodes: Vec<Episode>,
    server_info: Option<ServerInfo>,
    /// Episode whose servers are being resolved
    resolving: Option<Episode>,
    /// Raised by any surfaced failure, cleared on a new search
    query_error: bool,

    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl Catalog {
    pub fn new(client: QueryClient) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            search: QueryState::new(),
            episodes_query: QueryState::new(),
            servers_query: QueryState::new(),
            shows: Vec::new(),
            episodes: Vec::new(),
            server_info: None,
            resolving: None,
            query_error: false,
            tx,
            rx,
        }
    }

    // -------------------------------------------------------------------------
    // Projections
    // -------------------------------------------------------------------------

    pub fn shows(&self) -> &[Show] {
        &self.shows
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    pub fn query(&self, kind: QueryKind) -> &QueryState {
        match kind {
            QueryKind::Search => &self.search,
            QueryKind::Episodes => &self.episodes_query,
            QueryKind::Servers => &self.servers_query,
        }
    }

    /// Any query in flight
    pub fn is_loading(&self) -> bool {
        self.search.is_pending()
            || self.episodes_query.is_pending()
            || self.servers_query.is_pending()
    }

    /// Any query failed, or a failure was recorded since the last search
    pub fn is_error(&self) -> bool {
        self.search.is_error()
            || self.episodes_query.is_error()
            || self.servers_query.is_error()
            || self.query_error
    }

    /// Search finished and found nothing
    pub fn no_shows_found(&self) -> bool {
        self.search.is_success() && self.shows.is_empty()
    }

    /// Episode query finished and found nothing
    pub fn no_episodes_available(&self) -> bool {
        self.episodes_query.is_success() && self.episodes.is_empty()
    }

    pub fn phase(&self) -> Phase {
        if self.server_info.is_some() {
            Phase::ServerResolved
        } else if self.episodes_query.is_success() {
            Phase::EpisodesListed
        } else if self.search.is_success() {
            Phase::ShowsListed
        } else if self.search.is_pending() {
            Phase::Searching
        } else {
            Phase::Idle
        }
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// React to a settled search term.
    ///
    /// An empty term issues nothing and leaves the current state alone.
    /// Returns whether a search was started.
    pub fn on_debounced(&mut self, term: &str) -> bool {
        if term.is_empty() {
            tracing::debug!("empty search term, nothing to fetch");
            return false;
        }
        self.start_search(term);
        true
    }

    /// Drop everything from the previous cycle and search for `term`
    pub fn start_search(&mut self, term: &str) {
        self.reset();

        let ticket = self.search.begin();
        tracing::info!(term, "searching shows");

        let client = self.client.clone();
        let tx = self.tx.clone();
        let text = term.to_string();
        tokio::spawn(async move {
            let result = client.search(&text).await;
            let _ = tx.send(Completion::Search { ticket, result });
        });
    }

    /// Fetch episodes for the show at `index`; out of range does nothing.
    ///
    /// The show list is kept. Returns whether a query was started.
    pub fn select_show(&mut self, index: usize) -> bool {
        let Some(show) = self.shows.get(index) else {
            tracing::debug!(index, "show index out of range");
            return false;
        };

        let ticket = self.episodes_query.begin();
        tracing::info!(title = %show.title, path = %show.path, "listing episodes");

        let client = self.client.clone();
        let tx = self.tx.clone();
        let path = show.path.clone();
        tokio::spawn(async move {
            let result = client.episodes(&path).await;
            let _ = tx.send(Completion::Episodes { ticket, result });
        });
        true
    }

    /// Resolve servers for the episode at `index`; out of range does nothing.
    ///
    /// Returns whether a query was started.
    pub fn select_episode(&mut self, index: usize) -> bool {
        let Some(episode) = self.episodes.get(index).cloned() else {
            tracing::debug!(index, "episode index out of range");
            return false;
        };

        let ticket = self.servers_query.begin();
        tracing::info!(title = %episode.title, path = %episode.path, "resolving servers");

        let client = self.client.clone();
        let tx = self.tx.clone();
        let path = episode.path.clone();
        self.resolving = Some(episode);
        tokio::spawn(async move {
            let result = client.servers(&path).await;
            let _ = tx.send(Completion::Servers { ticket, result });
        });
        true
    }

    fn reset(&mut self) {
        self.search.reset();
        self.episodes_query.reset();
        self.servers_query.reset();
        self.shows.clear();
        self.episodes.clear();
        self.server_info = None;
        self.resolving = None;
        self.query_error = false;
    }

    // -------------------------------------------------------------------------
    // Completions
    // -------------------------------------------------------------------------

    /// Apply every completion that has already arrived
    pub fn poll_completions(&mut self) -> Vec<Settled> {
        let mut settled = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            settled.push(self.apply(completion));
        }
        settled
    }

    /// Wait for the next completion and apply it
    pub async fn settle_next(&mut self) -> Option<Settled> {
        let completion = self.rx.recv().await?;
        Some(self.apply(completion))
    }

    /// Fold one completion into the state
    pub fn apply(&mut self, completion: Completion) -> Settled {
        let kind = completion.kind();
        let settled = match completion {
            Completion::Search { ticket, result } => match self.search.settle(ticket, result) {
                None => Settled::Stale(kind),
                Some(Ok(shows)) => {
                    self.shows = shows;
                    Settled::Shows(self.shows.len())
                }
                Some(Err(e)) => self.fail(kind, e),
            },
            Completion::Episodes { ticket, result } => {
                match self.episodes_query.settle(ticket, result) {
                    None => Settled::Stale(kind),
                    Some(Ok(episodes)) => {
                        self.episodes = episodes;
                        Settled::Episodes(self.episodes.len())
                    }
                    Some(Err(e)) => self.fail(kind, e),
                }
            }
            Completion::Servers { ticket, result } => {
                match self.servers_query.settle(ticket, result) {
                    None => Settled::Stale(kind),
                    Some(Ok(urls)) => {
                        let title = self
                            .resolving
                            .take()
                            .map(|episode| episode.title)
                            .unwrap_or_default();
                        self.server_info = Some(ServerInfo { title, urls });
                        Settled::Server
                    }
                    // Previous server info stays on screen
                    Some(Err(e)) => {
                        self.resolving = None;
                        self.fail(kind, e)
                    }
                }
            }
        };

        match &settled {
            Settled::Stale(kind) => tracing::debug!(%kind, "dropped superseded response"),
            Settled::Shows(n) => tracing::info!(count = n, "shows listed"),
            Settled::Episodes(n) => tracing::info!(count = n, "episodes listed"),
            Settled::Server => tracing::info!("stream servers resolved"),
            Settled::Failed(..) => {}
        }
        settled
    }

    fn fail(&mut self, kind: QueryKind, error: QueryError) -> Settled {
        tracing::warn!(%kind, %error, "query failed");
        self.query_error = true;
        Settled::Failed(kind, error)
    }
}
