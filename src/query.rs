//! Query client: retrying wrappers around the catalog operations
//!
//! [`QueryClient`] triggers a remote operation and retries failed attempts
//! under a [`RetryPolicy`]. [`QueryState`] tracks the status of one query
//! kind and hands out [`Ticket`]s so that only the most recently issued call
//! of that kind can settle it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::api::{ApiError, CatalogApi};
use crate::models::{Episode, Show};

// =============================================================================
// Retry Policy
// =============================================================================

/// How failed attempts are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Wait before the first retry; doubles after each further failure
    pub base_delay: Duration,
    /// Upper bound on the wait between attempts
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy with the default backoff and `max_attempts` attempts
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Wait before attempt number `attempt + 1`, after `attempt` failures
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// A query failure that reached the caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The only permitted attempt failed
    #[error("Network error: {0}")]
    Network(String),

    /// Every attempt failed
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

// =============================================================================
// Query Kind and Status
// =============================================================================

/// The three catalog queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Search,
    Episodes,
    Servers,
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKind::Search => write!(f, "search"),
            QueryKind::Episodes => write!(f, "episodes"),
            QueryKind::Servers => write!(f, "servers"),
        }
    }
}

/// Lifecycle of one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Identifies one issued call of a query kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Status of one query kind, plus the sequence of issued tickets
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    status: QueryStatus,
    error: Option<QueryError>,
    issued: u64,
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Succeeded
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Failed
    }

    /// Error of the last failed call, if the query is failed
    pub fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    /// Back to idle. Calls issued before the reset can no longer settle.
    pub fn reset(&mut self) {
        self.status = QueryStatus::Idle;
        self.error = None;
        self.issued += 1;
    }

    /// Mark a new call as pending and return its ticket
    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        self.status = QueryStatus::Pending;
        self.error = None;
        Ticket(self.issued)
    }

    /// Whether `ticket` belongs to the latest issued call
    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.issued
    }

    /// Record the outcome of the call behind `ticket`.
    ///
    /// Returns the result back when the ticket is current, `None` when the
    /// call has been superseded (the state is left untouched).
    pub fn settle<T>(
        &mut self,
        ticket: Ticket,
        result: Result<T, QueryError>,
    ) -> Option<Result<T, QueryError>> {
        if !self.is_current(ticket) {
            return None;
        }
        match &result {
            Ok(_) => {
                self.status = QueryStatus::Succeeded;
                self.error = None;
            }
            Err(e) => {
                self.status = QueryStatus::Failed;
                self.error = Some(e.clone());
            }
        }
        Some(result)
    }
}

// =============================================================================
// Query Client
// =============================================================================

/// Triggers catalog operations with retry
#[derive(Clone)]
pub struct QueryClient {
    api: Arc<dyn CatalogApi>,
    policy: RetryPolicy,
}

impl QueryClient {
    pub fn new(api: Arc<dyn CatalogApi>, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Search shows by free text
    pub async fn search(&self, text: &str) -> Result<Vec<Show>, QueryError> {
        self.with_retry(QueryKind::Search, || self.api.search(text))
            .await
    }

    /// List episodes of the show at `path`
    pub async fn episodes(&self, path: &str) -> Result<Vec<Episode>, QueryError> {
        self.with_retry(QueryKind::Episodes, || self.api.episodes(path))
            .await
    }

    /// Resolve stream URLs for the episode at `path`
    pub async fn servers(&self, path: &str) -> Result<Vec<String>, QueryError> {
        self.with_retry(QueryKind::Servers, || self.api.servers(path))
            .await
    }

    async fn with_retry<T, F, Fut>(&self, kind: QueryKind, mut op: F) -> Result<T, QueryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(%kind, attempt, "query recovered after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= max_attempts => {
                    tracing::warn!(%kind, attempt, error = %e, "query failed");
                    return Err(if max_attempts == 1 {
                        QueryError::Network(e.to_string())
                    } else {
                        QueryError::Exhausted {
                            attempts: attempt,
                            last: e.to_string(),
                        }
                    });
                }
                Err(e) => {
                    let wait = self.policy.delay_after(attempt);
                    tracing::debug!(%kind, attempt, error = %e, ?wait, "attempt failed, retrying");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(10), Duration::from_secs(30));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_query_state_lifecycle() {
        let mut state = QueryState::new();
        assert_eq!(state.status(), QueryStatus::Idle);

        let ticket = state.begin();
        assert!(state.is_pending());

        let settled = state.settle(ticket, Ok::<_, QueryError>(3));
        assert_eq!(settled, Some(Ok(3)));
        assert!(state.is_success());
        assert!(state.error().is_none());
    }

    #[test]
    fn test_query_state_failure_keeps_error() {
        let mut state = QueryState::new();
        let ticket = state.begin();
        let err = QueryError::Network("boom".into());

        state.settle::<()>(ticket, Err(err.clone()));
        assert!(state.is_error());
        assert_eq!(state.error(), Some(&err));

        state.reset();
        assert_eq!(state.status(), QueryStatus::Idle);
        assert!(state.error().is_none());
    }

    #[test]
    fn test_superseded_ticket_is_ignored() {
        let mut state = QueryState::new();
        let old = state.begin();
        let new = state.begin();

        assert!(state.settle(old, Ok::<_, QueryError>("old")).is_none());
        assert!(state.is_pending());

        assert_eq!(state.settle(new, Ok::<_, QueryError>("new")), Some(Ok("new")));
    }

    #[test]
    fn test_reset_invalidates_in_flight_ticket() {
        let mut state = QueryState::new();
        let ticket = state.begin();
        state.reset();

        assert!(state.settle(ticket, Ok::<_, QueryError>(1)).is_none());
        assert_eq!(state.status(), QueryStatus::Idle);
    }
}
