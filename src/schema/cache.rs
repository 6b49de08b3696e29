//! Process-lifetime schema cache.
//!
//! The first caller starts a fetch of the SDL from the [`SchemaSource`]; the
//! fetch repairs the text and stores the outcome. Concurrent callers wait on
//! that one fetch; later callers read the stored value without blocking. A failed fetch is stored
//! too and is never retried for the lifetime of the cache.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{GatewayError, UpstreamError};
use crate::schema::repair::remove_builtin_scalars;
use crate::upstream::SchemaSource;

/// Default bound on the single schema fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Repaired SDL text. Cheap to clone; every clone shares the same bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SchemaText(Arc<str>);

impl SchemaText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SchemaText {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Deref for SchemaText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SchemaText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaText")
            .field("len", &self.0.len())
            .finish()
    }
}

/// Observable lifecycle of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// No fetch has completed yet.
    NotFetched,
    /// The schema is cached.
    Ready,
    /// The fetch failed; the failure is permanent for this cache.
    Failed,
}

type Outcome = Option<Result<SchemaText, String>>;

/// Fetch-once schema cache. Share it via `Arc`.
///
/// The fetch runs on its own task, so a caller that gives up (or is
/// cancelled) while waiting never aborts it. Every waiter, including later
/// ones, observes the same stored outcome.
pub struct SchemaCache {
    source: Arc<dyn SchemaSource>,
    fetch_timeout: Duration,
    outcome: Arc<watch::Sender<Outcome>>,
    started: AtomicBool,
    fetches: Arc<AtomicUsize>,
}

impl SchemaCache {
    pub fn new(source: Arc<dyn SchemaSource>) -> Self {
        Self::with_timeout(source, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(source: Arc<dyn SchemaSource>, fetch_timeout: Duration) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            source,
            fetch_timeout,
            outcome: Arc::new(outcome),
            started: AtomicBool::new(false),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the repaired schema, fetching it on first use.
    pub async fn get_schema(&self) -> Result<SchemaText, GatewayError> {
        let mut rx = self.outcome.subscribe();
        self.start_fetch();

        let outcome = rx.wait_for(Option::is_some).await.map_err(|_| {
            GatewayError::SchemaFetchFailed("schema fetch ended without a result".to_string())
        })?;
        match &*outcome {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(reason)) => Err(GatewayError::SchemaFetchFailed(reason.clone())),
            None => Err(GatewayError::SchemaFetchFailed(
                "schema fetch ended without a result".to_string(),
            )),
        }
    }

    /// Like [`get_schema`](Self::get_schema), but stop waiting after
    /// `deadline`.
    ///
    /// Giving up does not cancel the shared fetch; a later call still sees
    /// its outcome.
    pub async fn get_schema_with_deadline(
        &self,
        deadline: Duration,
    ) -> Result<SchemaText, GatewayError> {
        match tokio::time::timeout(deadline, self.get_schema()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(?deadline, "Stopped waiting for schema fetch");
                Err(GatewayError::SchemaWaitTimedOut(deadline))
            }
        }
    }

    /// Spawn the fetch task unless some caller already has.
    fn start_fetch(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let source = Arc::clone(&self.source);
        let fetch_timeout = self.fetch_timeout;
        let outcome = Arc::clone(&self.outcome);
        let fetches = Arc::clone(&self.fetches);

        tokio::spawn(async move {
            let fetch = tokio::spawn(fetch_and_repair(source, fetch_timeout, fetches));
            let result = fetch.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Schema fetch task failed");
                Err(format!("schema fetch task failed: {e}"))
            });
            outcome.send_replace(Some(result));
        });
    }

    pub fn state(&self) -> SchemaState {
        match &*self.outcome.borrow() {
            None => SchemaState::NotFetched,
            Some(Ok(_)) => SchemaState::Ready,
            Some(Err(_)) => SchemaState::Failed,
        }
    }

    /// How many times the source has been asked for the schema.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

async fn fetch_and_repair(
    source: Arc<dyn SchemaSource>,
    fetch_timeout: Duration,
    fetches: Arc<AtomicUsize>,
) -> Result<SchemaText, String> {
    fetches.fetch_add(1, Ordering::SeqCst);
    tracing::debug!(timeout = ?fetch_timeout, "Fetching upstream schema");

    let fetched = match tokio::time::timeout(fetch_timeout, source.fetch_schema()).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout(fetch_timeout)),
    };

    match fetched {
        Ok(raw) => {
            let repaired = remove_builtin_scalars(&raw);
            tracing::info!(
                raw_bytes = raw.len(),
                repaired_bytes = repaired.len(),
                "Upstream schema fetched and cached"
            );
            Ok(SchemaText::from(repaired))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Schema fetch failed; failure is cached until restart");
            Err(e.to_string())
        }
    }
}

impl fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCache")
            .field("state", &self.state())
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}
