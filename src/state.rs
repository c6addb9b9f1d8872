// src/state.rs

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ServiceError;
use crate::lts::LongTermStore;
use crate::storage::DocumentStore;

/// Default upper bound on a single database call
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Dependencies shared by every handler. Built once at startup and never
/// mutated afterwards; cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub long_term: Arc<dyn LongTermStore>,
    pub query_timeout: Duration,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, long_term: Arc<dyn LongTermStore>) -> Self {
        Self {
            store,
            long_term,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Run a storage operation bounded by the query timeout.
    ///
    /// The operation lives inside the handler's future, so when the client
    /// goes away and axum drops that future the outbound call is dropped
    /// with it.
    pub async fn run<T, E, F>(&self, operation: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ServiceError>,
    {
        match tokio::time::timeout(self.query_timeout, operation).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(ServiceError::Timeout(self.query_timeout)),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("database", &self.store.database_name())
            .field("collection", &self.store.collection_name())
            .field("long_term", &self.long_term.backend_name())
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}
