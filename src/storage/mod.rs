// src/storage/mod.rs

use async_trait::async_trait;
use serde_json::Value;

pub mod arango;
pub mod memory;
pub mod types;

pub use types::*;

use crate::error::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence gateway for Environment documents
///
/// Backends hold the canonical copy of every record. The HTTP handlers only
/// ever see this trait, so the in-memory backend used in development and
/// tests behaves exactly like the ArangoDB one from their point of view.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Execute a query and return a cursor over the matching documents.
    /// The caller must `close` the cursor on every path.
    async fn query(&self, query: &EnvironmentQuery) -> StoreResult<Box<dyn DocumentCursor>>;

    /// Create a document. A document whose `_key` already exists yields an
    /// error for which `StoreError::is_conflict` is true.
    async fn create_document(&self, document: Value) -> StoreResult<DocumentMeta>;

    fn database_name(&self) -> &str;

    fn collection_name(&self) -> &str;

    /// Check storage health and return basic metrics
    async fn health_check(&self) -> StoreResult<StorageHealth>;
}

/// Forward-only cursor over query results
#[async_trait]
pub trait DocumentCursor: Send {
    fn has_more(&self) -> bool;

    /// Read the next document. A failed read still advances the cursor.
    async fn read_document(&mut self) -> StoreResult<(DocumentMeta, Value)>;

    /// Release server-side resources. Safe to call more than once.
    async fn close(&mut self) -> StoreResult<()>;
}

/// Helper trait for storage implementations that need initialization
#[async_trait]
pub trait StorageInit {
    /// Create the collection if it does not exist yet
    async fn initialize(&self) -> StoreResult<()>;
}

/// Storage health information for monitoring and diagnostics
#[derive(Debug, Clone)]
pub struct StorageHealth {
    pub healthy: bool,
    pub backend_type: String,
    pub total_documents: Option<u64>,
    pub version: String,
    pub last_check: chrono::DateTime<chrono::Utc>,
}

impl StorageHealth {
    pub fn new(backend_type: String, total_documents: Option<u64>, version: String) -> Self {
        Self {
            healthy: true,
            backend_type,
            total_documents,
            version,
            last_check: chrono::Utc::now(),
        }
    }

    pub fn unhealthy(backend_type: String, error: String) -> Self {
        Self {
            healthy: false,
            backend_type,
            total_documents: None,
            version: format!("unknown (ERROR: {})", error),
            last_check: chrono::Utc::now(),
        }
    }
}
