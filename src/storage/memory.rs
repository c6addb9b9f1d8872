// src/storage/memory.rs

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    strip_bookkeeping, DocumentCursor, DocumentMeta, DocumentStore, EnvironmentQuery,
    StorageHealth, StorageInit, StoreResult,
};
use crate::error::StoreError;

/// In-memory document store
///
/// Documents are kept in insertion order, which is also the order cursors
/// yield them in. Suitable for development, tests and single-node demos where
/// persistence isn't required.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    database: String,
    collection: String,
    documents: Arc<RwLock<Vec<Value>>>,
}

impl MemoryStore {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            documents: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Number of stored documents regardless of type
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    fn document_key(document: &Value) -> Option<&str> {
        document
            .get("_key")
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("_system", "environments")
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(&self, query: &EnvironmentQuery) -> StoreResult<Box<dyn DocumentCursor>> {
        let documents = self.documents.read().await;

        // Snapshot the matches so the cursor holds no lock
        let matched: VecDeque<Value> = documents
            .iter()
            .filter(|document| query.matches(document))
            .cloned()
            .collect();

        Ok(Box::new(MemoryCursor {
            collection: self.collection.clone(),
            documents: matched,
        }))
    }

    async fn create_document(&self, mut document: Value) -> StoreResult<DocumentMeta> {
        let object = document
            .as_object_mut()
            .ok_or_else(|| StoreError::query("Document must be a JSON object"))?;

        let mut documents = self.documents.write().await;

        let key = match object.get("_key").and_then(Value::as_str).filter(|k| !k.is_empty()) {
            Some(key) => key.to_string(),
            None => Uuid::new_v4().simple().to_string(),
        };

        if documents
            .iter()
            .any(|existing| Self::document_key(existing) == Some(key.as_str()))
        {
            return Err(StoreError::Conflict { key });
        }

        object.insert("_key".to_string(), Value::from(key.as_str()));
        object.insert(
            "_id".to_string(),
            Value::from(format!("{}/{}", self.collection, key)),
        );
        object.insert(
            "_rev".to_string(),
            Value::from(Uuid::new_v4().simple().to_string()[..11].to_string()),
        );

        let meta = DocumentMeta::from_document(&self.collection, &document);
        documents.push(document);
        Ok(meta)
    }

    fn database_name(&self) -> &str {
        &self.database
    }

    fn collection_name(&self) -> &str {
        &self.collection
    }

    async fn health_check(&self) -> StoreResult<StorageHealth> {
        let documents = self.documents.read().await;

        Ok(StorageHealth::new(
            "memory".to_string(),
            Some(documents.len() as u64),
            env!("CARGO_PKG_VERSION").to_string(),
        ))
    }
}

#[async_trait]
impl StorageInit for MemoryStore {
    async fn initialize(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Cursor over a snapshot of matching documents
#[derive(Debug)]
pub struct MemoryCursor {
    collection: String,
    documents: VecDeque<Value>,
}

#[async_trait]
impl DocumentCursor for MemoryCursor {
    fn has_more(&self) -> bool {
        !self.documents.is_empty()
    }

    async fn read_document(&mut self) -> StoreResult<(DocumentMeta, Value)> {
        let document = self
            .documents
            .pop_front()
            .ok_or(StoreError::CursorExhausted)?;

        let meta = DocumentMeta::from_document(&self.collection, &document);
        Ok((meta, strip_bookkeeping(document)))
    }

    async fn close(&mut self) -> StoreResult<()> {
        self.documents.clear();
        Ok(())
    }
}
