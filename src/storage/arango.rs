// src/storage/arango.rs

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    strip_bookkeeping, DocumentCursor, DocumentMeta, DocumentStore, EnvironmentQuery,
    StorageHealth, StorageInit, StoreResult,
};
use crate::config::ArangoConfig;
use crate::error::StoreError;

/// ArangoDB error number for "duplicate name" when creating a collection
const ARANGO_DUPLICATE_NAME: u32 = 1207;

/// Connection details shared by the store and every cursor it opens
#[derive(Debug)]
struct Connection {
    client: Client,
    base_url: String,
    database: String,
    username: String,
    password: Option<String>,
}

impl Connection {
    fn url(&self, path: &str) -> String {
        format!("{}/_db/{}{}", self.base_url, self.database, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .basic_auth(&self.username, self.password.as_ref())
    }

    /// Turn non-success responses into `StoreError::Database`
    async fn check(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        Err(StoreError::Database {
            code: status.as_u16(),
            num: body.error_num,
            message: body
                .error_message
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorNum", default)]
    error_num: u32,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CursorBatch {
    #[serde(default)]
    result: Vec<Value>,
    #[serde(rename = "hasMore", default)]
    has_more: bool,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    version: String,
}

#[derive(Debug, Deserialize)]
struct CollectionCount {
    count: u64,
}

/// Document store backed by the ArangoDB HTTP API
#[derive(Debug, Clone)]
pub struct ArangoStore {
    connection: Arc<Connection>,
    collection: String,
    batch_size: u32,
}

impl ArangoStore {
    pub fn new(config: &ArangoConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .build()?;

        Ok(Self {
            connection: Arc::new(Connection {
                client,
                base_url: config.url.trim_end_matches('/').to_string(),
                database: config.database.clone(),
                username: config.username.clone(),
                password: config.password.clone(),
            }),
            collection: config.collection.clone(),
            batch_size: config.batch_size.max(1),
        })
    }
}

#[async_trait]
impl DocumentStore for ArangoStore {
    async fn query(&self, query: &EnvironmentQuery) -> StoreResult<Box<dyn DocumentCursor>> {
        let aql = query.to_aql(&self.collection);
        debug!(query = %aql.query, "Running AQL query");

        let response = self
            .connection
            .request(Method::POST, "/_api/cursor")
            .json(&json!({
                "query": aql.query,
                "bindVars": aql.bind_vars,
                "batchSize": self.batch_size,
            }))
            .send()
            .await?;

        let batch: CursorBatch = Connection::check(response).await?.json().await?;

        Ok(Box::new(ArangoCursor {
            connection: self.connection.clone(),
            collection: self.collection.clone(),
            buffer: batch.result.into(),
            server_has_more: batch.has_more,
            id: batch.id,
        }))
    }

    async fn create_document(&self, document: Value) -> StoreResult<DocumentMeta> {
        let key = document
            .get("_key")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let response = self
            .connection
            .request(Method::POST, &format!("/_api/document/{}", self.collection))
            .json(&document)
            .send()
            .await?;

        match Connection::check(response).await {
            Ok(response) => Ok(response.json().await?),
            Err(e) if e.is_conflict() => Err(StoreError::Conflict { key }),
            Err(e) => Err(e),
        }
    }

    fn database_name(&self) -> &str {
        &self.connection.database
    }

    fn collection_name(&self) -> &str {
        &self.collection
    }

    async fn health_check(&self) -> StoreResult<StorageHealth> {
        let response = self
            .connection
            .request(Method::GET, "/_api/version")
            .send()
            .await?;
        let version: VersionInfo = Connection::check(response).await?.json().await?;

        let count = match self
            .connection
            .request(Method::GET, &format!("/_api/collection/{}/count", self.collection))
            .send()
            .await
        {
            Ok(response) => match Connection::check(response).await {
                Ok(response) => response.json::<CollectionCount>().await.ok().map(|c| c.count),
                Err(_) => None,
            },
            Err(_) => None,
        };

        Ok(StorageHealth::new("arangodb".to_string(), count, version.version))
    }
}

#[async_trait]
impl StorageInit for ArangoStore {
    async fn initialize(&self) -> StoreResult<()> {
        let response = self
            .connection
            .request(Method::POST, "/_api/collection")
            .json(&json!({ "name": self.collection }))
            .send()
            .await?;

        match Connection::check(response).await {
            Ok(_) => {
                info!(
                    database = %self.connection.database,
                    collection = %self.collection,
                    "Created collection"
                );
                Ok(())
            }
            Err(StoreError::Database { code, num, .. })
                if code == StatusCode::CONFLICT.as_u16() || num == ARANGO_DUPLICATE_NAME =>
            {
                debug!(collection = %self.collection, "Collection already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Cursor that pulls batches from the server on demand
#[derive(Debug)]
pub struct ArangoCursor {
    connection: Arc<Connection>,
    collection: String,
    buffer: VecDeque<Value>,
    server_has_more: bool,
    id: Option<String>,
}

impl ArangoCursor {
    async fn fetch_next_batch(&mut self) -> StoreResult<()> {
        let id = match self.id.as_deref() {
            Some(id) => id.to_string(),
            None => {
                self.server_has_more = false;
                return Err(StoreError::CursorExhausted);
            }
        };

        let result = async {
            let response = self
                .connection
                .request(Method::PUT, &format!("/_api/cursor/{}", id))
                .send()
                .await?;
            let batch: CursorBatch = Connection::check(response).await?.json().await?;
            Ok::<_, StoreError>(batch)
        }
        .await;

        match result {
            Ok(batch) => {
                self.buffer.extend(batch.result);
                self.server_has_more = batch.has_more;
                Ok(())
            }
            Err(e) => {
                // Give up on the rest; the server expires the cursor via its TTL
                self.server_has_more = false;
                self.buffer.clear();
                Err(e)
            }
        }
    }
}

#[async_trait]
impl DocumentCursor for ArangoCursor {
    fn has_more(&self) -> bool {
        !self.buffer.is_empty() || self.server_has_more
    }

    async fn read_document(&mut self) -> StoreResult<(DocumentMeta, Value)> {
        if self.buffer.is_empty() && self.server_has_more {
            self.fetch_next_batch().await?;
        }

        let document = self.buffer.pop_front().ok_or(StoreError::CursorExhausted)?;
        let meta = DocumentMeta::from_document(&self.collection, &document);
        Ok((meta, strip_bookkeeping(document)))
    }

    async fn close(&mut self) -> StoreResult<()> {
        self.buffer.clear();

        // The server drops exhausted cursors by itself
        let still_open = std::mem::replace(&mut self.server_has_more, false);
        let Some(id) = self.id.take().filter(|_| still_open) else {
            return Ok(());
        };

        let response = self
            .connection
            .request(Method::DELETE, &format!("/_api/cursor/{}", id))
            .send()
            .await?;

        match Connection::check(response).await {
            Ok(_) => Ok(()),
            Err(StoreError::Database { code, .. }) if code == StatusCode::NOT_FOUND.as_u16() => {
                Ok(())
            }
            Err(e) => {
                warn!(cursor = %id, "Failed to delete cursor: {}", e);
                Err(e)
            }
        }
    }
}
