// tests/integration_tests.rs

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use environment_ms::{
    config::ServiceConfig,
    lts::{memory::MemoryLongTermStore, ContentId, LongTermStore},
    storage::{
        memory::MemoryStore, DocumentCursor, DocumentMeta, DocumentStore, EnvironmentQuery,
        StorageHealth, StoreResult,
    },
    web, AppState, Environment, StoreError,
};

// ============================================================================
// Helpers
// ============================================================================

fn app_with(store: Arc<dyn DocumentStore>, long_term: Arc<dyn LongTermStore>) -> Router {
    web::create_app(&ServiceConfig::development(), AppState::new(store, long_term)).unwrap()
}

fn memory_app() -> (Router, Arc<MemoryStore>, Arc<MemoryLongTermStore>) {
    let store = Arc::new(MemoryStore::default());
    let long_term = Arc::new(MemoryLongTermStore::new());
    (app_with(store.clone(), long_term.clone()), store, long_term)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ============================================================================
// Store doubles
// ============================================================================

/// Every operation fails the way an unreachable database would
struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn query(&self, _query: &EnvironmentQuery) -> StoreResult<Box<dyn DocumentCursor>> {
        Err(StoreError::query("connection refused"))
    }

    async fn create_document(&self, _document: Value) -> StoreResult<DocumentMeta> {
        Err(StoreError::Database {
            code: 503,
            num: 503,
            message: "service unavailable".to_string(),
        })
    }

    fn database_name(&self) -> &str {
        "ortelius"
    }

    fn collection_name(&self) -> &str {
        "environments"
    }

    async fn health_check(&self) -> StoreResult<StorageHealth> {
        Err(StoreError::query("connection refused"))
    }
}

/// Queries succeed, but the cursor breaks after yielding `good` documents
struct BrokenCursorStore {
    good: usize,
}

struct BrokenCursor {
    remaining: usize,
}

#[async_trait]
impl DocumentCursor for BrokenCursor {
    fn has_more(&self) -> bool {
        true
    }

    async fn read_document(&mut self) -> StoreResult<(DocumentMeta, Value)> {
        if self.remaining == 0 {
            return Err(StoreError::query("cursor lost"));
        }
        self.remaining -= 1;

        let key = format!("k{}", self.remaining);
        let document = json!({"_key": key, "name": key, "objtype": "Environment"});
        Ok((DocumentMeta::from_document("environments", &document), document))
    }

    async fn close(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for BrokenCursorStore {
    async fn query(&self, _query: &EnvironmentQuery) -> StoreResult<Box<dyn DocumentCursor>> {
        Ok(Box::new(BrokenCursor {
            remaining: self.good,
        }))
    }

    async fn create_document(&self, _document: Value) -> StoreResult<DocumentMeta> {
        Ok(DocumentMeta::default())
    }

    fn database_name(&self) -> &str {
        "ortelius"
    }

    fn collection_name(&self) -> &str {
        "environments"
    }

    async fn health_check(&self) -> StoreResult<StorageHealth> {
        Ok(StorageHealth::new("broken".to_string(), None, "0".to_string()))
    }
}

/// Yields a scripted sequence of reads, some of which fail
struct FlakyCursorStore {
    reads: Vec<Option<&'static str>>,
}

struct FlakyCursor {
    reads: std::collections::VecDeque<Option<&'static str>>,
}

#[async_trait]
impl DocumentCursor for FlakyCursor {
    fn has_more(&self) -> bool {
        !self.reads.is_empty()
    }

    async fn read_document(&mut self) -> StoreResult<(DocumentMeta, Value)> {
        match self.reads.pop_front().flatten() {
            Some(name) => {
                let document = json!({"_key": name, "name": name, "objtype": "Environment"});
                Ok((DocumentMeta::from_document("environments", &document), document))
            }
            None => Err(StoreError::query("transient read failure")),
        }
    }

    async fn close(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyCursorStore {
    async fn query(&self, _query: &EnvironmentQuery) -> StoreResult<Box<dyn DocumentCursor>> {
        Ok(Box::new(FlakyCursor {
            reads: self.reads.iter().copied().collect(),
        }))
    }

    async fn create_document(&self, _document: Value) -> StoreResult<DocumentMeta> {
        Ok(DocumentMeta::default())
    }

    fn database_name(&self) -> &str {
        "ortelius"
    }

    fn collection_name(&self) -> &str {
        "environments"
    }

    async fn health_check(&self) -> StoreResult<StorageHealth> {
        Ok(StorageHealth::new("flaky".to_string(), None, "0".to_string()))
    }
}

/// Never answers within any reasonable timeout
struct SlowStore;

#[async_trait]
impl DocumentStore for SlowStore {
    async fn query(&self, _query: &EnvironmentQuery) -> StoreResult<Box<dyn DocumentCursor>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(StoreError::query("too late"))
    }

    async fn create_document(&self, _document: Value) -> StoreResult<DocumentMeta> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(StoreError::query("too late"))
    }

    fn database_name(&self) -> &str {
        "ortelius"
    }

    fn collection_name(&self) -> &str {
        "environments"
    }

    async fn health_check(&self) -> StoreResult<StorageHealth> {
        Ok(StorageHealth::new("slow".to_string(), None, "0".to_string()))
    }
}

/// Snapshot service that is down
struct FailingLongTermStore;

#[async_trait]
impl LongTermStore for FailingLongTermStore {
    async fn normalize(&self, _environment: &Environment) -> Result<(ContentId, String)> {
        Err(anyhow::anyhow!("snapshot service unavailable"))
    }

    async fn fetch(&self, _cid: &str) -> Result<Option<String>> {
        Err(anyhow::anyhow!("snapshot service unavailable"))
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

// ============================================================================
// Behaviour against the in-memory backends
// ============================================================================

#[tokio::test]
async fn test_create_then_get_by_key_and_name() {
    let (app, _store, _long_term) = memory_app();

    let (status, created) =
        send_json(&app, Method::POST, "/environments", Some(r#"{"name":"prod"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["name"], "prod");
    assert_eq!(created["objtype"], "Environment");

    let key = created["_key"].as_str().unwrap().to_string();
    assert!(ContentId::parse(&key).is_some());

    let (status, by_key) = send_json(&app, Method::GET, &format!("/environments/{}", key), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_key, created);

    let (_, by_name) = send_json(&app, Method::GET, "/environments/prod", None).await;
    assert_eq!(by_name, created);
}

#[tokio::test]
async fn test_duplicate_create_is_absorbed() {
    let (app, store, _long_term) = memory_app();
    let body = r#"{"name":"qa","region":"eu-west-1"}"#;

    let (first_status, first) = send_json(&app, Method::POST, "/environments", Some(body)).await;
    let (second_status, second) = send_json(&app, Method::POST, "/environments", Some(body)).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(store.len().await, 1);

    let (_, list) = send_json(&app, Method::GET, "/environments", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_key_returns_empty_object() {
    let (app, _store, _long_term) = memory_app();

    let (status, body) = send(&app, Method::GET, "/environments/nonexistent", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"{}");
}

#[tokio::test]
async fn test_empty_list_is_an_array() {
    let (app, _store, _long_term) = memory_app();

    let (status, body) = send(&app, Method::GET, "/environments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]");
}

#[tokio::test]
async fn test_invalid_json_returns_503_text() {
    let (app, store, long_term) = memory_app();

    let (status, body) = send(&app, Method::POST, "/environments", Some("{not json")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!body.is_empty());
    assert!(serde_json::from_slice::<Value>(&body).is_err());

    assert!(store.is_empty().await);
    assert!(long_term.is_empty());
}

#[tokio::test]
async fn test_concurrent_distinct_creates() {
    let (app, _store, _long_term) = memory_app();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let body = format!(r#"{{"name":"env-{}"}}"#, i);
                send_json(&app, Method::POST, "/environments", Some(&body)).await
            })
        })
        .collect();

    let mut keys = std::collections::HashSet::new();
    for handle in handles {
        let (status, created) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        keys.insert(created["_key"].as_str().unwrap().to_string());
    }
    assert_eq!(keys.len(), 8);

    let (_, list) = send_json(&app, Method::GET, "/environments", None).await;
    assert_eq!(list.as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_unknown_fields_round_trip() {
    let (app, _store, _long_term) = memory_app();
    let body = r#"{"name":"staging","owner":{"domain":"GLOBAL.Dev"},"tier":2}"#;

    let (_, created) = send_json(&app, Method::POST, "/environments", Some(body)).await;
    let (_, fetched) = send_json(&app, Method::GET, "/environments/staging", None).await;

    assert_eq!(fetched["owner"]["domain"], "GLOBAL.Dev");
    assert_eq!(fetched["tier"], 2);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_snapshot_fallback_by_content_id() {
    let (app, _store, long_term) = memory_app();
    let cid = long_term.insert_raw(r#"{"name":"retired","objtype":"Environment"}"#);

    let (status, body) = send_json(&app, Method::GET, &format!("/environments/{}", cid), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"name": "retired", "objtype": "Environment"}));
}

// ============================================================================
// Best-effort behaviour with failing dependencies
// ============================================================================

#[tokio::test]
async fn test_failing_store_still_answers_200() {
    let app = app_with(Arc::new(FailingStore), Arc::new(MemoryLongTermStore::new()));

    let (status, body) = send(&app, Method::GET, "/environments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]");

    let (status, body) = send(&app, Method::GET, "/environments/prod", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"{}");

    let (status, created) =
        send_json(&app, Method::POST, "/environments", Some(r#"{"name":"prod"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["name"], "prod");
}

#[tokio::test]
async fn test_failing_store_reports_unhealthy() {
    let app = app_with(Arc::new(FailingStore), Arc::new(MemoryLongTermStore::new()));

    let (status, health) = send_json(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_broken_cursor_returns_partial_list() {
    let app = app_with(
        Arc::new(BrokenCursorStore { good: 2 }),
        Arc::new(MemoryLongTermStore::new()),
    );

    let (status, list) = send_json(&app, Method::GET, "/environments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_read_is_skipped() {
    let app = app_with(
        Arc::new(FlakyCursorStore {
            reads: vec![Some("dev"), None, Some("qa"), None, None, Some("prod")],
        }),
        Arc::new(MemoryLongTermStore::new()),
    );

    let (status, list) = send_json(&app, Method::GET, "/environments", None).await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|env| env["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["dev", "qa", "prod"]);
}

#[tokio::test]
async fn test_null_fields_through_full_router() {
    let (app, store, _long_term) = memory_app();
    store
        .create_document(json!({"_key": "x1", "name": null, "objtype": "Environment"}))
        .await
        .unwrap();

    let (status, list) = send_json(&app, Method::GET, "/environments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (_, found) = send_json(&app, Method::GET, "/environments/x1", None).await;
    assert_eq!(found["_key"], "x1");

    let (status, created) = send_json(
        &app,
        Method::POST,
        "/environments",
        Some(r#"{"name":"prod","domain":null,"objtype":null}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["objtype"], "Environment");
}

#[tokio::test]
async fn test_failing_long_term_store_is_absorbed() {
    let store = Arc::new(MemoryStore::default());
    let app = app_with(store.clone(), Arc::new(FailingLongTermStore));

    let (status, created) =
        send_json(&app, Method::POST, "/environments", Some(r#"{"name":"dev"}"#)).await;
    assert_eq!(status, StatusCode::OK);

    // Without a content id the store picks the key
    let key = created["_key"].as_str().unwrap();
    assert!(!key.is_empty());
    assert_eq!(store.len().await, 1);

    let (status, body) = send(&app, Method::GET, "/environments/missing", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"{}");
}

#[tokio::test]
async fn test_slow_store_is_bounded_by_query_timeout() {
    let state = AppState::new(Arc::new(SlowStore), Arc::new(MemoryLongTermStore::new()))
        .with_query_timeout(Duration::from_millis(50));
    let app = web::create_app(&ServiceConfig::development(), state).unwrap();

    let started = std::time::Instant::now();
    let (status, body) = send(&app, Method::GET, "/environments", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]");
    assert!(started.elapsed() < Duration::from_secs(5));
}

// ============================================================================
// Ambient surface
// ============================================================================

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _store, _long_term) = memory_app();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/environments")
        .header(header::ORIGIN, "https://console.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,accept")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("GET"));
    assert!(methods.contains("POST"));
}

#[tokio::test]
async fn test_swagger_document_describes_environments() {
    let (app, _store, _long_term) = memory_app();

    let (status, doc) = send_json(&app, Method::GET, "/swagger/doc.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/environments"]["post"].is_object());
    assert!(doc["paths"]["/environments/{key}"]["get"].is_object());
}

#[tokio::test]
async fn test_config_round_trip_drives_app() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("environment-ms.toml");

    let mut config = ServiceConfig::development();
    config.cors.allow_origins = vec!["https://console.example.com".to_string()];
    config.save_to_file(&path)?;

    let loaded = ServiceConfig::load_from_file(&path)?;
    loaded.validate()?;

    let app = web::create_app(
        &loaded,
        AppState::new(
            Arc::new(MemoryStore::default()),
            Arc::new(MemoryLongTermStore::new()),
        ),
    )?;

    let request = Request::builder()
        .uri("/environments")
        .header(header::ORIGIN, "https://console.example.com")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://console.example.com"
    );
    Ok(())
}
