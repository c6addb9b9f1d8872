// src/web/handlers.rs

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tracing::error;

use super::templates::Templates;
use crate::api::openapi;
use crate::state::AppState;
use crate::storage::StorageHealth;

const SWAGGER_INDEX: &str = "/swagger/index.html";
const SWAGGER_DOC: &str = "/swagger/doc.json";

/// Create the documentation and health routes
pub fn create_routes(state: AppState) -> Result<Router> {
    let templates = Templates::new()?;

    let swagger = Router::new()
        .route("/swagger", get(|| async { Redirect::permanent(SWAGGER_INDEX) }))
        .route("/swagger/", get(swagger_index))
        .route("/swagger/*path", get(swagger_handler))
        .with_state(templates);

    let health = Router::new()
        .route("/health", get(health_handler))
        .with_state(state);

    Ok(swagger.merge(health))
}

/// Serve the Swagger UI page or the OpenAPI document behind it
async fn swagger_handler(
    Path(path): Path<String>,
    State(templates): State<Templates>,
) -> Response {
    match path.as_str() {
        "index.html" => swagger_index(State(templates)).await,
        "doc.json" => Json(openapi::document()).into_response(),
        _ => (StatusCode::NOT_FOUND, "File not found").into_response(),
    }
}

async fn swagger_index(State(templates): State<Templates>) -> Response {
    match templates.swagger_page("Ortelius Environment Microservice", SWAGGER_DOC) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Template rendering error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<h1>Template Error</h1>".to_string()),
            )
                .into_response()
        }
    }
}

/// Health check with the storage backend's view of itself
async fn health_handler(State(state): State<AppState>) -> Response {
    let storage = match state.run(state.store.health_check()).await {
        Ok(health) => health,
        Err(e) => {
            error!("Storage health check failed: {}", e);
            StorageHealth::unhealthy("unknown".to_string(), e.to_string())
        }
    };

    let status = if storage.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = Json(json!({
        "status": if storage.healthy { "healthy" } else { "unhealthy" },
        "service": "environment-ms",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": {
            "backend": storage.backend_type,
            "database": state.store.database_name(),
            "collection": state.store.collection_name(),
            "documents": storage.total_documents,
            "version": storage.version,
        },
        "long_term": state.long_term.backend_name(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }));

    (status, body).into_response()
}
