// src/api/environments.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use tracing::{debug, error, info, warn};

use super::policy::BestEffort;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::storage::{DocumentCursor, Environment, EnvironmentQuery};

type ApiResult<T> = Result<T, ServiceError>;

/// Consecutive failed reads after which a list stops draining its cursor
const MAX_FAILED_READS: u32 = 3;

/// Create environment routes
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_environments).post(create_environment))
        .route("/:key", get(get_environment))
        .with_state(state)
}

// ============================================================================
// Handler Functions
// ============================================================================

/// List every Environment in the collection
///
/// Always answers 200. Documents that cannot be read or decoded are skipped
/// and a failed query yields an empty list.
pub async fn list_environments(State(state): State<AppState>) -> Json<Vec<Environment>> {
    let mut environments = Vec::new();

    let Some(mut cursor) = state
        .run(state.store.query(&EnvironmentQuery::all()))
        .await
        .best_effort("Failed to run query")
    else {
        return Json(environments);
    };

    let mut failed_reads = 0;
    while cursor.has_more() {
        let Some((meta, document)) = state
            .run(cursor.read_document())
            .await
            .best_effort("Failed to read document")
        else {
            // Skip the bad read, unless the cursor keeps failing without advancing
            failed_reads += 1;
            if failed_reads >= MAX_FAILED_READS {
                warn!(failed_reads, "Giving up on cursor");
                break;
            }
            continue;
        };
        failed_reads = 0;

        if let Some(environment) =
            Environment::from_document(document).best_effort("Failed to decode document")
        {
            info!(key = %meta.key, "Got doc from query");
            environments.push(environment);
        }
    }

    close_cursor(&state, cursor).await;
    Json(environments)
}

/// Get a single Environment whose `name` or `_key` equals `key`
///
/// Falls back to the long-term store when the database has no match. When
/// both miss, the response is the empty object `{}` with status 200.
pub async fn get_environment(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Json<Environment> {
    let mut environment = Environment::default();
    let mut found = false;

    if let Some(mut cursor) = state
        .run(state.store.query(&EnvironmentQuery::key_or_name(key.as_str())))
        .await
        .best_effort("Failed to run query")
    {
        // Only the first match counts when several records share a name
        if cursor.has_more() {
            found = true;

            if let Some((meta, document)) = state
                .run(cursor.read_document())
                .await
                .best_effort("Failed to read document")
            {
                if let Some(decoded) =
                    Environment::from_document(document).best_effort("Failed to decode document")
                {
                    environment = decoded;
                }
                info!(key = %meta.key, "Got doc from query");
            }
        }

        close_cursor(&state, cursor).await;
    }

    if !found {
        let snapshot = state
            .run(async {
                state
                    .long_term
                    .fetch(&key)
                    .await
                    .map_err(ServiceError::LongTerm)
            })
            .await
            .best_effort("Failed to fetch from long-term storage")
            .flatten();

        match snapshot {
            Some(json) => {
                if let Some(decoded) = serde_json::from_str::<Environment>(&json)
                    .best_effort("Failed to unmarshal from long-term storage")
                {
                    environment = decoded;
                }
                debug!(key = %key, "Served environment from long-term storage");
            }
            None => debug!(key = %key, "Environment not found"),
        }
    }

    Json(environment)
}

/// Create an Environment and persist it
///
/// Answers 503 with the parser message when the body is not an Environment.
/// Otherwise always answers 200 with the record, including its `_key`.
pub async fn create_environment(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Environment>> {
    let mut environment: Environment =
        serde_json::from_slice(&body).map_err(ServiceError::InvalidBody)?;
    environment.stamp_objtype();

    let normalized = state
        .run(async {
            state
                .long_term
                .normalize(&environment)
                .await
                .map_err(ServiceError::LongTerm)
        })
        .await
        .best_effort("Failed to normalize environment");

    if let Some((cid, canonical)) = normalized {
        info!(cid = %cid, "{}={}", cid, canonical);

        // Identical content maps to the same key, so re-posting it is a no-op
        if environment.key.is_empty() {
            environment.key = cid.to_string();
        }
    }

    let Some(document) = environment
        .to_document()
        .best_effort("Failed to encode environment")
    else {
        return Ok(Json(environment));
    };

    match state.run(state.store.create_document(document)).await {
        Ok(meta) => {
            if !meta.key.is_empty() {
                environment.key = meta.key.clone();
            }
            info!(
                collection = %state.store.collection_name(),
                database = %state.store.database_name(),
                key = %meta.key,
                "Created document"
            );
        }
        Err(ServiceError::Store(e)) if e.is_conflict() => {
            debug!(key = %environment.key, "Document already exists");
        }
        Err(e) => error!("Failed to create document: {}", e),
    }

    Ok(Json(environment))
}

/// Release the cursor, logging rather than failing
async fn close_cursor(state: &AppState, mut cursor: Box<dyn DocumentCursor>) {
    state
        .run(cursor.close())
        .await
        .best_effort("Failed to close cursor");
}
