// src/api/mod.rs

use axum::Router;

pub mod environments;
pub mod openapi;
pub mod policy;

use crate::state::AppState;

/// Path the environment routes are mounted under
pub const ENVIRONMENTS_PATH: &str = "/environments";

/// Older clients still call the singular path of the previous release
pub const LEGACY_ENVIRONMENTS_PATH: &str = "/msapi/environment";

/// Create the complete API router with all endpoints
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .nest(ENVIRONMENTS_PATH, environments::create_routes(state.clone()))
        .nest(LEGACY_ENVIRONMENTS_PATH, environments::create_routes(state))
    // CORS and tracing are applied at the web layer
}
