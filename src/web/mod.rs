// src/web/mod.rs

use anyhow::{Context, Result};
use axum::{
    http::{HeaderName, HeaderValue, Method},
    serve, Router,
};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

mod handlers;
pub mod middleware;
mod templates;

use crate::api;
use crate::config::{CorsConfig, ServiceConfig};
use crate::state::AppState;

/// Start the HTTP server and run until a shutdown signal arrives
pub async fn start_server(config: &ServiceConfig, state: AppState) -> Result<()> {
    let app = create_app(config, state.clone())?;
    let address = config.server.bind_address();

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server started - listening on http://{}", address);

    log_startup_info(&state).await;

    info!("Press Ctrl+C to stop");

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the application with all routes and middleware
pub fn create_app(config: &ServiceConfig, state: AppState) -> Result<Router> {
    let middleware_stack = ServiceBuilder::new()
        .layer(axum::middleware::from_fn(middleware::request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout()));

    let app = Router::new()
        .merge(handlers::create_routes(state.clone())?)
        .merge(api::create_api_router(state))
        .layer(middleware_stack)
        .layer(cors_layer(&config.cors)?);

    Ok(app)
}

/// Build the CORS layer from configuration
fn cors_layer(cors: &CorsConfig) -> Result<CorsLayer> {
    let origins = if cors.allows_any_origin() {
        AllowOrigin::from(Any)
    } else {
        let origins = cors
            .allow_origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin '{}'", origin))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    let headers = cors
        .allow_headers
        .iter()
        .map(|name| {
            name.parse::<HeaderName>()
                .with_context(|| format!("Invalid CORS header '{}'", name))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::list(headers)))
}

/// Handle graceful shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down gracefully...");
        },
    }
}

/// Log startup information
async fn log_startup_info(state: &AppState) {
    match state.store.health_check().await {
        Ok(health) => {
            info!(
                backend = %health.backend_type,
                database = %state.store.database_name(),
                collection = %state.store.collection_name(),
                "Storage ready ({} documents)",
                health
                    .total_documents
                    .map(|count| count.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            );
        }
        Err(e) => {
            error!("Storage health check failed: {}", e);
        }
    }

    info!("Long-term storage: {}", state.long_term.backend_name());
    info!("Swagger UI: /swagger/index.html");
}
