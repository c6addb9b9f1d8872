// src/lib.rs

//! # environment-ms
//!
//! REST microservice that creates and retrieves Environment records: named
//! deployment targets persisted as JSON documents in ArangoDB.
//!
//! ## Endpoints
//!
//! - `GET  /environments` lists every Environment
//! - `GET  /environments/:key` finds one by `name` or `_key`
//! - `POST /environments` creates one
//! - `GET  /swagger/index.html` serves the API docs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use environment_ms::config::ServiceConfig;
//! use environment_ms::lts::memory::MemoryLongTermStore;
//! use environment_ms::storage::memory::MemoryStore;
//! use environment_ms::AppState;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServiceConfig::development();
//!     let state = AppState::new(
//!         Arc::new(MemoryStore::default()),
//!         Arc::new(MemoryLongTermStore::new()),
//!     );
//!
//!     environment_ms::web::start_server(&config, state).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod lts;
pub mod state;
pub mod storage;
pub mod web;

// Re-export commonly used types for convenience
pub use error::{ServiceError, StoreError};
pub use lts::{ContentId, LongTermStore};
pub use state::AppState;
pub use storage::{DocumentCursor, DocumentStore, Environment, EnvironmentQuery};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Initialize logging from the logging section of the configuration
///
/// `RUST_LOG` wins over the configured level when it is set.
pub fn init_logging(config: &config::ServiceConfig) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    let initialized = match config.logging.format {
        config::LogFormat::Json => subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        config::LogFormat::Compact => subscriber
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        config::LogFormat::Pretty => subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    initialized.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
