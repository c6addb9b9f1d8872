// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use environment_ms::config::{
    generate_sample_config, load_config, LongTermBackend, ServiceConfig, StorageBackend,
    CONFIG_FILE_VAR,
};
use environment_ms::lts::{
    filesystem::FilesystemLongTermStore, memory::MemoryLongTermStore, LongTermStore,
};
use environment_ms::storage::{
    arango::ArangoStore, memory::MemoryStore, DocumentStore, StorageInit,
};
use environment_ms::{web, AppState};

#[derive(Parser)]
#[command(name = "environment-ms")]
#[command(about = "REST microservice for Environment records")]
#[command(long_about = r#"
Creates and retrieves Environment records, the named deployment targets of
the Ortelius platform, stored as JSON documents in ArangoDB.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind to
        #[arg(short, long, env = "MS_PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "ENVMS_HOST")]
        host: Option<String>,

        /// Configuration file path
        #[arg(short, long, env = "ENVIRONMENT_MS_CONFIG")]
        config: Option<String>,
    },
    /// Generate sample configuration files
    Config {
        /// Generate production configuration
        #[arg(long)]
        production: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host, config } => {
            if let Some(config_path) = config {
                std::env::set_var(CONFIG_FILE_VAR, config_path);
            }

            let mut app_config = load_config()?;

            // Override with CLI arguments
            if let Some(port) = port {
                app_config.server.port = port;
            }
            if let Some(host) = host {
                app_config.server.host = host;
            }
            app_config.validate()?;

            environment_ms::init_logging(&app_config)?;

            info!("Starting environment-ms {}", environment_ms::VERSION);
            info!("Binding to {}", app_config.server.bind_address());

            let state = build_state(&app_config).await?;
            info!("Storage backends initialized successfully");

            web::start_server(&app_config, state).await?;
        }

        Commands::Config { production } => {
            init_minimal_logging()?;
            generate_sample_config(production)?;
        }

        Commands::Version => {
            println!("environment-ms {}", environment_ms::VERSION);
            println!("{}", environment_ms::DESCRIPTION);
        }
    }

    Ok(())
}

/// Initialize minimal logging for CLI commands
fn init_minimal_logging() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
        .context("Failed to initialize logging")
}

/// Wire the configured backends into the shared handler state
async fn build_state(config: &ServiceConfig) -> Result<AppState> {
    let store = create_document_store(config).await?;
    let long_term = create_long_term_store(config).await?;

    Ok(AppState::new(store, long_term).with_query_timeout(config.query_timeout()))
}

/// Create the document store named by the configuration
async fn create_document_store(config: &ServiceConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage (development mode)");
            Ok(Arc::new(MemoryStore::new("_system", "environments")))
        }
        StorageBackend::Arango => {
            let arango = config
                .storage
                .arango
                .as_ref()
                .context("ArangoDB configuration is missing")?;

            info!(
                url = %arango.url,
                database = %arango.database,
                collection = %arango.collection,
                "Initializing ArangoDB storage backend"
            );

            let store = ArangoStore::new(arango)?;
            store
                .initialize()
                .await
                .context("Failed to initialize the ArangoDB collection")?;
            Ok(Arc::new(store))
        }
    }
}

/// Create the long-term snapshot store named by the configuration
async fn create_long_term_store(config: &ServiceConfig) -> Result<Arc<dyn LongTermStore>> {
    match config.long_term.backend {
        LongTermBackend::Memory => {
            info!("Using in-memory long-term storage");
            Ok(Arc::new(MemoryLongTermStore::new()))
        }
        LongTermBackend::Filesystem => {
            let path = config
                .long_term
                .path
                .as_ref()
                .context("A snapshot path is required for filesystem long-term storage")?;

            info!("Using filesystem long-term storage at {}", path.display());
            Ok(Arc::new(FilesystemLongTermStore::open(path).await?))
        }
    }
}
