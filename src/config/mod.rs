// src/config/mod.rs

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

mod types;

pub use types::*;

/// Environment variable naming an alternative configuration file
pub const CONFIG_FILE_VAR: &str = "ENVIRONMENT_MS_CONFIG";

/// Configuration file read when `ENVIRONMENT_MS_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "environment-ms.toml";

/// Port selection variable, applied on top of every other source
pub const PORT_VAR: &str = "MS_PORT";

/// Port used when nothing else selects one
pub const DEFAULT_PORT: u16 = 8080;

/// Address the service binds when nothing else selects one
pub const DEFAULT_HOST: &str = "0.0.0.0";

impl ServiceConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Command line arguments (highest priority, applied by the caller)
    /// 2. Environment variables (`ENVMS_SERVER__PORT`, ...)
    /// 3. Configuration file
    /// 4. Default values (lowest priority)
    pub fn load() -> Result<Self> {
        let mut settings = ::config::Config::builder();

        // Start with defaults
        settings = settings.add_source(::config::Config::try_from(&Self::default())?);

        // Load from config file if it exists
        let config_file =
            std::env::var(CONFIG_FILE_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        if Path::new(&config_file).exists() {
            settings = settings.add_source(::config::File::with_name(&config_file));
        }

        // Override with environment variables (prefix: ENVMS_)
        settings = settings.add_source(
            ::config::Environment::with_prefix("ENVMS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.server.validate().map_err(anyhow::Error::msg)?;
        self.storage.validate().map_err(anyhow::Error::msg)?;
        self.long_term.validate().map_err(anyhow::Error::msg)?;
        self.cors.validate().map_err(anyhow::Error::msg)?;
        self.logging.validate().map_err(anyhow::Error::msg)?;
        Ok(())
    }

    /// Create a development configuration with sensible defaults
    pub fn development() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: DEFAULT_PORT,
                request_timeout: 30,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                query_timeout: 10,
                arango: None,
            },
            long_term: LongTermConfig {
                backend: LongTermBackend::Memory,
                path: None,
            },
            cors: CorsConfig {
                allow_origins: vec!["*".to_string()],
                allow_headers: vec![
                    "Origin".to_string(),
                    "Content-Type".to_string(),
                    "Accept".to_string(),
                ],
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }

    /// Create a production configuration template
    pub fn production() -> Self {
        let development = Self::development();

        Self {
            server: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                request_timeout: 60,
            },
            storage: StorageConfig {
                backend: StorageBackend::Arango,
                query_timeout: 30,
                arango: Some(ArangoConfig {
                    url: "http://arangodb:8529".to_string(),
                    password: Some("change-me".to_string()),
                    ..ArangoConfig::default()
                }),
            },
            long_term: LongTermConfig {
                backend: LongTermBackend::Filesystem,
                path: Some(PathBuf::from("/var/lib/environment-ms/snapshots")),
            },
            cors: development.cors,
            logging: LoggingConfig {
                level: "warn".to_string(),
                format: LogFormat::Json,
            },
        }
    }

    /// Apply the `MS_PORT` variable if it is set
    pub fn apply_port_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var(PORT_VAR) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("{} must be a port number, got '{}'", PORT_VAR, port))?;
        }
        Ok(())
    }

    /// Export configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("Failed to parse TOML configuration")
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let toml_content = self.to_toml()?;
        std::fs::write(path, toml_content)
            .with_context(|| format!("Failed to write configuration to {}", path.display()))?;
        Ok(())
    }

    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
        Self::from_toml(&content)
    }
}

/// Development settings, but listening on every interface
impl Default for ServiceConfig {
    fn default() -> Self {
        let mut config = Self::development();
        config.server.host = DEFAULT_HOST.to_string();
        config
    }
}

/// Helper function to load configuration with better error reporting
pub fn load_config() -> Result<ServiceConfig> {
    let mut config = ServiceConfig::load().context("Failed to load service configuration")?;
    config.apply_port_env()?;

    config
        .validate()
        .context("Configuration validation failed")?;

    match std::env::var(CONFIG_FILE_VAR) {
        Ok(path) => tracing::info!("Configuration loaded from custom file: {}", path),
        Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            tracing::info!("Configuration loaded from: {}", DEFAULT_CONFIG_FILE)
        }
        Err(_) => tracing::info!("Using default configuration (no config file found)"),
    }

    tracing::info!("Storage backend: {:?}", config.storage.backend);
    tracing::info!("Long-term storage backend: {:?}", config.long_term.backend);

    Ok(config)
}

/// Generate a sample configuration file
pub fn generate_sample_config(production: bool) -> Result<PathBuf> {
    let config = if production {
        ServiceConfig::production()
    } else {
        ServiceConfig::development()
    };

    let filename = if production {
        "environment-ms.production.toml"
    } else {
        "environment-ms.sample.toml"
    };

    let path = PathBuf::from(filename);
    config.save_to_file(&path)?;

    println!("Generated sample configuration: {}", filename);
    println!("\nTo use this configuration:");
    println!("1. Copy to {}: cp {} {}", DEFAULT_CONFIG_FILE, filename, DEFAULT_CONFIG_FILE);
    println!("2. Edit the configuration as needed");
    println!("3. Or point {} at it: export {}={}", CONFIG_FILE_VAR, CONFIG_FILE_VAR, filename);

    Ok(path)
}
