// src/config/types.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub long_term: LongTermConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0", "127.0.0.1")
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout: u64,
}

/// Document database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Upper bound on a single database call, in seconds
    pub query_timeout: u64,

    pub arango: Option<ArangoConfig>,
}

/// Available document store backends
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Arango,
}

/// ArangoDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArangoConfig {
    /// Server URL (e.g., "http://localhost:8529")
    pub url: String,

    pub database: String,

    /// Collection holding the Environment documents
    pub collection: String,

    pub username: String,

    pub password: Option<String>,

    /// Documents per cursor batch
    pub batch_size: u32,

    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

impl Default for ArangoConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8529".to_string(),
            database: "ortelius".to_string(),
            collection: "environments".to_string(),
            username: "root".to_string(),
            password: None,
            batch_size: 1000,
            connect_timeout: 10,
        }
    }
}

/// Long-term snapshot storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermConfig {
    pub backend: LongTermBackend,

    /// Snapshot directory for the filesystem backend
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LongTermBackend {
    Memory,
    Filesystem,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins (["*"] for all)
    pub allow_origins: Vec<String>,

    /// Allowed request headers
    pub allow_headers: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format
    pub format: LogFormat,
}

/// Log output formats
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,

    /// Compact format
    Compact,

    /// JSON format for structured logging
    Json,
}

impl ServiceConfig {
    /// Get log level as tracing filter
    pub fn log_filter(&self) -> String {
        format!("environment_ms={},tower_http=info", self.logging.level)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.storage.query_timeout)
    }

    pub fn arango_url(&self) -> Option<&str> {
        self.storage.arango.as_ref().map(|arango| arango.url.as_str())
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Server port cannot be 0".to_string());
        }

        if self.host.is_empty() {
            return Err("Server host cannot be empty".to_string());
        }

        if self.request_timeout == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.query_timeout == 0 {
            return Err("Query timeout must be greater than 0".to_string());
        }

        match self.backend {
            StorageBackend::Arango => match self.arango {
                None => {
                    return Err("ArangoDB configuration is required when using the arango backend".to_string());
                }
                Some(ref arango) => arango.validate()?,
            },
            StorageBackend::Memory => {
                // No additional validation needed
            }
        }

        Ok(())
    }
}

impl ArangoConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(format!("ArangoDB url '{}' must start with http:// or https://", self.url));
        }

        for (label, name) in [("database", &self.database), ("collection", &self.collection)] {
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid {
                return Err(format!("Invalid ArangoDB {} name '{}'", label, name));
            }
        }

        if self.batch_size == 0 {
            return Err("Batch size must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl LongTermConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.backend == LongTermBackend::Filesystem && self.path.is_none() {
            return Err("A snapshot path is required when using the filesystem backend".to_string());
        }

        Ok(())
    }
}

impl CorsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.allow_origins.is_empty() {
            return Err("At least one CORS origin must be allowed".to_string());
        }

        Ok(())
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allow_origins.iter().any(|origin| origin == "*")
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.level,
                valid_levels.join(", ")
            ));
        }

        Ok(())
    }
}
