/// Configuration management for the noteboard backend
use crate::error::{NoteboardError, NoteboardResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Default request body limit (50 MiB), large enough for PDF uploads and canvas data URLs
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Log filter used when RUST_LOG is unset or invalid
pub const DEFAULT_LOG_FILTER: &str = "noteboard=debug,tower_http=debug";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub body_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub database_max_connections: u32,
    pub uploads_directory: PathBuf,
    pub drawings_directory: PathBuf,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl ServerConfig {
    /// Defaults with every storage location placed under `data_directory`
    pub fn with_data_directory(data_directory: impl Into<PathBuf>) -> Self {
        let data_directory = data_directory.into();

        ServerConfig {
            service: ServiceConfig {
                hostname: "0.0.0.0".to_string(),
                port: 5000,
                body_limit: DEFAULT_BODY_LIMIT,
            },
            storage: StorageConfig {
                database: data_directory.join("noteboard.sqlite"),
                database_max_connections: 10,
                uploads_directory: data_directory.join("uploads"),
                drawings_directory: data_directory.join("drawings"),
                data_directory,
            },
            logging: LoggingConfig {
                level: DEFAULT_LOG_FILTER.to_string(),
                format: LogFormat::Text,
            },
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> NoteboardResult<Self> {
        dotenv::dotenv().ok();

        let data_directory: PathBuf = env::var("NOTEBOARD_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let mut config = Self::with_data_directory(data_directory);

        if let Ok(hostname) = env::var("NOTEBOARD_HOST") {
            config.service.hostname = hostname;
        }

        // PORT is honoured for compatibility with common hosting platforms
        if let Ok(port) = env::var("NOTEBOARD_PORT").or_else(|_| env::var("PORT")) {
            config.service.port = port
                .parse()
                .map_err(|_| NoteboardError::Config(format!("Invalid port number: {}", port)))?;
        }

        if let Ok(limit) = env::var("NOTEBOARD_BODY_LIMIT") {
            config.service.body_limit = limit
                .parse()
                .map_err(|_| NoteboardError::Config(format!("Invalid body limit: {}", limit)))?;
        }

        if let Ok(path) = env::var("NOTEBOARD_DATABASE_PATH") {
            config.storage.database = PathBuf::from(path);
        }
        if let Ok(max) = env::var("NOTEBOARD_DATABASE_MAX_CONNECTIONS") {
            config.storage.database_max_connections = max.parse().map_err(|_| {
                NoteboardError::Config(format!("Invalid connection count: {}", max))
            })?;
        }
        if let Ok(path) = env::var("NOTEBOARD_UPLOADS_DIRECTORY") {
            config.storage.uploads_directory = PathBuf::from(path);
        }
        if let Ok(path) = env::var("NOTEBOARD_DRAWINGS_DIRECTORY") {
            config.storage.drawings_directory = PathBuf::from(path);
        }

        if let Ok(level) = env::var("RUST_LOG") {
            config.logging.level = level;
        }
        config.logging.format = match env::var("NOTEBOARD_LOG_FORMAT") {
            Ok(format) => parse_log_format(&format)?,
            Err(_) => LogFormat::Text,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> NoteboardResult<()> {
        if self.service.hostname.is_empty() {
            return Err(NoteboardError::Config("Hostname cannot be empty".to_string()));
        }

        if self.service.body_limit == 0 {
            return Err(NoteboardError::Config(
                "Body limit must be greater than zero".to_string(),
            ));
        }

        if self.storage.database_max_connections == 0 {
            return Err(NoteboardError::Config(
                "Database pool needs at least one connection".to_string(),
            ));
        }

        if same_location(&self.storage.uploads_directory, &self.storage.drawings_directory) {
            return Err(NoteboardError::Config(
                "Uploads and drawings must live in different directories".to_string(),
            ));
        }

        Ok(())
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.hostname, self.service.port)
    }
}

fn parse_log_format(value: &str) -> NoteboardResult<LogFormat> {
    match value.to_lowercase().as_str() {
        "text" | "pretty" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        _ => Err(NoteboardError::Config(format!("Invalid log format: {}", value))),
    }
}

fn same_location(a: &Path, b: &Path) -> bool {
    a.components().eq(b.components())
}
