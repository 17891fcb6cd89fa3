//! Server configuration.
//!
//! Loaded from TOML, then overridden by command-line flags and `NESOI_*`
//! environment variables in `nesoid`. Keys missing from the file keep
//! their defaults.

use std::path::{Path, PathBuf};

use nesoi_sql::catalog::{check_object_name, DEFAULT_SCAN_BATCH};
use nesoi_sql::session::{SessionConfig, DEFAULT_DATABASE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::DatabaseConfig;

/// Errors reading, writing or checking a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    #[error("cannot access {path}: {source}")]
    Io {
        /// The config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serialization failed.
    #[error("cannot render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// A setting is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds.
    pub host: String,
    /// TCP port, MySQL's by default.
    pub port: u16,
    /// Connections accepted at once; further clients get error 1040.
    pub max_connections: usize,
    /// Database selected for new connections, created on startup if absent.
    pub default_database: String,
    /// Keys requested per KV scan page.
    pub scan_batch_size: usize,
    /// One of error, warn, info, debug, trace.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3306,
            max_connections: 100,
            default_database: DEFAULT_DATABASE.into(),
            scan_batch_size: DEFAULT_SCAN_BATCH,
            log_level: "info".into(),
        }
    }
}

impl ServerConfig {
    /// Reads a TOML file and validates it.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parses and validates TOML text.
    pub fn from_toml(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let text = self.to_toml()?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        std::fs::write(path, text).map_err(io_err)
    }

    /// Renders the configuration as pretty TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host is empty".into()));
        }
        if self.default_database.trim().is_empty() {
            return Err(ConfigError::Invalid("default_database is empty".into()));
        }
        check_object_name("database", &self.default_database)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.scan_batch_size == 0 {
            return Err(ConfigError::Invalid("scan_batch_size must be positive".into()));
        }
        if !matches!(
            self.log_level.to_ascii_lowercase().as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(ConfigError::Invalid(format!(
                "unknown log_level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }

    /// `host:port` for the listener.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The database settings this configuration implies.
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            max_connections: self.max_connections,
            session: SessionConfig {
                default_database: self.default_database.clone(),
                scan_batch_size: self.scan_batch_size,
            },
        }
    }

    /// Starts from the defaults.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Fluent construction of a [`ServerConfig`], validated on `build`.
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    inner: ServerConfig,
}

impl ServerConfigBuilder {
    /// Sets the bind address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.inner.host = host.into();
        self
    }

    /// Sets the port.
    pub fn port(mut self, port: u16) -> Self {
        self.inner.port = port;
        self
    }

    /// Sets the connection limit.
    pub fn max_connections(mut self, limit: usize) -> Self {
        self.inner.max_connections = limit;
        self
    }

    /// Sets the database new connections start in.
    pub fn default_database(mut self, db: impl Into<String>) -> Self {
        self.inner.default_database = db.into();
        self
    }

    /// Sets the scan page size.
    pub fn scan_batch_size(mut self, keys: usize) -> Self {
        self.inner.scan_batch_size = keys;
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.inner.log_level = level.into();
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> ConfigResult<ServerConfig> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
