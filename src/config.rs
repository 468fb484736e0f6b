//! Storage configuration.
//!
//! The backend is chosen once at startup from a YAML file and/or
//! `SHOWROOM_*` environment variables. Switching backends is a
//! configuration change only.
//!
//! ```yaml
//! backend: sqlite
//! path: /var/lib/showroom/showroom.db
//! verbose: false
//! ```

use std::env;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::Catalog;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    #[diagnostic(code(showroom::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(showroom::config::parse))]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: '{value}'")]
    #[diagnostic(code(showroom::config::env))]
    InvalidEnv { key: String, value: String },

    #[error("Invalid catalog: {0}")]
    #[diagnostic(code(showroom::config::catalog))]
    Catalog(#[from] crate::db::DbError),
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_pool_size() -> usize {
    16
}

fn default_namespace() -> String {
    "showroom".to_string()
}

fn default_database() -> String {
    "main".to_string()
}

/// Relational backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`.
    #[serde(default = "default_sqlite_path")]
    pub path: PathBuf,
    /// Log every executed statement.
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_sqlite_path(),
            verbose: false,
            connect_timeout_ms: default_timeout_ms(),
        }
    }
}

impl SqliteConfig {
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            ..Self::default()
        }
    }
}

/// Document backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrealConfig {
    /// `mem://`, `surrealkv://<path>` or `ws://<host:port>`.
    pub endpoint: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Maximum number of in-flight operations.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for SurrealConfig {
    fn default() -> Self {
        Self {
            endpoint: "mem://".to_string(),
            namespace: default_namespace(),
            database: default_database(),
            username: None,
            password: None,
            pool_size: default_pool_size(),
            connect_timeout_ms: default_timeout_ms(),
        }
    }
}

/// Which backend to run on, with its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BackendConfig {
    Sqlite(SqliteConfig),
    Surreal(SurrealConfig),
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Sqlite(_) => "sqlite",
            BackendConfig::Surreal(_) => "surreal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(flatten)]
    pub backend: BackendConfig,
    /// Optional YAML catalog replacing the built-in collections.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Sqlite(SqliteConfig::default()),
            catalog: None,
        }
    }
}

impl StorageConfig {
    pub fn sqlite(config: SqliteConfig) -> Self {
        Self {
            backend: BackendConfig::Sqlite(config),
            catalog: None,
        }
    }

    pub fn surreal(config: SurrealConfig) -> Self {
        Self {
            backend: BackendConfig::Surreal(config),
            catalog: None,
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Apply `SHOWROOM_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// `SHOWROOM_DB_BACKEND` switching to a different kind starts from that
    /// kind's defaults; per-field variables are applied afterwards.
    pub fn with_overrides(
        mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(kind) = var("SHOWROOM_DB_BACKEND") {
            if kind != self.backend.kind() {
                self.backend = match kind.as_str() {
                    "sqlite" => BackendConfig::Sqlite(SqliteConfig::default()),
                    "surreal" => BackendConfig::Surreal(SurrealConfig::default()),
                    _ => {
                        return Err(ConfigError::InvalidEnv {
                            key: "SHOWROOM_DB_BACKEND".to_string(),
                            value: kind.clone(),
                        });
                    }
                };
            }
        }

        let timeout = parse_var::<u64>(&var, "SHOWROOM_CONNECT_TIMEOUT_MS")?;
        match &mut self.backend {
            BackendConfig::Sqlite(sqlite) => {
                if let Some(path) = var("SHOWROOM_SQLITE_PATH") {
                    sqlite.path = PathBuf::from(path);
                }
                if let Some(verbose) = parse_var::<bool>(&var, "SHOWROOM_SQLITE_VERBOSE")? {
                    sqlite.verbose = verbose;
                }
                if let Some(timeout) = timeout {
                    sqlite.connect_timeout_ms = timeout;
                }
            }
            BackendConfig::Surreal(surreal) => {
                if let Some(endpoint) = var("SHOWROOM_SURREAL_ENDPOINT") {
                    surreal.endpoint = endpoint;
                }
                if let Some(namespace) = var("SHOWROOM_SURREAL_NAMESPACE") {
                    surreal.namespace = namespace;
                }
                if let Some(database) = var("SHOWROOM_SURREAL_DATABASE") {
                    surreal.database = database;
                }
                if let Some(username) = var("SHOWROOM_SURREAL_USERNAME") {
                    surreal.username = Some(username);
                }
                if let Some(password) = var("SHOWROOM_SURREAL_PASSWORD") {
                    surreal.password = Some(password);
                }
                if let Some(pool_size) = parse_var::<usize>(&var, "SHOWROOM_SURREAL_POOL_SIZE")? {
                    surreal.pool_size = pool_size;
                }
                if let Some(timeout) = timeout {
                    surreal.connect_timeout_ms = timeout;
                }
            }
        }
        Ok(self)
    }

    /// The catalog to run with: the built-in one unless a file is configured.
    pub fn load_catalog(&self) -> Result<Catalog, ConfigError> {
        let Some(path) = &self.catalog else {
            return Ok(Catalog::builtin());
        };
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Catalog::from_yaml(&yaml)?)
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match var(key) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value,
            }),
    }
}

/// XDG-compliant default database location: `~/.local/share/showroom/showroom.db`.
///
/// Falls back to the working directory when neither `XDG_DATA_HOME` nor
/// `HOME` is set.
pub fn default_sqlite_path() -> PathBuf {
    let data_home = env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".local/share")));

    match data_home {
        Ok(dir) => dir.join("showroom").join("showroom.db"),
        Err(_) => PathBuf::from("showroom.db"),
    }
}
