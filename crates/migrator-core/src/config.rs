//! Migration configuration.

use crate::error::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Database type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// PostgreSQL database.
    #[default]
    PostgreSQL,
    /// SQLite database.
    SQLite,
}

impl DatabaseType {
    /// Parse from a database URL.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if url.starts_with("sqlite://") || url.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PostgreSQL => write!(f, "postgresql"),
            Self::SQLite => write!(f, "sqlite"),
        }
    }
}

/// Migration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Database connection URL.
    #[serde(default)]
    pub database_url: String,

    /// Database type (auto-detected from the URL by the builder).
    #[serde(default)]
    pub database_type: DatabaseType,

    /// Schema holding the version table (PostgreSQL only).
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Version table name.
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Directory containing migration files.
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,

    /// Connection timeout.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// How long to wait for the migration lock held by another run.
    #[serde(with = "humantime_serde", default = "default_lock_timeout")]
    pub lock_timeout: Duration,

    /// Maximum connection pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_table_name() -> String {
    "db_version".to_string()
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_lock_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_connections() -> u32 {
    2
}

/// On-disk form: an explicit `database_type` wins over URL detection.
#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    database_type: Option<DatabaseType>,
    #[serde(flatten)]
    config: MigrationConfig,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_type: DatabaseType::PostgreSQL,
            schema: default_schema(),
            table_name: default_table_name(),
            migrations_dir: default_migrations_dir(),
            connect_timeout: default_connect_timeout(),
            lock_timeout: default_lock_timeout(),
            max_connections: default_max_connections(),
        }
    }
}

impl MigrationConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> MigrationConfigBuilder {
        MigrationConfigBuilder::new()
    }

    /// Load a configuration file. `.toml` files are read as TOML,
    /// `.yaml`/`.yml` as YAML.
    ///
    /// The database type is re-detected from the URL when the file does not
    /// name one explicitly.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let file: ConfigFile = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&contents)
                .map_err(|e| MigrationError::config(format!("{}: {e}", path.display())))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&contents)
                .map_err(|e| MigrationError::config(format!("{}: {e}", path.display())))?,
            _ => {
                return Err(MigrationError::config(format!(
                    "unsupported config format: {}",
                    path.display()
                )))
            }
        };

        let mut config = file.config;
        config.database_type = match file.database_type {
            Some(db_type) => db_type,
            None => DatabaseType::from_url(&config.database_url).unwrap_or(config.database_type),
        };

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            return Err(MigrationError::config("Database URL is required"));
        }

        if !is_identifier(&self.table_name) {
            return Err(MigrationError::config(format!(
                "Table name must be a plain SQL identifier: {:?}",
                self.table_name
            )));
        }

        if self.database_type == DatabaseType::PostgreSQL && !is_identifier(&self.schema) {
            return Err(MigrationError::config(format!(
                "Schema must be a plain SQL identifier: {:?}",
                self.schema
            )));
        }

        if self.max_connections == 0 {
            return Err(MigrationError::config(
                "Max connections must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Get the full table name with schema.
    #[must_use]
    pub fn full_table_name(&self) -> String {
        match self.database_type {
            DatabaseType::PostgreSQL => format!("{}.{}", self.schema, self.table_name),
            DatabaseType::SQLite => self.table_name.clone(),
        }
    }
}

/// Table and schema names are interpolated into SQL, so only plain
/// identifiers are accepted.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Builder for migration configuration.
#[derive(Debug, Default)]
pub struct MigrationConfigBuilder {
    config: MigrationConfig,
}

impl MigrationConfigBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    #[must_use]
    pub fn from_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Set the database URL.
    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        // Auto-detect database type if possible
        if let Some(db_type) = DatabaseType::from_url(&url) {
            self.config.database_type = db_type;
        }
        self.config.database_url = url;
        self
    }

    /// Set the database type.
    #[must_use]
    pub fn database_type(mut self, db_type: DatabaseType) -> Self {
        self.config.database_type = db_type;
        self
    }

    /// Set the schema name.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.config.schema = schema.into();
        self
    }

    /// Set the version table name.
    #[must_use]
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.config.table_name = name.into();
        self
    }

    /// Set the migrations directory.
    #[must_use]
    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.migrations_dir = dir.into();
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the lock timeout.
    #[must_use]
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.lock_timeout = timeout;
        self
    }

    /// Set maximum connections.
    #[must_use]
    pub fn max_connections(mut self, max: u32) -> Self {
        self.config.max_connections = max;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<MigrationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Return the configuration without validating it.
    #[must_use]
    pub fn into_config(self) -> MigrationConfig {
        self.config
    }
}
