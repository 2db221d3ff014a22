//! Database connection pool management.

use crate::config::{DatabaseType, MigrationConfig};
use crate::error::{MigrationError, Result};
use sqlx::any::AnyPoolOptions;
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyPool};

/// Database connection pool.
///
/// A migration run checks out one connection and keeps it until the run
/// ends; the connection goes back to the pool when the guard is dropped.
#[derive(Clone)]
pub struct DatabasePool {
    pool: AnyPool,
    database_type: DatabaseType,
}

impl DatabasePool {
    /// Connect using the URL and limits in `config`.
    pub async fn connect(config: &MigrationConfig) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.database_url)
            .await
            .map_err(|e| MigrationError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            database_type: config.database_type,
        })
    }

    /// Wrap an existing pool owned by the caller.
    #[must_use]
    pub fn from_pool(pool: AnyPool, database_type: DatabaseType) -> Self {
        Self {
            pool,
            database_type,
        }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub fn inner(&self) -> &AnyPool {
        &self.pool
    }

    /// Get the database type.
    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    /// Close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Check out a connection for exclusive use.
    pub async fn acquire(&self) -> Result<PoolConnection<Any>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| MigrationError::Connection(e.to_string()))
    }
}

impl std::fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabasePool")
            .field("database_type", &self.database_type)
            .field("size", &self.pool.size())
            .field("idle", &self.pool.num_idle())
            .finish()
    }
}
