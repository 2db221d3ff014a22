//! Bookkeeping table holding the applied migration version.
//!
//! The table has a single `version` column and a single row. The executor
//! writes it through the same transaction that ran the migration body, so the
//! stored value never runs ahead of or behind the committed schema.

use crate::config::{DatabaseType, MigrationConfig};
use crate::error::{MigrationError, Result};
use sha2::{Digest, Sha256};
use sqlx::{Any, AnyConnection, Transaction};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Reads and writes the version table.
#[derive(Debug, Clone)]
pub struct VersionStore {
    database_type: DatabaseType,
    schema: String,
    table: String,
    lock_key: i64,
}

impl VersionStore {
    /// Create a store for the table named in `config`.
    #[must_use]
    pub fn new(config: &MigrationConfig) -> Self {
        let table = config.full_table_name();
        Self {
            database_type: config.database_type,
            schema: config.schema.clone(),
            lock_key: lock_key(&table),
            table,
        }
    }

    /// Fully qualified table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the table and its single row if they do not exist yet.
    ///
    /// On PostgreSQL the schema is only created when it is missing, so roles
    /// without CREATE on the database can still use an existing schema.
    pub async fn ensure(&self, conn: &mut AnyConnection) -> Result<()> {
        let schema_exists = match self.database_type {
            DatabaseType::PostgreSQL => {
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_namespace WHERE nspname = $1)",
                )
                .bind(self.schema.clone())
                .fetch_one(&mut *conn)
                .await?;
                exists
            }
            DatabaseType::SQLite => true,
        };
        let create = self.create_sql(schema_exists);
        sqlx::raw_sql(&create).execute(&mut *conn).await?;

        let seed = format!(
            "INSERT INTO {table} (version) SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM {table})",
            table = self.table,
        );
        let seeded = sqlx::query(&seed).execute(&mut *conn).await?;
        if seeded.rows_affected() > 0 {
            debug!(table = %self.table, "Created version table");
        }

        Ok(())
    }

    fn create_sql(&self, schema_exists: bool) -> String {
        let column_type = match self.database_type {
            DatabaseType::PostgreSQL => "BIGINT",
            DatabaseType::SQLite => "INTEGER",
        };
        let create_schema = if schema_exists {
            String::new()
        } else {
            format!("CREATE SCHEMA IF NOT EXISTS {};\n", self.schema)
        };
        format!(
            "{create_schema}CREATE TABLE IF NOT EXISTS {} (version {column_type} NOT NULL);",
            self.table
        )
    }

    /// Currently recorded version, 0 when no row exists.
    pub async fn current_version(&self, conn: &mut AnyConnection) -> Result<i64> {
        let sql = format!("SELECT version FROM {} LIMIT 1", self.table);
        let version: Option<i64> = sqlx::query_scalar(&sql).fetch_optional(&mut *conn).await?;
        Ok(version.unwrap_or(0))
    }

    /// Record `version` as part of the migration's transaction.
    pub async fn set_version(&self, tx: &mut Transaction<'_, Any>, version: i64) -> Result<()> {
        let sql = format!("UPDATE {} SET version = $1", self.table);
        let updated = sqlx::query(&sql).bind(version).execute(&mut **tx).await?;
        if updated.rows_affected() != 1 {
            return Err(MigrationError::Bookkeeping(format!(
                "expected exactly one row in {}, found {}",
                self.table,
                updated.rows_affected()
            )));
        }
        Ok(())
    }

    /// Take the cross-process migration lock, waiting up to `timeout`.
    ///
    /// PostgreSQL uses a session advisory lock tied to `conn`, so the same
    /// connection must be used for the run and for [`Self::unlock`]. SQLite
    /// serialises writers itself and needs no lock.
    pub async fn lock(&self, conn: &mut AnyConnection, timeout: Duration) -> Result<()> {
        if self.database_type != DatabaseType::PostgreSQL {
            return Ok(());
        }

        let deadline = Instant::now() + timeout;
        loop {
            let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
                .bind(self.lock_key)
                .fetch_one(&mut *conn)
                .await?;
            if acquired {
                debug!(table = %self.table, key = self.lock_key, "Acquired migration lock");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(MigrationError::LockFailed(format!(
                    "another migration holds the lock on {} (waited {:?})",
                    self.table, timeout
                )));
            }
            tokio::time::sleep(LOCK_POLL_INTERVAL).await;
        }
    }

    /// Release the lock taken by [`Self::lock`].
    pub async fn unlock(&self, conn: &mut AnyConnection) -> Result<()> {
        if self.database_type != DatabaseType::PostgreSQL {
            return Ok(());
        }

        let released: bool = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
            .bind(self.lock_key)
            .fetch_one(&mut *conn)
            .await?;
        if !released {
            warn!(table = %self.table, "Migration lock was not held at release");
        }
        Ok(())
    }
}

/// Advisory lock key derived from the table name, so runs against different
/// version tables in one database do not block each other.
fn lock_key(table: &str) -> i64 {
    let digest = Sha256::digest(table.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}
