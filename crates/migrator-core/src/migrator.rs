//! Migration runner.

use crate::config::MigrationConfig;
use crate::error::Result;
use crate::executor::{PlanExecutor, RunSummary};
use crate::migration::MigrationSet;
use crate::planner::{plan_to, Plan};
use crate::pool::DatabasePool;
use crate::source::{DirectorySource, MigrationSource};
use crate::status::StatusReport;
use crate::version_store::VersionStore;
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyConnection};
use tracing::{debug, info, warn};

/// Migration runner.
///
/// Owns the loaded migrations and a handle to the database. Every operation
/// checks out one connection, holds the migration lock on it for the
/// duration of the call, and hands it back on return.
pub struct Migrator {
    pool: DatabasePool,
    store: VersionStore,
    migrations: MigrationSet,
    config: MigrationConfig,
}

impl Migrator {
    /// Load migrations from `config.migrations_dir` and connect.
    pub async fn open(config: MigrationConfig) -> Result<Self> {
        let source = DirectorySource::new(config.migrations_dir.clone());
        Self::connect(config, &source).await
    }

    /// Load migrations from `source` and connect.
    ///
    /// Migrations are loaded before connecting, so a broken migration
    /// directory is reported without touching the database.
    pub async fn connect(config: MigrationConfig, source: &dyn MigrationSource) -> Result<Self> {
        config.validate()?;
        let migrations = source.load_all().await?;
        let pool = DatabasePool::connect(&config).await?;

        info!(
            database = %config.database_type,
            table = %config.full_table_name(),
            migrations = migrations.len(),
            "Migrator ready"
        );

        Ok(Self::from_parts(pool, config, migrations))
    }

    /// Create a migrator on a pool owned by the caller.
    pub async fn with_pool(
        pool: DatabasePool,
        config: MigrationConfig,
        source: &dyn MigrationSource,
    ) -> Result<Self> {
        config.validate()?;
        let migrations = source.load_all().await?;
        Ok(Self::from_parts(pool, config, migrations))
    }

    fn from_parts(pool: DatabasePool, config: MigrationConfig, migrations: MigrationSet) -> Self {
        Self {
            store: VersionStore::new(&config),
            pool,
            migrations,
            config,
        }
    }

    /// Loaded migrations.
    #[must_use]
    pub fn migrations(&self) -> &MigrationSet {
        &self.migrations
    }

    /// Get the database pool.
    #[must_use]
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Version currently recorded in the database.
    pub async fn current_version(&self) -> Result<i64> {
        let mut conn = self.checkout().await?;
        let result = self.read_version(&mut conn).await;
        self.release(&mut conn).await;
        result
    }

    /// Current version, highest known version, and per-migration status.
    pub async fn status(&self) -> Result<StatusReport> {
        let current = self.current_version().await?;
        Ok(StatusReport::new(current, &self.migrations))
    }

    /// Plan the move to `target` (latest when `None`) without running it.
    pub async fn plan(&self, target: Option<i64>) -> Result<Plan<'_>> {
        let current = self.current_version().await?;
        let target = target.unwrap_or_else(|| self.migrations.max_sequence());
        plan_to(current, target, &self.migrations)
    }

    /// Apply every migration above the current version.
    pub async fn migrate_to_latest(&self) -> Result<RunSummary> {
        self.migrate_to(self.migrations.max_sequence()).await
    }

    /// Move the database to `target`, applying or reverting as needed.
    /// `0` reverts everything.
    pub async fn migrate_to(&self, target: i64) -> Result<RunSummary> {
        let mut conn = self.checkout().await?;
        let result = self.run(&mut conn, target).await;
        self.release(&mut conn).await;
        result
    }

    async fn run(&self, conn: &mut AnyConnection, target: i64) -> Result<RunSummary> {
        let current = self.read_version(conn).await?;
        let plan = plan_to(current, target, &self.migrations)?;
        debug!(from = current, to = target, steps = plan.len(), "Planned migration run");
        PlanExecutor::new(conn, &self.store).apply(&plan).await
    }

    async fn read_version(&self, conn: &mut AnyConnection) -> Result<i64> {
        self.store.ensure(conn).await?;
        self.store.current_version(conn).await
    }

    /// Check out a connection and take the migration lock on it.
    async fn checkout(&self) -> Result<PoolConnection<Any>> {
        let mut conn = self.pool.acquire().await?;
        self.store.lock(&mut conn, self.config.lock_timeout).await?;
        Ok(conn)
    }

    async fn release(&self, conn: &mut PoolConnection<Any>) {
        if let Err(e) = self.store.unlock(conn).await {
            // The lock is tied to the session; dropping the connection frees it.
            warn!(error = %e, "Failed to release migration lock, closing connection");
            conn.close_on_drop();
        }
    }
}

impl std::fmt::Debug for Migrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("pool", &self.pool)
            .field("table", &self.store.table())
            .field("migrations", &self.migrations.len())
            .finish()
    }
}
