//! Test helper utilities for integration tests

use migrator_core::sqlx;
use migrator_core::{DirectorySource, MigrationConfig, Migrator};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// A scratch directory holding migration files and a SQLite database.
pub struct TestDatabase {
    dir: TempDir,
    /// Directory migration files are written to.
    pub migrations: PathBuf,
}

impl TestDatabase {
    /// Create an empty database and migration directory.
    pub fn new() -> Self {
        init_tracing();
        let dir = TempDir::new().expect("Failed to create temp dir");
        let migrations = dir.path().join("migrations");
        std::fs::create_dir(&migrations).expect("Failed to create migrations dir");
        Self { dir, migrations }
    }

    /// Create a database whose directory already holds `files`.
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let db = Self::new();
        for (name, contents) in files {
            db.write(name, contents);
        }
        db
    }

    /// SQLite connection URL.
    pub fn url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.dir.path().join("test.db").display())
    }

    /// Configuration pointing at this database and directory.
    pub fn config(&self) -> MigrationConfig {
        MigrationConfig::builder()
            .database_url(self.url())
            .migrations_dir(&self.migrations)
            .build()
            .expect("valid test config")
    }

    /// Write a migration file.
    pub fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.migrations.join(name), contents).expect("Failed to write migration");
    }

    /// Remove a migration file.
    pub fn remove(&self, name: &str) {
        std::fs::remove_file(self.migrations.join(name)).expect("Failed to remove migration");
    }

    /// Source reading this database's migration directory.
    pub fn source(&self) -> DirectorySource {
        DirectorySource::new(&self.migrations)
    }

    /// Open a migrator on this database.
    pub async fn migrator(&self) -> Migrator {
        Migrator::open(self.config()).await.expect("Failed to open migrator")
    }

    /// Root of the scratch directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `table` exists in the migrator's SQLite database.
pub async fn table_exists(migrator: &Migrator, table: &str) -> bool {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1",
    )
    .bind(table.to_string())
    .fetch_one(migrator.pool().inner())
    .await
    .expect("Failed to query sqlite_master");
    count == 1
}
