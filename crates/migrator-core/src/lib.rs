//! # Migrator Core
//!
//! Versioned SQL schema migrations for PostgreSQL and SQLite.
//!
//! This crate provides:
//! - Loading numbered `.sql` migrations from a directory, or defining them in code
//! - A one-row version table that always matches the last committed migration
//! - Planning forward and backward moves between versions
//! - One transaction per migration step, stopping at the first failure
//!
//! ## Example
//!
//! ```rust,no_run
//! use migrator_core::{MigrationConfig, Migrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MigrationConfig::builder()
//!         .database_url("postgres://localhost/app")
//!         .migrations_dir("migrations")
//!         .build()?;
//!
//!     let migrator = Migrator::open(config).await?;
//!     migrator.migrate_to_latest().await?;
//!     print!("{}", migrator.status().await?.table());
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod executor;
pub mod migration;
pub mod migrator;
pub mod planner;
pub mod pool;
pub mod source;
pub mod status;
pub mod version_store;

pub use config::{DatabaseType, MigrationConfig, MigrationConfigBuilder};
pub use error::{MigrationError, Result};
pub use executor::{AppliedStep, PlanExecutor, RunSummary};
pub use migration::{Direction, Migration, MigrationBuilder, MigrationSet};
pub use migrator::Migrator;
pub use planner::{plan_to, Plan, PlanStep};
pub use pool::DatabasePool;
pub use source::{DirectorySource, MigrationSource, StaticSource, SECTION_DELIMITER};
pub use status::{StatusEntry, StatusReport};
pub use version_store::VersionStore;

/// Re-export sqlx types for convenience
pub use sqlx;
