//! CLI argument definitions using clap.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use migrator_core::{MigrationConfig, MigrationConfigBuilder};
use std::path::PathBuf;
use tracing::debug;

use crate::commands;

/// Schema migrator - versioned SQL migrations for PostgreSQL and SQLite
#[derive(Parser, Debug)]
#[command(name = "migrator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (TOML or YAML)
    #[arg(short, long, env = "MIGRATOR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Database URL
    #[arg(short = 'd', long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    /// Directory containing migration files
    #[arg(short = 'm', long, env = "MIGRATIONS_DIR", global = true)]
    pub migrations: Option<PathBuf>,

    /// Version table name
    #[arg(long, env = "MIGRATOR_TABLE", global = true)]
    pub table: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the current version and every known migration
    #[command(visible_alias = "info")]
    Status(commands::status::StatusArgs),

    /// Migrate to the latest version, or to a given one
    #[command(visible_alias = "up")]
    Migrate(commands::migrate::MigrateArgs),

    /// Create a new migration file
    New(commands::new::NewArgs),

    /// Check the migration directory without connecting
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        let config = self.base_config()?;
        match self.command {
            Commands::Status(args) => {
                commands::status::execute(args, Self::finish(config)?, self.json).await
            }
            Commands::Migrate(args) => {
                commands::migrate::execute(args, Self::finish(config)?, self.json).await
            }
            Commands::New(args) => commands::new::execute(args, &config, self.json).await,
            Commands::Validate(args) => {
                commands::validate::execute(args, &config, self.json).await
            }
        }
    }

    /// Configuration file (if any) overlaid with flags and environment.
    fn base_config(&self) -> Result<MigrationConfig> {
        let mut builder = match &self.config {
            Some(path) => MigrationConfigBuilder::from_config(
                MigrationConfig::from_file(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
            ),
            None => MigrationConfigBuilder::new(),
        };

        if let Some(url) = &self.database_url {
            builder = builder.database_url(url);
        }
        if let Some(dir) = &self.migrations {
            builder = builder.migrations_dir(dir);
        }
        if let Some(table) = &self.table {
            builder = builder.table_name(table);
        }

        // Validation is deferred: `new` and `validate` work without a database URL.
        let config = builder.into_config();
        debug!(
            config_file = ?self.config,
            database = %config.database_type,
            migrations_dir = %config.migrations_dir.display(),
            table = %config.table_name,
            "Resolved configuration"
        );
        Ok(config)
    }

    fn finish(config: MigrationConfig) -> Result<MigrationConfig> {
        config
            .validate()
            .context("DATABASE_URL environment variable or --database-url required")?;
        Ok(config)
    }
}
