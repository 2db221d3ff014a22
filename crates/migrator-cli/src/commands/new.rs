//! New command - create the next migration file.

use anyhow::{Context, Result};
use clap::Args;
use migrator_core::{DirectorySource, MigrationConfig};

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the new command.
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Migration name (letters, digits, '_' and '-')
    pub name: String,

    /// Create the migrations directory if it does not exist
    #[arg(long)]
    pub create_dir: bool,
}

/// Execute the new command.
pub async fn execute(args: NewArgs, config: &MigrationConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let dir = &config.migrations_dir;

    if args.create_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let path = DirectorySource::new(dir.clone())
        .create(&args.name)
        .await
        .context("Failed to create migration")?;

    match format {
        OutputFormat::Json => CommandResult::success(serde_json::json!({
            "path": path.display().to_string(),
        }))
        .print(format)?,
        OutputFormat::Text => {
            output::success(&format!("Created {}", path.display()));
            output::info("Write the up SQL above the delimiter line and the down SQL below it");
        }
    }

    Ok(())
}
