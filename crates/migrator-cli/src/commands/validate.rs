//! Validate command - load the migration directory without connecting.

use anyhow::{Context, Result};
use clap::Args;
use migrator_core::{DirectorySource, MigrationConfig, MigrationSource};
use serde::Serialize;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Fail if any migration has no down SQL
    #[arg(long)]
    pub strict: bool,
}

/// Validation output.
#[derive(Debug, Serialize)]
pub struct ValidationOutput {
    pub directory: String,
    pub total: usize,
    pub latest: i64,
    pub irreversible: Vec<i64>,
    pub migrations: Vec<MigrationInfo>,
}

/// Individual migration info.
#[derive(Debug, Serialize)]
pub struct MigrationInfo {
    pub sequence: i64,
    pub name: String,
    pub reversible: bool,
    pub checksum: String,
}

/// Execute the validate command.
pub async fn execute(args: ValidateArgs, config: &MigrationConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let source = DirectorySource::new(config.migrations_dir.clone());

    let set = source
        .load_all()
        .await
        .context("Migration directory is invalid")?;

    let migrations: Vec<MigrationInfo> = set
        .iter()
        .map(|m| MigrationInfo {
            sequence: m.sequence,
            name: m.name.clone(),
            reversible: m.is_reversible(),
            checksum: m.checksum.clone(),
        })
        .collect();
    let irreversible: Vec<i64> = migrations
        .iter()
        .filter(|m| !m.reversible)
        .map(|m| m.sequence)
        .collect();

    let summary = ValidationOutput {
        directory: source.path().display().to_string(),
        total: set.len(),
        latest: set.max_sequence(),
        irreversible,
        migrations,
    };

    match format {
        OutputFormat::Json => CommandResult::success(&summary).print(format)?,
        OutputFormat::Text => {
            output::section("Migrations");
            output::key_value("Directory", &summary.directory);
            output::key_value("Total", &summary.total.to_string());
            output::key_value("Latest", &summary.latest.to_string());
            println!();
            for m in &summary.migrations {
                let revert = if m.reversible { "✓" } else { "✗" };
                println!(
                    "  {:>3} {} [revert: {}] {}",
                    m.sequence,
                    m.name,
                    revert,
                    &m.checksum[..12]
                );
            }
        }
    }

    if args.strict && !summary.irreversible.is_empty() {
        anyhow::bail!(
            "Migrations without down SQL: {}",
            summary
                .irreversible
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    if format == OutputFormat::Text {
        output::success("All migrations are valid");
    }
    Ok(())
}
