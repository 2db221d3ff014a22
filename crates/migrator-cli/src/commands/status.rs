//! Status command - show the current version and every known migration.

use anyhow::{Context, Result};
use clap::Args;
use migrator_core::{MigrationConfig, Migrator, StatusEntry, StatusReport};
use tabled::Tabled;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the plain arrow table only
    #[arg(long)]
    pub plain: bool,
}

/// Table row for text output.
#[derive(Debug, Tabled)]
struct StatusRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Version")]
    sequence: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Applied")]
    applied: &'static str,
    #[tabled(rename = "Revertible")]
    reversible: &'static str,
}

impl From<&StatusEntry> for StatusRow {
    fn from(entry: &StatusEntry) -> Self {
        Self {
            marker: if entry.current { "->" } else { "" },
            sequence: entry.sequence,
            name: entry.name.clone(),
            applied: if entry.applied { "✓" } else { "○" },
            reversible: if entry.reversible { "✓" } else { "✗" },
        }
    }
}

/// Execute the status command.
pub async fn execute(args: StatusArgs, config: MigrationConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);

    let migrator = Migrator::open(config)
        .await
        .context("Failed to initialise migrator")?;
    let report = migrator
        .status()
        .await
        .context("Failed to read migration status")?;
    migrator.pool().close().await;

    match format {
        OutputFormat::Json => CommandResult::success(report).print(format)?,
        OutputFormat::Text if args.plain => print!("{}", report.table()),
        OutputFormat::Text => print_text(&report),
    }

    Ok(())
}

fn print_text(report: &StatusReport) {
    output::section("Migration Status");
    output::key_value("Current version", &report.current_version.to_string());
    output::key_value("Latest version", &report.max_version.to_string());
    output::key_value("Pending", &report.pending_count().to_string());
    println!();

    let rows: Vec<StatusRow> = report.migrations.iter().map(StatusRow::from).collect();
    output::table(&rows);

    if report.is_up_to_date() {
        output::success("Database is up to date");
    } else if !report.current_known {
        output::warning(&format!(
            "Database version {} does not match any known migration",
            report.current_version
        ));
    }
}
