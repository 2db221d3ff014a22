//! Migrate command - move the database to the latest or a given version.

use anyhow::{Context, Result};
use clap::Args;
use migrator_core::{MigrationConfig, Migrator, Plan, RunSummary};
use serde::Serialize;
use tracing::warn;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the migrate command.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Target version; 0 reverts every migration. Defaults to the latest
    #[arg(long, value_name = "VERSION", allow_negative_numbers = true)]
    pub to: Option<i64>,

    /// Dry run - show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

/// One planned step.
#[derive(Debug, Serialize)]
pub struct PlannedStep {
    pub sequence: i64,
    pub name: String,
    pub direction: String,
    pub version_after: i64,
}

/// Dry-run output.
#[derive(Debug, Serialize)]
pub struct PlanOutput {
    pub dry_run: bool,
    pub from_version: i64,
    pub to_version: i64,
    pub steps: Vec<PlannedStep>,
}

impl From<&Plan<'_>> for PlanOutput {
    fn from(plan: &Plan<'_>) -> Self {
        Self {
            dry_run: true,
            from_version: plan.from,
            to_version: plan.to,
            steps: plan
                .steps()
                .iter()
                .map(|s| PlannedStep {
                    sequence: s.migration.sequence,
                    name: s.migration.name.clone(),
                    direction: s.direction.to_string(),
                    version_after: s.version_after,
                })
                .collect(),
        }
    }
}

/// Execute the migrate command.
pub async fn execute(args: MigrateArgs, config: MigrationConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);

    let migrator = Migrator::open(config)
        .await
        .context("Failed to initialise migrator")?;

    let result = if args.dry_run {
        execute_dry_run(&migrator, args.to, format).await
    } else {
        execute_run(&migrator, args.to, format).await
    };

    migrator.pool().close().await;
    result
}

async fn execute_dry_run(migrator: &Migrator, to: Option<i64>, format: OutputFormat) -> Result<()> {
    let plan = migrator.plan(to).await.context("Failed to plan migration")?;
    let planned = PlanOutput::from(&plan);

    match format {
        OutputFormat::Json => CommandResult::success(planned).print(format)?,
        OutputFormat::Text => {
            if planned.steps.is_empty() {
                output::info(&format!(
                    "Dry run - already at version {}",
                    planned.from_version
                ));
            } else {
                output::info(&format!(
                    "Dry run - {} step(s) from version {} to {}:",
                    planned.steps.len(),
                    planned.from_version,
                    planned.to_version
                ));
                for s in &planned.steps {
                    output::key_value(
                        &format!("{:>3} {}", s.sequence, s.direction),
                        &s.name,
                    );
                }
            }
        }
    }

    Ok(())
}

async fn execute_run(migrator: &Migrator, to: Option<i64>, format: OutputFormat) -> Result<()> {
    let spinner = (format == OutputFormat::Text).then(|| output::spinner("Migrating..."));

    let result = match to {
        Some(version) => migrator.migrate_to(version).await,
        None => migrator.migrate_to_latest().await,
    };

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            // Steps committed before the failure stay applied.
            if let Ok(version) = migrator.current_version().await {
                warn!(version, "Migration run stopped, earlier steps stay applied");
                if format == OutputFormat::Text {
                    output::warning(&format!("Database left at version {version}"));
                }
            }
            return Err(e).context("Migration failed");
        }
    };

    match format {
        OutputFormat::Json => CommandResult::success(&summary)
            .with_message(format!(
                "Applied {} step(s), version {} -> {}",
                summary.applied_count(),
                summary.from_version,
                summary.to_version
            ))
            .print(format)?,
        OutputFormat::Text => print_summary(&summary),
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if summary.steps.is_empty() {
        output::success(&format!(
            "Already at version {}, nothing to do",
            summary.to_version
        ));
        return;
    }

    output::success(&format!(
        "Applied {} step(s), version {} -> {} in {}",
        summary.applied_count(),
        summary.from_version,
        summary.to_version,
        output::format_millis(summary.total_time_ms())
    ));
    for s in &summary.steps {
        output::key_value(
            &format!("{:>3} {}", s.sequence, s.direction),
            &format!("{} ({}ms)", s.name, s.execution_time_ms),
        );
    }
}
