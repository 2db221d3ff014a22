//! Plan execution.

use crate::error::{MigrationError, Result};
use crate::migration::Direction;
use crate::planner::{Plan, PlanStep};
use crate::version_store::VersionStore;
use serde::Serialize;
use sqlx::{AnyConnection, Connection};
use std::time::Instant;
use tracing::{error, info, warn};

/// A step that ran and committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedStep {
    /// Migration sequence.
    pub sequence: i64,
    /// Migration name.
    pub name: String,
    /// Which body ran.
    pub direction: Direction,
    /// Version recorded by the step.
    pub version_after: i64,
    /// Execution time in milliseconds.
    pub execution_time_ms: u64,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Version before the run.
    pub from_version: i64,
    /// Version after the run.
    pub to_version: i64,
    /// Steps in the order they ran.
    pub steps: Vec<AppliedStep>,
}

impl RunSummary {
    /// Number of steps applied.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.steps.len()
    }

    /// Total execution time in milliseconds.
    #[must_use]
    pub fn total_time_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.execution_time_ms).sum()
    }
}

/// Runs plans on one connection.
///
/// Every step is its own transaction containing the step body and the
/// version update. A failing step is rolled back and stops the run; steps
/// committed before it stay applied.
pub struct PlanExecutor<'c> {
    conn: &'c mut AnyConnection,
    store: &'c VersionStore,
}

impl<'c> PlanExecutor<'c> {
    /// Create an executor on `conn` recording versions in `store`.
    pub fn new(conn: &'c mut AnyConnection, store: &'c VersionStore) -> Self {
        Self { conn, store }
    }

    /// Apply every step of `plan` in order.
    pub async fn apply(&mut self, plan: &Plan<'_>) -> Result<RunSummary> {
        if plan.is_empty() {
            info!(version = plan.from, "Database is already at the target version");
        } else {
            info!(
                from = plan.from,
                to = plan.to,
                steps = plan.len(),
                "Running migration plan"
            );
        }

        let mut steps = Vec::with_capacity(plan.len());
        for step in plan.steps() {
            steps.push(self.apply_step(step).await?);
        }

        Ok(RunSummary {
            from_version: plan.from,
            to_version: plan.to,
            steps,
        })
    }

    async fn apply_step(&mut self, step: &PlanStep<'_>) -> Result<AppliedStep> {
        let migration = step.migration;
        let fail = |reason: String| MigrationError::Execution {
            sequence: migration.sequence,
            name: migration.name.clone(),
            direction: step.direction,
            reason,
        };

        info!(
            sequence = migration.sequence,
            name = %migration.name,
            direction = %step.direction,
            "Running migration"
        );
        let start = Instant::now();

        let mut tx = self
            .conn
            .begin()
            .await
            .map_err(|e| fail(format!("begin transaction: {e}")))?;

        let outcome = match sqlx::raw_sql(step.sql).execute(&mut *tx).await {
            Ok(_) => self
                .store
                .set_version(&mut tx, step.version_after)
                .await
                .map_err(|e| fail(format!("record version {}: {e}", step.version_after))),
            Err(e) => Err(fail(e.to_string())),
        };

        if let Err(e) = outcome {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(
                    sequence = migration.sequence,
                    error = %rollback_err,
                    "Rollback after failed migration also failed"
                );
            }
            error!(
                sequence = migration.sequence,
                name = %migration.name,
                direction = %step.direction,
                error = %e,
                "Migration failed"
            );
            return Err(e);
        }

        tx.commit()
            .await
            .map_err(|e| fail(format!("commit: {e}")))?;

        let execution_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            sequence = migration.sequence,
            name = %migration.name,
            direction = %step.direction,
            version = step.version_after,
            execution_time_ms,
            "Migration applied"
        );

        Ok(AppliedStep {
            sequence: migration.sequence,
            name: migration.name.clone(),
            direction: step.direction,
            version_after: step.version_after,
            execution_time_ms,
        })
    }
}
