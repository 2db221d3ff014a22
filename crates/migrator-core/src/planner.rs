//! Migration planning.

use crate::error::{MigrationError, Result};
use crate::migration::{Direction, Migration, MigrationSet};
use std::cmp::Ordering;

/// One step of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanStep<'a> {
    /// Migration this step runs.
    pub migration: &'a Migration,
    /// Which body runs.
    pub direction: Direction,
    /// SQL executed by the step.
    pub sql: &'a str,
    /// Version recorded once the step commits.
    pub version_after: i64,
}

/// Ordered steps that move the database from one version to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan<'a> {
    /// Version the plan starts from.
    pub from: i64,
    /// Version the plan ends at.
    pub to: i64,
    steps: Vec<PlanStep<'a>>,
}

impl<'a> Plan<'a> {
    /// Steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[PlanStep<'a>] {
        &self.steps
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Direction of the plan, `None` when empty.
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        self.steps.first().map(|s| s.direction)
    }
}

/// Compute the steps between `current` and `target`.
///
/// Both versions must be 0 or a sequence present in `migrations`. A revert
/// fails up front with [`MigrationError::Irreversible`] if any migration it
/// passes through has no down SQL.
pub fn plan_to(current: i64, target: i64, migrations: &MigrationSet) -> Result<Plan<'_>> {
    let max = migrations.max_sequence();
    for version in [target, current] {
        if !migrations.is_known_version(version) {
            return Err(MigrationError::UnknownVersion { version, max });
        }
    }

    let steps = match target.cmp(&current) {
        Ordering::Equal => Vec::new(),
        Ordering::Greater => migrations
            .iter()
            .filter(|m| m.sequence > current && m.sequence <= target)
            .map(|m| PlanStep {
                migration: m,
                direction: Direction::Up,
                sql: &m.up_sql,
                version_after: m.sequence,
            })
            .collect(),
        Ordering::Less => migrations
            .iter()
            .rev()
            .filter(|m| m.sequence > target && m.sequence <= current)
            .map(|m| {
                let sql = m.down_sql.as_deref().ok_or_else(|| MigrationError::Irreversible {
                    sequence: m.sequence,
                    name: m.name.clone(),
                })?;
                Ok(PlanStep {
                    migration: m,
                    direction: Direction::Down,
                    sql,
                    version_after: migrations.predecessor(m.sequence),
                })
            })
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(Plan {
        from: current,
        to: target,
        steps,
    })
}
