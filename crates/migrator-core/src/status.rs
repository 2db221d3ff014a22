//! Migration status reporting.

use crate::migration::MigrationSet;
use serde::Serialize;
use std::fmt::Write;

/// Status of one loaded migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Migration sequence.
    pub sequence: i64,
    /// Migration name.
    pub name: String,
    /// Whether the migration is at or below the current version.
    pub applied: bool,
    /// Whether this migration equals the current version.
    pub current: bool,
    /// Whether the migration has down SQL.
    pub reversible: bool,
    /// Checksum of the up SQL.
    pub checksum: String,
}

/// Current version alongside every loaded migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Version recorded in the database.
    pub current_version: i64,
    /// Highest loaded sequence, 0 when there are none.
    pub max_version: i64,
    /// Whether the current version is 0 or a loaded sequence.
    pub current_known: bool,
    /// One entry per migration, ascending.
    pub migrations: Vec<StatusEntry>,
}

impl StatusReport {
    /// Build a report for `current_version` against `migrations`.
    #[must_use]
    pub fn new(current_version: i64, migrations: &MigrationSet) -> Self {
        let entries = migrations
            .iter()
            .map(|m| StatusEntry {
                sequence: m.sequence,
                name: m.name.clone(),
                applied: m.sequence <= current_version,
                current: m.sequence == current_version,
                reversible: m.is_reversible(),
                checksum: m.checksum.clone(),
            })
            .collect();

        Self {
            current_version,
            max_version: migrations.max_sequence(),
            current_known: migrations.is_known_version(current_version),
            migrations: entries,
        }
    }

    /// Whether the database is at the highest loaded version.
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.current_version == self.max_version
    }

    /// Number of migrations above the current version.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.migrations.iter().filter(|m| !m.applied).count()
    }

    /// Plain-text table, one line per migration with `->` marking the
    /// current version.
    #[must_use]
    pub fn table(&self) -> String {
        let mut out = String::new();
        for m in &self.migrations {
            let indicator = if m.current { "->" } else { "" };
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{indicator:>2} {:>3} {}", m.sequence, m.name);
        }
        out
    }
}
