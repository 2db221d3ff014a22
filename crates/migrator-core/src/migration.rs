//! Migration types and utilities.

use crate::error::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Direction a migration step runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Apply the up body.
    Up,
    /// Apply the down body.
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// A database migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Sequence number, unique within a set.
    pub sequence: i64,
    /// Migration name.
    pub name: String,
    /// SQL to apply the migration.
    pub up_sql: String,
    /// SQL to revert the migration (optional).
    pub down_sql: Option<String>,
    /// Checksum of the up SQL.
    pub checksum: String,
}

impl Migration {
    /// Create a new migration.
    #[must_use]
    pub fn new(sequence: i64, name: impl Into<String>, up_sql: impl Into<String>) -> Self {
        let up_sql = up_sql.into();
        let checksum = Self::compute_checksum(&up_sql);

        Self {
            sequence,
            name: name.into(),
            up_sql,
            down_sql: None,
            checksum,
        }
    }

    /// Create a migration builder.
    #[must_use]
    pub fn builder(sequence: i64, name: impl Into<String>) -> MigrationBuilder {
        MigrationBuilder::new(sequence, name)
    }

    /// Set the down SQL for revert. Blank SQL counts as no down body.
    #[must_use]
    pub fn with_down(mut self, down_sql: impl Into<String>) -> Self {
        let down_sql = down_sql.into();
        self.down_sql = (!down_sql.trim().is_empty()).then_some(down_sql);
        self
    }

    /// Compute checksum for SQL content.
    #[must_use]
    pub fn compute_checksum(sql: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(sql.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Check if revert is supported.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        self.down_sql.is_some()
    }

    /// SQL body for the given direction.
    #[must_use]
    pub fn sql(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Up => Some(&self.up_sql),
            Direction::Down => self.down_sql.as_deref(),
        }
    }

    /// Label used in error messages for in-memory migrations.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{:03}_{}", self.sequence, self.name)
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>3} {}", self.sequence, self.name)
    }
}

/// Builder for migrations.
#[derive(Debug)]
pub struct MigrationBuilder {
    sequence: i64,
    name: String,
    up_sql: String,
    down_sql: Option<String>,
}

impl MigrationBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(sequence: i64, name: impl Into<String>) -> Self {
        Self {
            sequence,
            name: name.into(),
            up_sql: String::new(),
            down_sql: None,
        }
    }

    /// Set the up SQL.
    #[must_use]
    pub fn up(mut self, sql: impl Into<String>) -> Self {
        self.up_sql = sql.into();
        self
    }

    /// Set the down SQL.
    #[must_use]
    pub fn down(mut self, sql: impl Into<String>) -> Self {
        self.down_sql = Some(sql.into());
        self
    }

    /// Build the migration.
    ///
    /// An empty up body is accepted here and rejected when the migration is
    /// placed in a [`MigrationSet`].
    #[must_use]
    pub fn build(self) -> Migration {
        let migration = Migration::new(self.sequence, self.name, self.up_sql);
        match self.down_sql {
            Some(down) => migration.with_down(down),
            None => migration,
        }
    }
}

/// Ordered, duplicate-free collection of migrations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSet {
    migrations: Vec<Migration>,
}

impl MigrationSet {
    /// Validate and sort a list of migrations.
    pub fn new(mut migrations: Vec<Migration>) -> Result<Self> {
        for m in &migrations {
            if m.sequence <= 0 {
                return Err(MigrationError::malformed(
                    m.label(),
                    "sequence must be a positive integer",
                ));
            }
            if m.up_sql.trim().is_empty() {
                return Err(MigrationError::malformed(m.label(), "up SQL is empty"));
            }
        }

        migrations.sort_by_key(|m| m.sequence);

        if let Some(pair) = migrations
            .windows(2)
            .find(|pair| pair[0].sequence == pair[1].sequence)
        {
            return Err(MigrationError::Conflict {
                sequence: pair[0].sequence,
                first: pair[0].label(),
                second: pair[1].label(),
            });
        }

        Ok(Self { migrations })
    }

    /// Migrations in ascending sequence order.
    #[must_use]
    pub fn as_slice(&self) -> &[Migration] {
        &self.migrations
    }

    /// Iterate in ascending sequence order.
    pub fn iter(&self) -> std::slice::Iter<'_, Migration> {
        self.migrations.iter()
    }

    /// Number of migrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Highest known sequence, 0 when empty.
    #[must_use]
    pub fn max_sequence(&self) -> i64 {
        self.migrations.last().map_or(0, |m| m.sequence)
    }

    /// Look up a migration by sequence.
    #[must_use]
    pub fn get(&self, sequence: i64) -> Option<&Migration> {
        self.migrations
            .binary_search_by_key(&sequence, |m| m.sequence)
            .ok()
            .map(|idx| &self.migrations[idx])
    }

    /// Whether `version` is 0 or a loaded sequence.
    #[must_use]
    pub fn is_known_version(&self, version: i64) -> bool {
        version == 0 || self.get(version).is_some()
    }

    /// Sequence immediately below `sequence`, 0 if none.
    #[must_use]
    pub fn predecessor(&self, sequence: i64) -> i64 {
        self.migrations
            .iter()
            .rev()
            .map(|m| m.sequence)
            .find(|&s| s < sequence)
            .unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a MigrationSet {
    type Item = &'a Migration;
    type IntoIter = std::slice::Iter<'a, Migration>;

    fn into_iter(self) -> Self::IntoIter {
        self.migrations.iter()
    }
}
