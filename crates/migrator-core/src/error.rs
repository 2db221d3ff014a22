//! Migration error types.

use crate::migration::Direction;
use std::path::PathBuf;

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;

/// Migration error type.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Migration directory does not exist.
    #[error("Migration directory does not exist: {}", path.display())]
    NotFound {
        /// Directory that was looked up.
        path: PathBuf,
    },

    /// A migration definition could not be parsed.
    #[error("Malformed migration {file}: {reason}")]
    Malformed {
        /// Offending file (or in-memory migration label).
        file: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two migrations share a sequence number.
    #[error("Duplicate migration sequence {sequence}: {first} and {second}")]
    Conflict {
        /// Shared sequence number.
        sequence: i64,
        /// First definition seen.
        first: String,
        /// Second definition seen.
        second: String,
    },

    /// Revert requested through a migration without a down body.
    #[error("Migration {sequence} ({name}) cannot be reverted: no down SQL")]
    Irreversible {
        /// Migration sequence.
        sequence: i64,
        /// Migration name.
        name: String,
    },

    /// Version is neither 0 nor a known sequence.
    #[error("Unknown migration version {version} (latest known is {max})")]
    UnknownVersion {
        /// Requested or recorded version.
        version: i64,
        /// Highest loaded sequence.
        max: i64,
    },

    /// Database connection or transport error.
    #[error("Database connection error: {0}")]
    Connection(String),

    /// A migration step failed and was rolled back.
    #[error("Migration {sequence} ({name}) failed while migrating {direction}: {reason}")]
    Execution {
        /// Failing migration sequence.
        sequence: i64,
        /// Failing migration name.
        name: String,
        /// Phase the step was running in.
        direction: Direction,
        /// Database error message.
        reason: String,
    },

    /// Bookkeeping table statement failed.
    #[error("Version table error: {0}")]
    Bookkeeping(String),

    /// Lock acquisition failed.
    #[error("Failed to acquire migration lock: {0}")]
    LockFailed(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a malformed-migration error.
    pub fn malformed(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Sequence number of the migration the error is about, if any.
    #[must_use]
    pub fn sequence(&self) -> Option<i64> {
        match self {
            Self::Conflict { sequence, .. }
            | Self::Irreversible { sequence, .. }
            | Self::Execution { sequence, .. } => Some(*sequence),
            Self::UnknownVersion { version, .. } => Some(*version),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for MigrationError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(e) => Self::Config(e.to_string()),
            sqlx::Error::Io(e) => Self::Connection(e.to_string()),
            sqlx::Error::Tls(e) => Self::Connection(e.to_string()),
            sqlx::Error::PoolTimedOut => Self::Connection("Connection pool timed out".to_string()),
            sqlx::Error::PoolClosed => Self::Connection("Connection pool is closed".to_string()),
            _ => Self::Bookkeeping(err.to_string()),
        }
    }
}
