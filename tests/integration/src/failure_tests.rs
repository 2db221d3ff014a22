//! Failure handling tests
//!
//! A failing step rolls back on its own; earlier steps stay committed.

use crate::fixtures::*;
use crate::helpers::*;
use migrator_core::{Direction, MigrationError};

/// The version after a failed run is the last committed step's.
#[tokio::test]
async fn test_failed_step_keeps_previous_steps() {
    let db = TestDatabase::with_files(&[
        ("001_create_users.sql", "CREATE TABLE users (id INTEGER);"),
        ("002_create_posts.sql", "CREATE TABLE posts (id INTEGER);"),
        (
            "003_broken.sql",
            "CREATE TABLE comments (id INTEGER);\nINSERT INTO missing_table VALUES (1);",
        ),
        ("004_create_tags.sql", "CREATE TABLE tags (id INTEGER);"),
    ]);
    let migrator = db.migrator().await;

    let err = migrator.migrate_to_latest().await.unwrap_err();

    match &err {
        MigrationError::Execution {
            sequence,
            name,
            direction,
            ..
        } => {
            assert_eq!(*sequence, 3);
            assert_eq!(name, "broken");
            assert_eq!(*direction, Direction::Up);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().starts_with("Migration 3 (broken) failed"));

    assert_eq!(migrator.current_version().await.unwrap(), 2);
    assert!(table_exists(&migrator, "posts").await);
    // The failing step's own statements were rolled back...
    assert!(!table_exists(&migrator, "comments").await);
    // ...and nothing after it ran.
    assert!(!table_exists(&migrator, "tags").await);
}

/// After fixing the broken file, re-running picks up where it stopped.
#[tokio::test]
async fn test_rerun_after_fix() {
    let db = TestDatabase::with_files(&[
        ("001_create_users.sql", "CREATE TABLE users (id INTEGER);"),
        ("002_broken.sql", "CREATE TABLE oops (id INTEGER); SELEC 1;"),
    ]);
    let migrator = db.migrator().await;
    assert!(migrator.migrate_to_latest().await.is_err());
    assert_eq!(migrator.current_version().await.unwrap(), 1);
    migrator.pool().close().await;

    db.remove("002_broken.sql");
    db.write("002_fixed.sql", "CREATE TABLE oops (id INTEGER);");

    let migrator = db.migrator().await;
    let summary = migrator.migrate_to_latest().await.unwrap();
    assert_eq!(summary.from_version, 1);
    assert_eq!(summary.applied_count(), 1);
    assert_eq!(migrator.current_version().await.unwrap(), 2);
}

/// A failing down step stops the revert at the step above it.
#[tokio::test]
async fn test_failed_revert_step() {
    let db = TestDatabase::with_files(&[
        (
            "001_create_users.sql",
            &single_file("CREATE TABLE users (id INTEGER);", "DROP TABLE users;"),
        ),
        (
            "002_create_posts.sql",
            &single_file("CREATE TABLE posts (id INTEGER);", "DROP TABLE no_such_table;"),
        ),
        (
            "003_create_tags.sql",
            &single_file("CREATE TABLE tags (id INTEGER);", "DROP TABLE tags;"),
        ),
    ]);
    let migrator = db.migrator().await;
    migrator.migrate_to_latest().await.unwrap();

    let err = migrator.migrate_to(0).await.unwrap_err();

    assert!(matches!(
        err,
        MigrationError::Execution {
            sequence: 2,
            direction: Direction::Down,
            ..
        }
    ));
    assert_eq!(migrator.current_version().await.unwrap(), 2);
    assert!(!table_exists(&migrator, "tags").await);
    assert!(table_exists(&migrator, "users").await);
}

/// Reverting through a migration without down SQL is refused before
/// anything runs.
#[tokio::test]
async fn test_irreversible_revert_refused() {
    let db = TestDatabase::with_files(&[
        (
            "001_create_users.sql",
            &single_file("CREATE TABLE users (id INTEGER);", "DROP TABLE users;"),
        ),
        ("002_seed.sql", "INSERT INTO users VALUES (1);"),
        (
            "003_create_tags.sql",
            &single_file("CREATE TABLE tags (id INTEGER);", "DROP TABLE tags;"),
        ),
    ]);
    let migrator = db.migrator().await;
    migrator.migrate_to_latest().await.unwrap();

    let err = migrator.migrate_to(0).await.unwrap_err();

    assert!(matches!(
        err,
        MigrationError::Irreversible { sequence: 2, .. }
    ));
    assert_eq!(migrator.current_version().await.unwrap(), 3);
    // Step 3 is reversible but must not have run either.
    assert!(table_exists(&migrator, "tags").await);

    // Reverting only above the irreversible migration is fine.
    migrator.migrate_to(2).await.unwrap();
    assert!(!table_exists(&migrator, "tags").await);
}

/// A database ahead of the loaded files cannot be planned.
#[tokio::test]
async fn test_database_ahead_of_files() {
    let db = TestDatabase::with_files(&[
        ("001_a.sql", "CREATE TABLE a (id INTEGER);"),
        ("002_b.sql", "CREATE TABLE b (id INTEGER);"),
    ]);
    let migrator = db.migrator().await;
    migrator.migrate_to_latest().await.unwrap();
    migrator.pool().close().await;

    db.remove("002_b.sql");
    let migrator = db.migrator().await;

    let report = migrator.status().await.unwrap();
    assert_eq!(report.current_version, 2);
    assert_eq!(report.max_version, 1);
    assert!(!report.current_known);

    let err = migrator.migrate_to(1).await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::UnknownVersion { version: 2, max: 1 }
    ));
}
