//! End-to-end migration scenarios against SQLite

use crate::fixtures::*;
use crate::helpers::*;
use migrator_core::{Direction, MigrationError, MigrationSource, Migrator};
use pretty_assertions::assert_eq;

async fn blog_db() -> (TestDatabase, Migrator) {
    let files = blog_migrations();
    let db = TestDatabase::with_files(&as_files(&files));
    let migrator = db.migrator().await;
    (db, migrator)
}

/// Migrating to 2 from scratch applies 1 then 2 and leaves 3 alone.
#[tokio::test]
async fn test_migrate_to_middle_version() {
    let (_db, migrator) = blog_db().await;

    let summary = migrator.migrate_to(2).await.unwrap();

    let steps: Vec<(i64, Direction)> = summary
        .steps
        .iter()
        .map(|s| (s.sequence, s.direction))
        .collect();
    assert_eq!(steps, vec![(1, Direction::Up), (2, Direction::Up)]);
    assert_eq!(migrator.current_version().await.unwrap(), 2);
    assert!(table_exists(&migrator, "users").await);
    assert!(!table_exists(&migrator, "posts").await);
}

/// Migrating to 0 from 2 reverts 2 then 1.
#[tokio::test]
async fn test_revert_everything() {
    let (_db, migrator) = blog_db().await;
    migrator.migrate_to(2).await.unwrap();

    let summary = migrator.migrate_to(0).await.unwrap();

    let steps: Vec<(i64, Direction, i64)> = summary
        .steps
        .iter()
        .map(|s| (s.sequence, s.direction, s.version_after))
        .collect();
    assert_eq!(
        steps,
        vec![(2, Direction::Down, 1), (1, Direction::Down, 0)]
    );
    assert_eq!(migrator.current_version().await.unwrap(), 0);
    assert!(!table_exists(&migrator, "users").await);
}

/// Asking for a version beyond the known set fails without side effects.
#[tokio::test]
async fn test_unknown_version_leaves_database() {
    let (_db, migrator) = blog_db().await;
    migrator.migrate_to(1).await.unwrap();

    let err = migrator.migrate_to(5).await.unwrap_err();

    assert!(matches!(
        err,
        MigrationError::UnknownVersion { version: 5, max: 3 }
    ));
    assert_eq!(migrator.current_version().await.unwrap(), 1);
    assert!(!table_exists(&migrator, "posts").await);
}

/// Up to the latest and back to zero ends where it started.
#[tokio::test]
async fn test_round_trip() {
    let (_db, migrator) = blog_db().await;

    let up = migrator.migrate_to_latest().await.unwrap();
    assert_eq!(up.applied_count(), 3);
    assert_eq!(migrator.current_version().await.unwrap(), 3);

    let down = migrator.migrate_to(0).await.unwrap();
    assert_eq!(down.applied_count(), 3);
    assert_eq!(migrator.current_version().await.unwrap(), 0);

    // And up again, proving the downs really undid the schema.
    migrator.migrate_to_latest().await.unwrap();
    assert!(table_exists(&migrator, "posts").await);
}

/// Running at the current version does nothing.
#[tokio::test]
async fn test_same_version_is_noop() {
    let (_db, migrator) = blog_db().await;
    migrator.migrate_to(2).await.unwrap();

    let summary = migrator.migrate_to(2).await.unwrap();
    assert_eq!(summary.applied_count(), 0);
    assert_eq!(summary.from_version, 2);
}

/// Version state lives in the database, not in the migrator.
#[tokio::test]
async fn test_version_persists_across_migrators() {
    let (db, migrator) = blog_db().await;
    migrator.migrate_to(2).await.unwrap();
    migrator.pool().close().await;

    let reopened = db.migrator().await;
    assert_eq!(reopened.current_version().await.unwrap(), 2);

    let summary = reopened.migrate_to_latest().await.unwrap();
    let sequences: Vec<i64> = summary.steps.iter().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![3]);
}

/// Status marks the current migration and the human-readable table.
#[tokio::test]
async fn test_status_report() {
    let (_db, migrator) = blog_db().await;
    migrator.migrate_to(2).await.unwrap();

    let report = migrator.status().await.unwrap();

    assert_eq!(report.current_version, 2);
    assert_eq!(report.max_version, 3);
    assert_eq!(
        report.table(),
        "     1 create_users\n->   2 add_email\n     3 create_posts\n"
    );
}

/// Dry-run plans do not touch the version.
#[tokio::test]
async fn test_plan_does_not_migrate() {
    let (_db, migrator) = blog_db().await;

    let plan = migrator.plan(Some(3)).await.unwrap();
    assert_eq!(plan.len(), 3);
    assert_eq!(migrator.current_version().await.unwrap(), 0);
    assert!(!table_exists(&migrator, "users").await);
}

/// A custom version table name is used and kept separate.
#[tokio::test]
async fn test_custom_version_table() {
    let files = blog_migrations();
    let db = TestDatabase::with_files(&as_files(&files));
    let mut config = db.config();
    config.table_name = "schema_version".to_string();

    let migrator = Migrator::open(config).await.unwrap();
    migrator.migrate_to(1).await.unwrap();

    assert!(table_exists(&migrator, "schema_version").await);
    assert!(!table_exists(&migrator, "db_version").await);
}

/// Directory and in-memory sources are interchangeable.
#[tokio::test]
async fn test_static_source_matches_directory() {
    let files = blog_migrations();
    let db = TestDatabase::with_files(&as_files(&files));
    let from_dir = db.source().load_all().await.unwrap();

    let static_source = migrator_core::StaticSource::new(from_dir.iter().cloned());
    let migrator = Migrator::connect(db.config(), &static_source).await.unwrap();

    assert_eq!(migrator.migrations(), &from_dir);
    migrator.migrate_to_latest().await.unwrap();
    assert_eq!(migrator.current_version().await.unwrap(), 3);
}
