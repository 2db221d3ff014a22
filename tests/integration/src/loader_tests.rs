//! Migration directory loading tests

use crate::fixtures::*;
use crate::helpers::*;
use migrator_core::{MigrationConfig, MigrationError, MigrationSource, Migrator};

/// Whatever order files are written in, the set comes back ascending.
#[tokio::test]
async fn test_loaded_set_is_sorted_and_unique() {
    let db = TestDatabase::new();
    for seq in [7, 3, 12, 1, 9, 4] {
        db.write(
            &format!("{seq:03}_step_{seq}.sql"),
            &format!("CREATE TABLE t{seq} (id INTEGER);"),
        );
    }

    let set = db.source().load_all().await.unwrap();
    let sequences: Vec<i64> = set.iter().map(|m| m.sequence).collect();

    assert_eq!(sequences, vec![1, 3, 4, 7, 9, 12]);
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
}

/// Gaps in numbering are allowed and migrate in order.
#[tokio::test]
async fn test_sparse_sequences_migrate() {
    let db = TestDatabase::with_files(&[
        ("010_a.sql", "CREATE TABLE a (id INTEGER);"),
        ("020_b.sql", "CREATE TABLE b (id INTEGER);"),
    ]);
    let migrator = db.migrator().await;

    migrator.migrate_to(10).await.unwrap();
    assert_eq!(migrator.current_version().await.unwrap(), 10);

    let err = migrator.migrate_to(15).await.unwrap_err();
    assert!(matches!(err, MigrationError::UnknownVersion { version: 15, .. }));
}

/// Opening a migrator on a missing directory fails before connecting.
#[tokio::test]
async fn test_missing_directory() {
    let db = TestDatabase::new();
    let config = MigrationConfig {
        migrations_dir: db.root().join("does-not-exist"),
        ..db.config()
    };

    let err = Migrator::open(config).await.unwrap_err();
    assert!(matches!(err, MigrationError::NotFound { .. }));
}

/// Duplicate sequence numbers name both files.
#[tokio::test]
async fn test_duplicate_sequence() {
    let db = TestDatabase::with_files(&[
        ("002_users.sql", "CREATE TABLE users (id INTEGER);"),
        ("02_accounts.sql", "CREATE TABLE accounts (id INTEGER);"),
    ]);

    let err = db.source().load_all().await.unwrap_err();
    match err {
        MigrationError::Conflict {
            sequence,
            first,
            second,
        } => {
            assert_eq!(sequence, 2);
            assert!(first.contains("users") || second.contains("users"));
            assert!(first.contains("accounts") || second.contains("accounts"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Malformed names are reported with the offending file.
#[tokio::test]
async fn test_malformed_file_name() {
    let db = TestDatabase::with_files(&[
        ("001_users.sql", "CREATE TABLE users (id INTEGER);"),
        ("add posts.sql", "CREATE TABLE posts (id INTEGER);"),
    ]);

    let err = db.source().load_all().await.unwrap_err();
    match err {
        MigrationError::Malformed { file, .. } => assert_eq!(file, "add posts.sql"),
        other => panic!("unexpected error: {other}"),
    }
}

/// Pair and single-file layouts load to the same migrations.
#[tokio::test]
async fn test_layouts_are_equivalent() {
    let pair = TestDatabase::with_files(&[
        ("001_users.up.sql", "CREATE TABLE users (id INTEGER);\n"),
        ("001_users.down.sql", "DROP TABLE users;\n"),
    ]);
    let single = TestDatabase::with_files(&[(
        "001_users.sql",
        &single_file("CREATE TABLE users (id INTEGER);", "DROP TABLE users;"),
    )]);

    let pair_set = pair.source().load_all().await.unwrap();
    let single_set = single.source().load_all().await.unwrap();

    let a = pair_set.get(1).unwrap();
    let b = single_set.get(1).unwrap();
    assert_eq!(a.name, b.name);
    assert_eq!(a.up_sql.trim(), b.up_sql.trim());
    assert_eq!(
        a.down_sql.as_deref().map(str::trim),
        b.down_sql.as_deref().map(str::trim)
    );
}
