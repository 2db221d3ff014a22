//! Migration file fixtures

use migrator_core::SECTION_DELIMITER;

/// Single-file migration with an up and a down section.
pub fn single_file(up: &str, down: &str) -> String {
    format!("{up}\n{SECTION_DELIMITER}\n{down}\n")
}

/// Three reversible migrations in mixed layouts:
/// `users` table, `email` column, `posts` table.
pub fn blog_migrations() -> Vec<(&'static str, String)> {
    vec![
        (
            "001_create_users.up.sql",
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);".to_string(),
        ),
        ("001_create_users.down.sql", "DROP TABLE users;".to_string()),
        (
            "002_add_email.sql",
            single_file(
                "ALTER TABLE users ADD COLUMN email TEXT;\nCREATE UNIQUE INDEX idx_users_email ON users(email);",
                "DROP INDEX idx_users_email;\nALTER TABLE users DROP COLUMN email;",
            ),
        ),
        (
            "003_create_posts.sql",
            single_file(
                "CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id), body TEXT);",
                "DROP TABLE posts;",
            ),
        ),
    ]
}

/// Borrow fixture pairs in the form `TestDatabase::with_files` takes.
pub fn as_files<'a>(files: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    files.iter().map(|(name, sql)| (*name, sql.as_str())).collect()
}
