//! Migration sources.
//!
//! A [`MigrationSource`] produces a validated [`MigrationSet`]. The
//! filesystem implementation understands two layouts:
//!
//! - `<sequence>_<name>.up.sql` with an optional `<sequence>_<name>.down.sql`
//! - `<sequence>_<name>.sql` where the line `---- create above / drop below ----`
//!   separates the up SQL from the down SQL

use crate::error::{MigrationError, Result};
use crate::migration::{Migration, MigrationSet};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Line separating up and down SQL in single-file migrations.
pub const SECTION_DELIMITER: &str = "---- create above / drop below ----";

static FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+)_([A-Za-z0-9_\-]+)(\.up|\.down)?\.sql$").expect("valid migration file regex")
});

static MIGRATION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("valid migration name regex"));

/// Something that can produce the full, ordered set of migrations.
#[async_trait]
pub trait MigrationSource: Send + Sync {
    /// Load every migration, sorted ascending by sequence.
    async fn load_all(&self) -> Result<MigrationSet>;
}

/// Migrations defined in code.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    migrations: Vec<Migration>,
}

impl StaticSource {
    /// Wrap a list of migrations.
    #[must_use]
    pub fn new(migrations: impl IntoIterator<Item = Migration>) -> Self {
        Self {
            migrations: migrations.into_iter().collect(),
        }
    }
}

#[async_trait]
impl MigrationSource for StaticSource {
    async fn load_all(&self) -> Result<MigrationSet> {
        MigrationSet::new(self.migrations.clone())
    }
}

/// Migrations read from `.sql` files in a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
}

impl DirectorySource {
    /// Create a source for the given directory.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Directory this source reads from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_exists(&self) -> Result<()> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(MigrationError::NotFound {
                path: self.path.clone(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(MigrationError::NotFound {
                path: self.path.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a new single-file migration numbered one past the highest
    /// existing sequence and return its path.
    pub async fn create(&self, name: &str) -> Result<PathBuf> {
        if !MIGRATION_NAME.is_match(name) {
            return Err(MigrationError::malformed(
                name,
                "name may only contain letters, digits, '_' and '-'",
            ));
        }

        let existing = self.load_all().await?;
        let sequence = existing.max_sequence().checked_add(1).ok_or_else(|| {
            MigrationError::malformed(name, "no sequence number left after the highest existing one")
        })?;
        let path = self.path.join(format!("{sequence:03}_{name}.sql"));

        let template = format!(
            "-- Write your migration here.\n\n{SECTION_DELIMITER}\n\n-- Write the revert here, or leave empty if irreversible.\n"
        );
        tokio::fs::write(&path, template).await?;

        debug!(sequence, path = %path.display(), "Created migration file");
        Ok(path)
    }
}

#[async_trait]
impl MigrationSource for DirectorySource {
    async fn load_all(&self) -> Result<MigrationSet> {
        self.ensure_exists().await?;

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with('.') || !file_name.ends_with(".sql") {
                continue;
            }
            files.push((file_name, entry.path()));
        }
        files.sort();

        let mut drafts: BTreeMap<i64, Draft> = BTreeMap::new();
        for (file_name, path) in files {
            let parsed = parse_file_name(&file_name)?;
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    return Err(MigrationError::malformed(file_name, "not valid UTF-8"));
                }
                Err(e) => return Err(e.into()),
            };
            drafts
                .entry(parsed.sequence)
                .or_insert_with(|| Draft::new(parsed.name.clone()))
                .add(parsed, file_name, contents)?;
        }

        let migrations = drafts
            .into_iter()
            .map(|(sequence, draft)| draft.finish(sequence))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            path = %self.path.display(),
            count = migrations.len(),
            "Loaded migrations from directory"
        );

        MigrationSet::new(migrations)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Single,
    Up,
    Down,
}

#[derive(Debug)]
struct ParsedName {
    sequence: i64,
    name: String,
    kind: FileKind,
}

fn parse_file_name(file_name: &str) -> Result<ParsedName> {
    let caps = FILE_NAME.captures(file_name).ok_or_else(|| {
        MigrationError::malformed(file_name, "expected <sequence>_<name>[.up|.down].sql")
    })?;

    let sequence: i64 = caps[1]
        .parse()
        .map_err(|_| MigrationError::malformed(file_name, "sequence number out of range"))?;
    if sequence == 0 {
        return Err(MigrationError::malformed(
            file_name,
            "sequence numbers start at 1",
        ));
    }

    let kind = match caps.get(3).map(|m| m.as_str()) {
        Some(".up") => FileKind::Up,
        Some(".down") => FileKind::Down,
        _ => FileKind::Single,
    };

    Ok(ParsedName {
        sequence,
        name: caps[2].to_string(),
        kind,
    })
}

/// Split a single-file migration into its up and down sections.
fn split_sections(contents: &str) -> (String, Option<String>) {
    let mut up = String::new();
    let mut down: Option<String> = None;

    for line in contents.split_inclusive('\n') {
        if down.is_none() && line.trim() == SECTION_DELIMITER {
            down = Some(String::new());
            continue;
        }
        match down.as_mut() {
            Some(down) => down.push_str(line),
            None => up.push_str(line),
        }
    }

    (up, down)
}

/// Migration pieces collected for one sequence number.
#[derive(Debug)]
struct Draft {
    name: String,
    up: Option<(String, String)>,
    down: Option<(String, String)>,
}

impl Draft {
    fn new(name: String) -> Self {
        Self {
            name,
            up: None,
            down: None,
        }
    }

    fn conflict(&self, sequence: i64, second: String) -> MigrationError {
        let first = self
            .up
            .as_ref()
            .or(self.down.as_ref())
            .map(|(file, _)| file.clone())
            .unwrap_or_default();
        MigrationError::Conflict {
            sequence,
            first,
            second,
        }
    }

    fn add(&mut self, parsed: ParsedName, file: String, contents: String) -> Result<()> {
        let occupied = self.up.is_some() || self.down.is_some();
        match parsed.kind {
            FileKind::Single => {
                if occupied {
                    return Err(self.conflict(parsed.sequence, file));
                }
                let (up, down) = split_sections(&contents);
                self.up = Some((file.clone(), up));
                self.down = down.map(|down| (file, down));
            }
            FileKind::Up | FileKind::Down => {
                let slot_taken = match parsed.kind {
                    FileKind::Up => self.up.is_some(),
                    _ => self.down.is_some(),
                };
                if slot_taken || (occupied && parsed.name != self.name) {
                    return Err(self.conflict(parsed.sequence, file));
                }
                let slot = if parsed.kind == FileKind::Up {
                    &mut self.up
                } else {
                    &mut self.down
                };
                *slot = Some((file, contents));
            }
        }
        Ok(())
    }

    fn finish(self, sequence: i64) -> Result<Migration> {
        let Some((up_file, up_sql)) = self.up else {
            let file = self.down.map(|(file, _)| file).unwrap_or_default();
            return Err(MigrationError::malformed(
                file,
                "down migration has no matching up migration",
            ));
        };

        if up_sql.trim().is_empty() {
            return Err(MigrationError::malformed(up_file, "up SQL is empty"));
        }

        let migration = Migration::new(sequence, self.name, up_sql);
        Ok(match self.down {
            Some((_, down_sql)) => migration.with_down(down_sql),
            None => migration,
        })
    }
}
