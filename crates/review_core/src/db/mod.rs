//! SQLite bootstrap for the review mapper and its collaborator schema.
//!
//! # Responsibility
//! - Open and configure SQLite connections.
//! - Create and verify the tables reviews depend on (`departments`,
//!   `employees`); `reviews` itself belongs to the mapper.
//!
//! # Invariants
//! - A connection handed to the mapper has passed `verify_schema`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage bootstrap and transport errors.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A registered migration script failed; nothing from the batch was kept.
    MigrationFailed {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The file was written by a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The connection was not opened through `open_db*`.
    SchemaNotMigrated {
        expected_version: u32,
        actual_version: u32,
    },
    /// A table reviews reference is absent despite a current version.
    MissingCollaboratorTable(&'static str),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::MigrationFailed {
                version,
                name,
                source,
            } => write!(f, "migration {version} ({name}) failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaNotMigrated {
                expected_version,
                actual_version,
            } => write!(
                f,
                "reviews need schema version {expected_version}, connection is at {actual_version}"
            ),
            Self::MissingCollaboratorTable(table) => {
                write!(f, "reviews need table `{table}`, which is missing")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::MigrationFailed { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::SchemaNotMigrated { .. }
            | Self::MissingCollaboratorTable(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
