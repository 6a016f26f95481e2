//! Collaborator schema for reviews: versioned scripts and verification.
//!
//! # Invariants
//! - Scripts run in ascending `version` inside one transaction.
//! - `PRAGMA user_version` equals the last applied script.
//! - After migration every table in `COLLABORATOR_TABLES` exists.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

/// Tables the review mapper reads but does not own.
pub const COLLABORATOR_TABLES: &[&str] = &["departments", "employees"];

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "employee_directory",
    sql: include_str!("0001_directory.sql"),
}];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the collaborator schema up to `latest_version()`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = user_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > from_version)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in pending {
        tx.execute_batch(migration.sql)
            .and_then(|()| {
                tx.pragma_update(None, "user_version", migration.version)
            })
            .map_err(|source| {
                error!(
                    "event=db_migrate module=db status=error version={} name={}",
                    migration.version, migration.name
                );
                DbError::MigrationFailed {
                    version: migration.version,
                    name: migration.name,
                    source,
                }
            })?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from_version} to_version={latest}");
    Ok(())
}

/// Checks that `conn` is at the current version and holds every
/// collaborator table.
pub fn verify_schema(conn: &Connection) -> DbResult<()> {
    let actual_version = user_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(DbError::SchemaNotMigrated {
            expected_version,
            actual_version,
        });
    }

    for table in COLLABORATOR_TABLES {
        let present: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if !present {
            return Err(DbError::MissingCollaboratorTable(*table));
        }
    }
    Ok(())
}

fn user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}
