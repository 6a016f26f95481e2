//! Employee existence lookup used by review validation.
//!
//! # Responsibility
//! - Answer "does employee `id` exist" without exposing employee rows.
//!
//! # Invariants
//! - Lookups never mutate storage.

use crate::model::review::EmployeeId;
use crate::repo::review_repo::RepoResult;
use rusqlite::Connection;
use std::collections::HashSet;

/// Existence checker for the `employees` collaborator.
pub trait EmployeeDirectory {
    fn employee_exists(&self, id: EmployeeId) -> RepoResult<bool>;
}

impl<D: EmployeeDirectory + ?Sized> EmployeeDirectory for &D {
    fn employee_exists(&self, id: EmployeeId) -> RepoResult<bool> {
        (**self).employee_exists(id)
    }
}

/// Directory backed by the `employees` table.
pub struct SqliteEmployeeDirectory<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEmployeeDirectory<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EmployeeDirectory for SqliteEmployeeDirectory<'_> {
    fn employee_exists(&self, id: EmployeeId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM employees
                WHERE id = ?1
            );",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

/// Fixed set of employee ids, for callers without an `employees` table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmployeeDirectory {
    ids: HashSet<EmployeeId>,
}

impl InMemoryEmployeeDirectory {
    pub fn new(ids: impl IntoIterator<Item = EmployeeId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn add(&mut self, id: EmployeeId) {
        self.ids.insert(id);
    }

    pub fn remove(&mut self, id: EmployeeId) {
        self.ids.remove(&id);
    }
}

impl EmployeeDirectory for InMemoryEmployeeDirectory {
    fn employee_exists(&self, id: EmployeeId) -> RepoResult<bool> {
        Ok(self.ids.contains(&id))
    }
}
