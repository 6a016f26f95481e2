//! Review data mapper contracts and SQLite implementation.
//!
//! # Responsibility
//! - Map `reviews` rows to shared `Review` objects and back.
//! - Deduplicate loaded objects through a per-repository identity map.
//! - Validate employee references before a review is built or reassigned.
//!
//! # Invariants
//! - Every object returned by a read or write is cached under its id.
//! - A cache hit is returned as is, without re-validation.
//! - `create_table` and `drop_table` clear the identity map.

use crate::db::migrations::verify_schema;
use crate::db::DbError;
use crate::model::review::{
    EmployeeId, Review, ReviewId, ReviewState, ReviewValidationError, SharedReview,
};
use crate::repo::employee_directory::EmployeeDirectory;
use crate::repo::identity_map::IdentityMap;
use log::{debug, info};
use rusqlite::{params, Connection, Params, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

const REVIEW_SELECT_SQL: &str = "SELECT
    id,
    year,
    summary,
    employee_id
FROM reviews";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for review mapping, persistence and lookup operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ReviewValidationError),
    Db(DbError),
    NotFound(ReviewId),
    /// Operation needs a stored review but the review has no id.
    NotPersisted,
    /// Insert was requested for a review that already has an id.
    AlreadyPersisted(ReviewId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "review not found: {id}"),
            Self::NotPersisted => write!(f, "review has not been saved"),
            Self::AlreadyPersisted(id) => write!(f, "review already saved with id {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted review data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::NotPersisted
            | Self::AlreadyPersisted(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<ReviewValidationError> for RepoError {
    fn from(value: ReviewValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Raw `reviews` row as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub id: ReviewId,
    pub year: i32,
    pub summary: String,
    pub employee_id: EmployeeId,
}

/// Repository interface for the review data mapper.
pub trait ReviewRepository {
    /// Creates `reviews` if missing and clears the identity map.
    fn create_table(&mut self) -> RepoResult<()>;
    /// Drops `reviews` if present and clears the identity map.
    fn drop_table(&mut self) -> RepoResult<()>;
    /// Builds a transient review after full validation, without persisting it.
    fn build(
        &self,
        year: i32,
        summary: impl Into<String>,
        employee_id: EmployeeId,
    ) -> RepoResult<Review>;
    /// Reassigns the employee after checking that it exists.
    fn set_employee_id(&self, review: &mut Review, employee_id: EmployeeId) -> RepoResult<()>;
    /// Inserts a new review or updates a persisted one, then caches it.
    fn save(&mut self, review: &SharedReview) -> RepoResult<ReviewId>;
    /// Inserts a review that has no id yet.
    fn insert(&mut self, review: Review) -> RepoResult<SharedReview>;
    /// Writes all fields of a persisted review.
    fn update(&mut self, review: &SharedReview) -> RepoResult<()>;
    /// Builds and saves a review in one step.
    fn create(
        &mut self,
        year: i32,
        summary: impl Into<String>,
        employee_id: EmployeeId,
    ) -> RepoResult<SharedReview>;
    /// Returns the cached object for `row.id` or a new validated one.
    fn instance_from_db(&mut self, row: ReviewRow) -> RepoResult<SharedReview>;
    fn find_by_id(&mut self, id: ReviewId) -> RepoResult<Option<SharedReview>>;
    /// Deletes the row, evicts the cache entry and clears the object's id.
    /// A missing row still evicts the entry but keeps the id.
    fn delete(&mut self, review: &SharedReview) -> RepoResult<()>;
    /// Lists every review in insertion order.
    fn get_all(&mut self) -> RepoResult<Vec<SharedReview>>;
    fn list_for_employee(&mut self, employee_id: EmployeeId) -> RepoResult<Vec<SharedReview>>;
    fn count(&self) -> RepoResult<u64>;
}

/// SQLite-backed review repository with its own identity map.
pub struct SqliteReviewRepository<'conn, D: EmployeeDirectory> {
    conn: &'conn Connection,
    directory: D,
    cache: IdentityMap,
}

impl<'conn, D: EmployeeDirectory> SqliteReviewRepository<'conn, D> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection, directory: D) -> RepoResult<Self> {
        verify_schema(conn)?;
        Ok(Self {
            conn,
            directory,
            cache: IdentityMap::new(),
        })
    }

    /// Returns the cached object for `id` without touching storage.
    pub fn cached(&self, id: ReviewId) -> Option<SharedReview> {
        self.cache.get(id)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Ends the current identity scope; later reads build fresh objects.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn ensure_employee_exists(&self, employee_id: EmployeeId) -> RepoResult<()> {
        if !self.directory.employee_exists(employee_id)? {
            return Err(ReviewValidationError::UnknownEmployee(employee_id).into());
        }
        Ok(())
    }

    fn insert_row(&self, review: &Review) -> RepoResult<ReviewId> {
        review.validate()?;
        self.ensure_employee_exists(review.employee_id())?;
        self.conn.execute(
            "INSERT INTO reviews (year, summary, employee_id) VALUES (?1, ?2, ?3);",
            params![review.year(), review.summary(), review.employee_id()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_row(&self, id: ReviewId, review: &Review) -> RepoResult<()> {
        review.validate()?;
        self.ensure_employee_exists(review.employee_id())?;
        let changed = self.conn.execute(
            "UPDATE reviews
             SET
                year = ?1,
                summary = ?2,
                employee_id = ?3
             WHERE id = ?4;",
            params![review.year(), review.summary(), review.employee_id(), id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn query_rows(&self, sql: &str, params: impl Params) -> RepoResult<Vec<ReviewRow>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_review_row(row)?);
        }
        Ok(items)
    }

    fn map_rows(&mut self, rows: Vec<ReviewRow>) -> RepoResult<Vec<SharedReview>> {
        rows.into_iter()
            .map(|row| self.instance_from_db(row))
            .collect()
    }
}

impl<D: EmployeeDirectory> ReviewRepository for SqliteReviewRepository<'_, D> {
    fn create_table(&mut self) -> RepoResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY,
                year INTEGER,
                summary TEXT,
                employee_id INTEGER REFERENCES employees(id)
            );",
        )?;
        let evicted = self.cache.len();
        self.cache.clear();
        info!("event=reviews_create_table module=repo status=ok cache_evicted={evicted}");
        Ok(())
    }

    fn drop_table(&mut self) -> RepoResult<()> {
        self.conn.execute_batch("DROP TABLE IF EXISTS reviews;")?;
        let evicted = self.cache.len();
        self.cache.clear();
        info!("event=reviews_drop_table module=repo status=ok cache_evicted={evicted}");
        Ok(())
    }

    fn build(
        &self,
        year: i32,
        summary: impl Into<String>,
        employee_id: EmployeeId,
    ) -> RepoResult<Review> {
        let review = Review::new(year, summary, employee_id)?;
        self.ensure_employee_exists(employee_id)?;
        Ok(review)
    }

    fn set_employee_id(&self, review: &mut Review, employee_id: EmployeeId) -> RepoResult<()> {
        self.ensure_employee_exists(employee_id)?;
        review.assign_employee_id(employee_id);
        Ok(())
    }

    fn save(&mut self, review: &SharedReview) -> RepoResult<ReviewId> {
        let state = review.borrow().state();
        match state {
            ReviewState::Persisted(id) => {
                self.update_row(id, &review.borrow())?;
                debug!("event=review_save module=repo status=ok op=update review_id={id}");
                self.cache.insert(id, Rc::clone(review));
                Ok(id)
            }
            ReviewState::New => {
                let id = self.insert_row(&review.borrow())?;
                review.borrow_mut().set_id(Some(id));
                debug!("event=review_save module=repo status=ok op=insert review_id={id}");
                self.cache.insert(id, Rc::clone(review));
                Ok(id)
            }
        }
    }

    fn insert(&mut self, review: Review) -> RepoResult<SharedReview> {
        if let ReviewState::Persisted(id) = review.state() {
            return Err(RepoError::AlreadyPersisted(id));
        }
        let shared = review.into_shared();
        self.save(&shared)?;
        Ok(shared)
    }

    fn update(&mut self, review: &SharedReview) -> RepoResult<()> {
        if review.borrow().state() == ReviewState::New {
            return Err(RepoError::NotPersisted);
        }
        self.save(review).map(|_| ())
    }

    fn create(
        &mut self,
        year: i32,
        summary: impl Into<String>,
        employee_id: EmployeeId,
    ) -> RepoResult<SharedReview> {
        let review = self.build(year, summary, employee_id)?;
        self.insert(review)
    }

    fn instance_from_db(&mut self, row: ReviewRow) -> RepoResult<SharedReview> {
        if let Some(cached) = self.cache.get(row.id) {
            return Ok(cached);
        }

        let mut review = self.build(row.year, row.summary, row.employee_id)?;
        review.set_id(Some(row.id));
        let shared = review.into_shared();
        self.cache.insert(row.id, Rc::clone(&shared));
        Ok(shared)
    }

    fn find_by_id(&mut self, id: ReviewId) -> RepoResult<Option<SharedReview>> {
        let rows = self.query_rows(&format!("{REVIEW_SELECT_SQL} WHERE id = ?1;"), [id])?;
        match rows.into_iter().next() {
            Some(row) => self.instance_from_db(row).map(Some),
            None => Ok(None),
        }
    }

    fn delete(&mut self, review: &SharedReview) -> RepoResult<()> {
        let id = match review.borrow().state() {
            ReviewState::Persisted(id) => id,
            ReviewState::New => return Err(RepoError::NotPersisted),
        };

        let changed = self
            .conn
            .execute("DELETE FROM reviews WHERE id = ?1;", [id])?;
        self.cache.remove(id);
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        review.borrow_mut().set_id(None);
        debug!("event=review_delete module=repo status=ok review_id={id}");
        Ok(())
    }

    fn get_all(&mut self) -> RepoResult<Vec<SharedReview>> {
        let rows = self.query_rows(&format!("{REVIEW_SELECT_SQL} ORDER BY id ASC;"), [])?;
        self.map_rows(rows)
    }

    fn list_for_employee(&mut self, employee_id: EmployeeId) -> RepoResult<Vec<SharedReview>> {
        let rows = self.query_rows(
            &format!("{REVIEW_SELECT_SQL} WHERE employee_id = ?1 ORDER BY id ASC;"),
            [employee_id],
        )?;
        self.map_rows(rows)
    }

    fn count(&self) -> RepoResult<u64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM reviews;", [], |row| row.get::<_, u64>(0))?;
        Ok(count)
    }
}

fn parse_review_row(row: &Row<'_>) -> RepoResult<ReviewRow> {
    let id: ReviewId = row.get("id")?;
    let year = row.get::<_, Option<i32>>("year")?.ok_or_else(|| {
        RepoError::InvalidData(format!("null year in reviews.year for id {id}"))
    })?;
    let summary = row.get::<_, Option<String>>("summary")?.ok_or_else(|| {
        RepoError::InvalidData(format!("null summary in reviews.summary for id {id}"))
    })?;
    let employee_id = row
        .get::<_, Option<EmployeeId>>("employee_id")?
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "null employee_id in reviews.employee_id for id {id}"
            ))
        })?;

    Ok(ReviewRow {
        id,
        year,
        summary,
        employee_id,
    })
}
