//! Review domain model.
//!
//! # Responsibility
//! - Define the in-memory shape of one `reviews` row.
//! - Own the pure (storage-free) validation rules.
//!
//! # Invariants
//! - `year >= MIN_REVIEW_YEAR`.
//! - `summary` is never empty.
//! - `id` is `None` until the row is persisted and after it is deleted.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Surrogate key assigned by storage on insert.
pub type ReviewId = i64;

/// Primary key of the referenced `employees` row.
pub type EmployeeId = i64;

/// Lowest accepted review year.
pub const MIN_REVIEW_YEAR: i32 = 2000;

/// Review handle shared between callers and the identity map.
///
/// Two handles denote the same object when `Rc::ptr_eq` holds.
pub type SharedReview = Rc<RefCell<Review>>;

/// Validation errors for review fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewValidationError {
    YearOutOfRange { year: i32 },
    EmptySummary,
    UnknownEmployee(EmployeeId),
}

impl Display for ReviewValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::YearOutOfRange { year } => write!(
                f,
                "year must be an integer greater than or equal to {MIN_REVIEW_YEAR}, got {year}"
            ),
            Self::EmptySummary => write!(f, "summary must be a non-empty string"),
            Self::UnknownEmployee(id) => write!(f, "invalid employee_id: {id}"),
        }
    }
}

impl Error for ReviewValidationError {}

/// Persistence state derived from the presence of an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    /// Not yet stored, or detached by delete.
    New,
    /// Backed by the `reviews` row with this id.
    Persisted(ReviewId),
}

/// One performance review of one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReviewFields")]
pub struct Review {
    id: Option<ReviewId>,
    year: i32,
    summary: String,
    employee_id: EmployeeId,
}

#[derive(Deserialize)]
struct ReviewFields {
    #[serde(default)]
    id: Option<ReviewId>,
    year: i32,
    summary: String,
    employee_id: EmployeeId,
}

impl TryFrom<ReviewFields> for Review {
    type Error = ReviewValidationError;

    fn try_from(value: ReviewFields) -> Result<Self, Self::Error> {
        let review = Self::new(value.year, value.summary, value.employee_id)?;
        Ok(Self {
            id: value.id,
            ..review
        })
    }
}

impl Review {
    /// Creates a transient review after checking `year` and `summary`.
    ///
    /// Employee existence is not checked here; use
    /// `ReviewRepository::build` for the full construction contract.
    pub fn new(
        year: i32,
        summary: impl Into<String>,
        employee_id: EmployeeId,
    ) -> Result<Self, ReviewValidationError> {
        let summary = summary.into();
        validate_year(year)?;
        validate_summary(&summary)?;
        Ok(Self {
            id: None,
            year,
            summary,
            employee_id,
        })
    }

    pub fn id(&self) -> Option<ReviewId> {
        self.id
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    pub fn state(&self) -> ReviewState {
        match self.id {
            Some(id) => ReviewState::Persisted(id),
            None => ReviewState::New,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Replaces the review year. The old value is kept on error.
    pub fn set_year(&mut self, year: i32) -> Result<(), ReviewValidationError> {
        validate_year(year)?;
        self.year = year;
        Ok(())
    }

    /// Replaces the summary text. The old value is kept on error.
    pub fn set_summary(&mut self, summary: impl Into<String>) -> Result<(), ReviewValidationError> {
        let summary = summary.into();
        validate_summary(&summary)?;
        self.summary = summary;
        Ok(())
    }

    /// Re-checks the pure field rules.
    pub fn validate(&self) -> Result<(), ReviewValidationError> {
        validate_year(self.year)?;
        validate_summary(&self.summary)
    }

    /// Wraps this review into a handle suitable for the identity map.
    pub fn into_shared(self) -> SharedReview {
        Rc::new(RefCell::new(self))
    }

    pub(crate) fn set_id(&mut self, id: Option<ReviewId>) {
        self.id = id;
    }

    // Caller has already resolved the employee.
    pub(crate) fn assign_employee_id(&mut self, employee_id: EmployeeId) {
        self.employee_id = employee_id;
    }
}

impl Display for Review {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let id = self
            .id
            .map_or_else(|| "None".to_string(), |id| id.to_string());
        write!(
            f,
            "<Review {id}: {}, {}, Employee: {}>",
            self.year, self.summary, self.employee_id
        )
    }
}

fn validate_year(year: i32) -> Result<(), ReviewValidationError> {
    if year < MIN_REVIEW_YEAR {
        return Err(ReviewValidationError::YearOutOfRange { year });
    }
    Ok(())
}

fn validate_summary(summary: &str) -> Result<(), ReviewValidationError> {
    if summary.is_empty() {
        return Err(ReviewValidationError::EmptySummary);
    }
    Ok(())
}
