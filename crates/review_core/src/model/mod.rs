//! Domain model for performance reviews.
//!
//! # Invariants
//! - A `Review` value never holds a year below `MIN_REVIEW_YEAR` or an empty
//!   summary; both are checked on every write path.
//! - Employee existence is not a model concern; it is checked by the
//!   repository through an `EmployeeDirectory`.

pub mod review;
