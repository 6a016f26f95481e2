//! Data mapper for employee performance reviews.
//! This crate owns review validation, row mapping and the identity map.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::review::{
    EmployeeId, Review, ReviewId, ReviewState, ReviewValidationError, SharedReview, MIN_REVIEW_YEAR,
};
pub use repo::employee_directory::{
    EmployeeDirectory, InMemoryEmployeeDirectory, SqliteEmployeeDirectory,
};
pub use repo::identity_map::IdentityMap;
pub use repo::review_repo::{
    RepoError, RepoResult, ReviewRepository, ReviewRow, SqliteReviewRepository,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
