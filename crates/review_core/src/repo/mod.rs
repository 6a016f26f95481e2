//! Repository layer: review data mapper and its collaborators.
//!
//! # Responsibility
//! - Keep SQL for `reviews` and the employee existence lookup in one place.
//! - Own the identity map that deduplicates loaded reviews.
//!
//! # Invariants
//! - Write paths validate fields and employee existence before SQL mutations.
//! - One repository instance holds at most one live object per review id.

pub mod employee_directory;
pub mod identity_map;
pub mod review_repo;
