//! Identity map for loaded reviews.
//!
//! Scoped to one repository instance. `clear` is the only bulk eviction;
//! there is no size bound.

use crate::model::review::{ReviewId, SharedReview};
use std::collections::HashMap;
use std::rc::Rc;

/// Primary-key keyed cache of shared review handles.
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: HashMap<ReviewId, SharedReview>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new handle to the cached object, if any.
    pub fn get(&self, id: ReviewId) -> Option<SharedReview> {
        self.entries.get(&id).map(Rc::clone)
    }

    /// Caches `review` under `id`, replacing any previous entry.
    pub fn insert(&mut self, id: ReviewId, review: SharedReview) -> Option<SharedReview> {
        self.entries.insert(id, review)
    }

    pub fn remove(&mut self, id: ReviewId) -> Option<SharedReview> {
        self.entries.remove(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
