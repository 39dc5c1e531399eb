//! The annotation store.
//!
//! An insertion-ordered collection of [`Annotation`]s shared by all
//! request workers. Eviction is purely age-based and caller-triggered:
//! the store keeps no timers and drops nothing outside an explicit
//! [`AnnotationStore::remove_older_than`] call. All mutation goes through
//! a single lock, so a size check racing an append can at worst
//! undercount (delaying a prune), never corrupt the collection.

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use parking_lot::RwLock;

use super::types::Annotation;

/// Shared, age-bounded collection of annotations.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    inner: RwLock<Vec<Annotation>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an annotation. Insertion order equals creation order.
    pub fn insert(&self, annotation: Annotation) {
        self.inner.write().push(annotation);
    }

    /// Current number of stored annotations.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Remove every annotation older than `max_age`, relative to call
    /// time. Returns the number removed. Calling twice in succession is
    /// a no-op the second time.
    pub fn remove_older_than(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        let mut annotations = self.inner.write();
        let before = annotations.len();
        annotations.retain(|a| a.created_at >= cutoff);
        before - annotations.len()
    }

    /// A consistent point-in-time copy of the store contents.
    pub fn snapshot(&self) -> Vec<Annotation> {
        self.inner.read().clone()
    }
}
