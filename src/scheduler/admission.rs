//! Per-user, per-category admission control.
//!
//! A user may have at most one in-flight request per category, where
//! "in-flight" spans the whole retry chain: queued, executing, or awaiting a
//! retry. The slot is released exactly once, on terminal success or failure,
//! never on an intermediate retry. This is what stops a user from flooding a
//! category while a slow request is still retrying.

use dashmap::DashMap;

use crate::category::Category;
use crate::telemetry;

/// Concurrent (user, category) -> in-flight gate.
///
/// Entries are created lazily on a user's first submission for a category and
/// flipped in place afterwards; they are never removed. Bounded by distinct
/// users x categories, which is acceptable for a single-process scheduler.
pub struct AdmissionController {
    entries: DashMap<(String, Category), bool>,
}

impl AdmissionController {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Try to occupy the user's slot for a category.
    ///
    /// Returns false if the user already has an in-flight request there.
    pub fn try_admit(&self, user_id: &str, category: Category) -> bool {
        let mut entry = self
            .entries
            .entry((user_id.to_string(), category))
            .or_insert(false);
        if *entry {
            telemetry::record_admission_rejection(category);
            return false;
        }
        *entry = true;
        true
    }

    /// Clear the user's slot. Must be called exactly once per admitted
    /// request, on terminal success or failure.
    pub fn release(&self, user_id: &str, category: Category) {
        match self.entries.get_mut(&(user_id.to_string(), category)) {
            Some(mut entry) if *entry => *entry = false,
            _ => {
                // Double release is a scheduler logic bug, not a caller error.
                tracing::warn!(user_id, %category, "admission release without occupied slot");
                debug_assert!(false, "admission slot released twice");
            }
        }
    }

    /// Whether the user currently holds the slot for a category.
    pub fn in_flight(&self, user_id: &str, category: Category) -> bool {
        self.entries
            .get(&(user_id.to_string(), category))
            .map_or(false, |e| *e)
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new()
    }
}
