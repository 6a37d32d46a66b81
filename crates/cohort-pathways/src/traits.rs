//! Traits at the boundary between the engine and its data.
//!
//! This module defines the [`CohortSource`] trait that must be implemented
//! by anything able to supply target memberships and event occurrences,
//! and [`CohortNameLookup`] for resolving display names in code tables.
//!
//! # Architecture Note
//!
//! The engine never talks to a database. A relational backend implements
//! [`CohortSource`] in the consuming crate and hands the engine already
//! materialized rows. [`InMemoryCohortSource`](crate::InMemoryCohortSource)
//! is provided for tests and for callers that load rows themselves.
//!
//! # Example: Implementing CohortSource over a cohort table
//!
//! ```ignore
//! use cohort_pathways::{CohortId, CohortSource, EventOccurrence, PathwayResult, SubjectId,
//!     TargetMembership};
//!
//! impl CohortSource for MyCohortTable {
//!     fn target_memberships(&self, target: CohortId) -> PathwayResult<Vec<TargetMembership>> {
//!         self.query_memberships(target).map_err(PathwayError::source_error)
//!     }
//!
//!     fn event_occurrences(
//!         &self,
//!         event_cohort_ids: &[CohortId],
//!         subject_ids: &[SubjectId],
//!     ) -> PathwayResult<Vec<EventOccurrence>> {
//!         self.query_events(event_cohort_ids, subject_ids)
//!             .map_err(PathwayError::source_error)
//!     }
//!
//!     fn cohort_count(&self, cohort_id: CohortId) -> PathwayResult<usize> {
//!         self.count_rows(cohort_id).map_err(PathwayError::source_error)
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::error::PathwayResult;
use crate::types::{CohortId, EventOccurrence, SubjectId, TargetMembership};

// =============================================================================
// Cohort Source
// =============================================================================

/// Supplier of materialized cohort rows.
///
/// Implementations are shared across worker threads when the engine runs
/// in parallel, hence the `Send + Sync` bound.
///
/// # Required Methods
///
/// - [`target_memberships`](Self::target_memberships) - Entries into one target cohort
/// - [`event_occurrences`](Self::event_occurrences) - Event rows for a set of subjects
/// - [`cohort_count`](Self::cohort_count) - Row count used for instantiation checks
///
/// # Optional Methods (with defaults)
///
/// - [`cohort_name`](Self::cohort_name) - Display name, `None` by default
pub trait CohortSource: Send + Sync {
    /// Returns every membership row of the target cohort.
    fn target_memberships(&self, target_cohort_id: CohortId) -> PathwayResult<Vec<TargetMembership>>;

    /// Returns occurrences of the given event cohorts for the given subjects.
    fn event_occurrences(
        &self,
        event_cohort_ids: &[CohortId],
        subject_ids: &[SubjectId],
    ) -> PathwayResult<Vec<EventOccurrence>>;

    /// Number of rows instantiated for a cohort; zero means not instantiated.
    fn cohort_count(&self, cohort_id: CohortId) -> PathwayResult<usize>;

    /// Display name of a cohort.
    fn cohort_name(&self, _cohort_id: CohortId) -> Option<String> {
        None
    }
}

// =============================================================================
// Name Lookup
// =============================================================================

/// Resolves cohort ids to display names.
pub trait CohortNameLookup {
    /// Returns the display name, if known.
    fn cohort_name(&self, cohort_id: CohortId) -> Option<String>;

    /// Returns the display name or a fallback built from the id.
    fn display_name(&self, cohort_id: CohortId) -> String {
        self.cohort_name(cohort_id)
            .unwrap_or_else(|| format!("Cohort {}", cohort_id))
    }
}

impl CohortNameLookup for HashMap<CohortId, String> {
    fn cohort_name(&self, cohort_id: CohortId) -> Option<String> {
        self.get(&cohort_id).cloned()
    }
}

impl CohortNameLookup for BTreeMap<CohortId, String> {
    fn cohort_name(&self, cohort_id: CohortId) -> Option<String> {
        self.get(&cohort_id).cloned()
    }
}

/// Adapts a [`CohortSource`] into a [`CohortNameLookup`].
#[derive(Clone, Copy)]
pub struct SourceNames<'a>(pub &'a dyn CohortSource);

impl CohortNameLookup for SourceNames<'_> {
    fn cohort_name(&self, cohort_id: CohortId) -> Option<String> {
        self.0.cohort_name(cohort_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_map_lookup() {
        let names: HashMap<CohortId, String> = [(10, "Metformin".to_string())].into_iter().collect();
        assert_eq!(names.cohort_name(10), Some("Metformin".to_string()));
        assert_eq!(names.cohort_name(20), None);
    }

    #[test]
    fn test_display_name_fallback() {
        let names: BTreeMap<CohortId, String> = BTreeMap::new();
        assert_eq!(names.display_name(42), "Cohort 42");
    }
}
