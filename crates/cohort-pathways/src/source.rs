//! In-memory cohort source.

use std::collections::{HashMap, HashSet};

use crate::error::PathwayResult;
use crate::traits::CohortSource;
use crate::types::{CohortId, EventOccurrence, SubjectId, TargetMembership};

/// A [`CohortSource`] backed by vectors of rows.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use cohort_pathways::{CohortSource, EventOccurrence, InMemoryCohortSource, TargetMembership};
///
/// let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
/// let source = InMemoryCohortSource::new()
///     .with_membership(TargetMembership::new(1, 100, day))
///     .with_occurrence(EventOccurrence::new(1, 10, day, day))
///     .with_name(10, "Metformin");
///
/// assert_eq!(source.cohort_count(100).unwrap(), 1);
/// assert_eq!(source.cohort_name(10).as_deref(), Some("Metformin"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCohortSource {
    memberships: Vec<TargetMembership>,
    occurrences: Vec<EventOccurrence>,
    names: HashMap<CohortId, String>,
}

impl InMemoryCohortSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a membership row.
    pub fn with_membership(mut self, membership: TargetMembership) -> Self {
        self.memberships.push(membership);
        self
    }

    /// Adds an occurrence row.
    pub fn with_occurrence(mut self, occurrence: EventOccurrence) -> Self {
        self.occurrences.push(occurrence);
        self
    }

    /// Sets a cohort display name.
    pub fn with_name(mut self, cohort_id: CohortId, name: impl Into<String>) -> Self {
        self.names.insert(cohort_id, name.into());
        self
    }

    /// Adds many membership rows.
    pub fn extend_memberships<I: IntoIterator<Item = TargetMembership>>(&mut self, rows: I) {
        self.memberships.extend(rows);
    }

    /// Adds many occurrence rows.
    pub fn extend_occurrences<I: IntoIterator<Item = EventOccurrence>>(&mut self, rows: I) {
        self.occurrences.extend(rows);
    }

    /// Number of membership rows.
    pub fn membership_count(&self) -> usize {
        self.memberships.len()
    }

    /// Number of occurrence rows.
    pub fn occurrence_count(&self) -> usize {
        self.occurrences.len()
    }
}

impl CohortSource for InMemoryCohortSource {
    fn target_memberships(&self, target_cohort_id: CohortId) -> PathwayResult<Vec<TargetMembership>> {
        Ok(self
            .memberships
            .iter()
            .filter(|m| m.target_cohort_id == target_cohort_id)
            .cloned()
            .collect())
    }

    fn event_occurrences(
        &self,
        event_cohort_ids: &[CohortId],
        subject_ids: &[SubjectId],
    ) -> PathwayResult<Vec<EventOccurrence>> {
        let cohorts: HashSet<CohortId> = event_cohort_ids.iter().copied().collect();
        let subjects: HashSet<SubjectId> = subject_ids.iter().copied().collect();
        Ok(self
            .occurrences
            .iter()
            .filter(|o| cohorts.contains(&o.event_cohort_id) && subjects.contains(&o.subject_id))
            .cloned()
            .collect())
    }

    fn cohort_count(&self, cohort_id: CohortId) -> PathwayResult<usize> {
        let memberships = self
            .memberships
            .iter()
            .filter(|m| m.target_cohort_id == cohort_id)
            .count();
        let occurrences = self
            .occurrences
            .iter()
            .filter(|o| o.event_cohort_id == cohort_id)
            .count();
        Ok(memberships + occurrences)
    }

    fn cohort_name(&self, cohort_id: CohortId) -> Option<String> {
        self.names.get(&cohort_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    fn source() -> InMemoryCohortSource {
        InMemoryCohortSource::new()
            .with_membership(TargetMembership::new(1, 100, day(1)))
            .with_membership(TargetMembership::new(2, 100, day(2)))
            .with_membership(TargetMembership::new(3, 200, day(3)))
            .with_occurrence(EventOccurrence::new(1, 10, day(5), day(6)))
            .with_occurrence(EventOccurrence::new(2, 20, day(5), day(6)))
            .with_occurrence(EventOccurrence::new(3, 10, day(5), day(6)))
    }

    #[test]
    fn test_target_memberships() {
        let rows = source().target_memberships(100).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|m| m.target_cohort_id == 100));
    }

    #[test]
    fn test_event_occurrences_filters_cohorts_and_subjects() {
        let rows = source().event_occurrences(&[10], &[1, 2]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject_id, 1);
    }

    #[test]
    fn test_cohort_count() {
        let source = source();
        assert_eq!(source.cohort_count(100).unwrap(), 2);
        assert_eq!(source.cohort_count(10).unwrap(), 2);
        assert_eq!(source.cohort_count(999).unwrap(), 0);
    }

    #[test]
    fn test_extend() {
        let mut source = InMemoryCohortSource::new();
        source.extend_memberships(vec![TargetMembership::new(1, 100, day(1))]);
        source.extend_occurrences(vec![EventOccurrence::new(1, 10, day(1), day(1))]);
        assert_eq!(source.membership_count(), 1);
        assert_eq!(source.occurrence_count(), 1);
    }
}
