//! Path reduction: repeat suppression and depth truncation.

use serde::Serialize;

use crate::combo::ComboCode;
use crate::steps::Step;
use crate::types::{CohortId, SubjectId};

/// A single subject's final pathway within a target cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPath {
    /// Target cohort the path belongs to.
    pub target_cohort_id: CohortId,
    /// The subject.
    pub subject_id: SubjectId,
    /// Combo code of each retained step, in order.
    pub step_codes: Vec<ComboCode>,
}

impl SubjectPath {
    /// Number of steps in the path.
    pub fn len(&self) -> usize {
        self.step_codes.len()
    }

    /// Returns true if the path has no steps.
    pub fn is_empty(&self) -> bool {
        self.step_codes.is_empty()
    }
}

/// Applies the repeat and depth policies to a step sequence.
#[derive(Debug, Clone, Copy)]
pub struct PathReducer {
    allow_repeats: bool,
    max_depth: usize,
}

impl PathReducer {
    /// Creates a reducer.
    pub fn new(allow_repeats: bool, max_depth: usize) -> Self {
        Self {
            allow_repeats,
            max_depth,
        }
    }

    /// Reduces steps to the codes of the final path.
    ///
    /// Without repeats, a step whose code equals the previous retained
    /// step's code is dropped; non-adjacent repeats survive. The retained
    /// sequence is then cut to the first `max_depth` codes.
    pub fn reduce(&self, steps: &[Step]) -> Vec<ComboCode> {
        let mut codes: Vec<ComboCode> = Vec::with_capacity(steps.len().min(self.max_depth));
        for step in steps {
            if codes.len() == self.max_depth {
                break;
            }
            if !self.allow_repeats && codes.last() == Some(&step.combo) {
                continue;
            }
            codes.push(step.combo.clone());
        }
        codes
    }

    /// Reduces a subject's steps into a path, or `None` if nothing is retained.
    pub fn reduce_subject(
        &self,
        target_cohort_id: CohortId,
        subject_id: SubjectId,
        steps: &[Step],
    ) -> Option<SubjectPath> {
        let step_codes = self.reduce(steps);
        if step_codes.is_empty() {
            return None;
        }
        Some(SubjectPath {
            target_cohort_id,
            subject_id,
            step_codes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn steps(codes: &[u64]) -> Vec<Step> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        codes
            .iter()
            .enumerate()
            .map(|(i, &code)| Step {
                ordinal: i + 1,
                combo: ComboCode::from(code),
                window_start: start,
                days_from_anchor: 0,
                event_count: 1,
            })
            .collect()
    }

    fn codes(values: &[u64]) -> Vec<ComboCode> {
        values.iter().map(|&v| ComboCode::from(v)).collect()
    }

    #[test]
    fn test_collapses_adjacent_duplicates() {
        let reducer = PathReducer::new(false, 5);
        assert_eq!(reducer.reduce(&steps(&[1, 1, 1, 2])), codes(&[1, 2]));
    }

    #[test]
    fn test_keeps_non_adjacent_repeats() {
        let reducer = PathReducer::new(false, 5);
        assert_eq!(reducer.reduce(&steps(&[1, 2, 1])), codes(&[1, 2, 1]));
    }

    #[test]
    fn test_allow_repeats_keeps_all() {
        let reducer = PathReducer::new(true, 5);
        assert_eq!(reducer.reduce(&steps(&[1, 1, 1])), codes(&[1, 1, 1]));
    }

    #[test]
    fn test_truncates_to_max_depth() {
        let reducer = PathReducer::new(true, 2);
        assert_eq!(reducer.reduce(&steps(&[1, 2, 3, 4])), codes(&[1, 2]));
    }

    #[test]
    fn test_truncation_counts_retained_steps() {
        // duplicates are dropped before the depth limit applies
        let reducer = PathReducer::new(false, 2);
        assert_eq!(reducer.reduce(&steps(&[1, 1, 1, 2, 3])), codes(&[1, 2]));
    }

    #[test]
    fn test_zero_depth_yields_nothing() {
        let reducer = PathReducer::new(false, 0);
        assert!(reducer.reduce(&steps(&[1, 2])).is_empty());
        assert!(reducer.reduce_subject(100, 1, &steps(&[1, 2])).is_none());
    }

    #[test]
    fn test_reduce_subject() {
        let reducer = PathReducer::new(false, 5);
        let path = reducer.reduce_subject(100, 7, &steps(&[3, 3, 1])).unwrap();

        assert_eq!(path.target_cohort_id, 100);
        assert_eq!(path.subject_id, 7);
        assert_eq!(path.step_codes, codes(&[3, 1]));
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_reduce_subject_empty_steps() {
        let reducer = PathReducer::new(false, 5);
        assert!(reducer.reduce_subject(100, 7, &[]).is_none());
    }
}
