//! Path aggregation: counting subjects per distinct step sequence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combo::ComboCode;
use crate::generation::GenerationId;
use crate::reducer::SubjectPath;
use crate::types::CohortId;

/// Number of subjects sharing one exact step sequence.
///
/// The key is `(generation_id, target_cohort_id, step_codes)`. Paths of
/// different lengths are different keys even when one is a prefix of the
/// other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRecord {
    /// Generation of the unit of work that produced the record.
    pub generation_id: GenerationId,
    /// Target cohort.
    pub target_cohort_id: CohortId,
    /// Step codes in order; never longer than the configured max depth.
    pub step_codes: Vec<ComboCode>,
    /// Subjects following exactly this sequence.
    pub subject_count: usize,
}

impl PathRecord {
    /// Returns the code at a 1-based step position, or `None` past the end.
    pub fn step(&self, position: usize) -> Option<&ComboCode> {
        position
            .checked_sub(1)
            .and_then(|idx| self.step_codes.get(idx))
    }

    /// Returns exactly `depth` columns, padding absent steps with `None`.
    pub fn padded_steps(&self, depth: usize) -> Vec<Option<&ComboCode>> {
        (1..=depth).map(|position| self.step(position)).collect()
    }

    /// Number of steps in the path.
    pub fn depth(&self) -> usize {
        self.step_codes.len()
    }
}

/// Groups subject paths by their full step sequence.
///
/// Records are returned sorted by step sequence, so the output is the same
/// for any permutation of `paths`.
pub fn aggregate_paths(
    generation_id: &GenerationId,
    target_cohort_id: CohortId,
    paths: &[SubjectPath],
) -> Vec<PathRecord> {
    let mut groups: BTreeMap<&[ComboCode], usize> = BTreeMap::new();
    for path in paths.iter().filter(|p| !p.is_empty()) {
        *groups.entry(path.step_codes.as_slice()).or_insert(0) += 1;
    }

    groups
        .into_iter()
        .map(|(codes, subject_count)| PathRecord {
            generation_id: generation_id.clone(),
            target_cohort_id,
            step_codes: codes.to_vec(),
            subject_count,
        })
        .collect()
}
