//! Per-code statistics and cohort summaries.
//!
//! The stats stream counts each code on its own, independent of the full
//! path it appears in: how many subjects reach it at least once and how
//! many path positions hold it. Names come from the unit's code tables.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::codes::CodeTables;
use crate::combo::ComboCode;
use crate::generation::GenerationId;
use crate::reducer::SubjectPath;
use crate::types::{CohortId, SubjectId};

/// One row of the stats stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeStat {
    /// Generation of the producing unit of work.
    pub generation_id: GenerationId,
    /// Target cohort.
    pub target_cohort_id: CohortId,
    /// The combo code.
    pub code: ComboCode,
    /// Constituent names, as in the codes table.
    pub display_name: String,
    /// Distinct subjects whose path contains the code.
    pub subject_count: usize,
    /// Path positions holding the code, across all subjects.
    pub event_count: usize,
}

/// Headline counts for one target cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortSummary {
    /// Generation of the producing unit of work.
    pub generation_id: GenerationId,
    /// Target cohort.
    pub target_cohort_id: CohortId,
    /// Subjects considered (one membership each).
    pub target_cohort_count: usize,
    /// Subjects with a non-empty path.
    pub pathway_count: usize,
}

impl CohortSummary {
    /// Share of target subjects with a pathway, as a percentage.
    pub fn pathway_rate(&self) -> f64 {
        if self.target_cohort_count == 0 {
            0.0
        } else {
            (self.pathway_count as f64 / self.target_cohort_count as f64) * 100.0
        }
    }
}

impl std::fmt::Display for CohortSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Target cohort {} ({}):", self.target_cohort_id, self.generation_id)?;
        writeln!(f, "  Subjects:        {}", self.target_cohort_count)?;
        writeln!(f, "  With pathway:    {}", self.pathway_count)?;
        writeln!(f, "  Rate:            {:.1}%", self.pathway_rate())?;
        Ok(())
    }
}

#[derive(Default)]
struct CodeTally {
    subjects: HashSet<SubjectId>,
    positions: usize,
}

/// Counts subjects and positions per distinct code, sorted by code.
///
/// Each row takes its display name from `code_tables`; a code missing from
/// the tables gets an empty name.
pub fn code_stats(
    generation_id: &GenerationId,
    target_cohort_id: CohortId,
    paths: &[SubjectPath],
    code_tables: &CodeTables,
) -> Vec<CodeStat> {
    let mut tallies: BTreeMap<&ComboCode, CodeTally> = BTreeMap::new();
    for path in paths {
        for code in &path.step_codes {
            let tally = tallies.entry(code).or_default();
            tally.subjects.insert(path.subject_id);
            tally.positions += 1;
        }
    }

    tallies
        .into_iter()
        .map(|(code, tally)| CodeStat {
            generation_id: generation_id.clone(),
            target_cohort_id,
            code: code.clone(),
            display_name: code_tables
                .entry(code)
                .map(|e| e.display_name.clone())
                .unwrap_or_default(),
            subject_count: tally.subjects.len(),
            event_count: tally.positions,
        })
        .collect()
}
