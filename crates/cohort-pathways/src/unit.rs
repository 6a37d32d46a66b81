//! The per-target-cohort unit of work.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{aggregate_paths, PathRecord};
use crate::bit_index::{BitIndexEntry, BitIndexMap};
use crate::codes::{CodeTableBuilder, CodeTables};
use crate::config::PathwayConfig;
use crate::error::{PathwayError, PathwayResult};
use crate::generation::GenerationId;
use crate::reducer::{PathReducer, SubjectPath};
use crate::stats::{code_stats, CodeStat, CohortSummary};
use crate::steps::StepBuilder;
use crate::traits::{CohortSource, SourceNames};
use crate::types::{CohortId, EventOccurrence, SubjectId, TargetMembership};

/// Everything one unit of work produces for its target cohort.
///
/// Every record carries the same generation id. The value is only built
/// once the whole pipeline has succeeded, so it is never partial.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortResult {
    /// Generation shared by all records below.
    pub generation_id: GenerationId,
    /// Target cohort.
    pub target_cohort_id: CohortId,
    /// Bit assignment used for this cohort's codes, shared by the whole run.
    pub bit_index: Vec<BitIndexEntry>,
    /// Aggregated paths, sorted by step codes.
    pub path_records: Vec<PathRecord>,
    /// Flat and long code tables.
    pub code_tables: CodeTables,
    /// Per-code counts.
    pub code_stats: Vec<CodeStat>,
    /// Headline counts.
    pub summary: CohortSummary,
}

impl CohortResult {
    /// Total subjects over all path records.
    pub fn subject_total(&self) -> usize {
        self.path_records.iter().map(|r| r.subject_count).sum()
    }
}

/// Runs step building, reduction, aggregation and code tables for one target cohort.
#[derive(Clone, Copy)]
pub struct PathwayUnit<'a> {
    config: &'a PathwayConfig,
    source: &'a dyn CohortSource,
}

impl<'a> PathwayUnit<'a> {
    /// Creates a unit over a configuration and a source.
    pub fn new(config: &'a PathwayConfig, source: &'a dyn CohortSource) -> Self {
        Self { config, source }
    }

    /// Runs the pipeline for one target cohort.
    ///
    /// `bit_index` is the run's event cohort assignment. Only cohorts it
    /// contains may form steps, and every target of a run shares it so a
    /// code means the same thing in every target's output.
    ///
    /// # Errors
    ///
    /// - [`Configuration`](crate::PathwayError::Configuration) when no event
    ///   occurrence qualifies for any member of this target
    /// - [`Decoding`](crate::PathwayError::Decoding) when a produced code
    ///   cannot be decoded
    /// - [`Source`](crate::PathwayError::Source) when the source fails
    pub fn run(
        &self,
        target_cohort_id: CohortId,
        generation_id: GenerationId,
        bit_index: &BitIndexMap,
    ) -> PathwayResult<CohortResult> {
        let memberships = first_memberships(
            target_cohort_id,
            self.source.target_memberships(target_cohort_id)?,
        );
        let subject_ids: Vec<SubjectId> = memberships.iter().map(|m| m.subject_id).collect();
        let event_cohort_ids: Vec<CohortId> = bit_index.cohort_ids().collect();
        let occurrences = self.source.event_occurrences(&event_cohort_ids, &subject_ids)?;

        let mut by_subject: HashMap<SubjectId, Vec<&EventOccurrence>> = HashMap::new();
        for occurrence in occurrences
            .iter()
            .filter(|o| bit_index.contains(o.event_cohort_id))
        {
            by_subject
                .entry(occurrence.subject_id)
                .or_default()
                .push(occurrence);
        }

        let qualifying = memberships.iter().any(|m| {
            by_subject
                .get(&m.subject_id)
                .map_or(false, |events| events.iter().any(|o| m.covers(o.start_date)))
        });
        if !qualifying {
            return Err(PathwayError::configuration(format!(
                "no qualifying event occurrences for target cohort {target_cohort_id}"
            )));
        }

        debug!(
            target_cohort = target_cohort_id,
            generation = %generation_id,
            subjects = memberships.len(),
            occurrences = occurrences.len(),
            event_cohorts = bit_index.len(),
            "building pathways"
        );

        let builder = StepBuilder::new(bit_index, self.config.collapse_window_days);
        let reducer = PathReducer::new(self.config.allow_repeats, self.config.max_depth);
        let build_path = |membership: &TargetMembership| -> Option<SubjectPath> {
            let events: &[&EventOccurrence] = by_subject
                .get(&membership.subject_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let steps = builder.build(membership, events.iter().copied());
            reducer.reduce_subject(target_cohort_id, membership.subject_id, &steps)
        };

        #[cfg(feature = "parallel")]
        let paths: Vec<SubjectPath> = if self.config.parallel {
            use rayon::prelude::*;
            memberships.par_iter().filter_map(&build_path).collect()
        } else {
            memberships.iter().filter_map(&build_path).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let paths: Vec<SubjectPath> = memberships.iter().filter_map(&build_path).collect();

        let path_records = aggregate_paths(&generation_id, target_cohort_id, &paths);

        let names = SourceNames(self.source);
        let code_tables = CodeTableBuilder::new(bit_index, &names).build(
            &generation_id,
            target_cohort_id,
            path_records.iter().flat_map(|r| r.step_codes.iter()),
        )?;
        let code_stats = code_stats(&generation_id, target_cohort_id, &paths, &code_tables);

        let summary = CohortSummary {
            generation_id: generation_id.clone(),
            target_cohort_id,
            target_cohort_count: memberships.len(),
            pathway_count: paths.len(),
        };

        info!(
            target_cohort = target_cohort_id,
            generation = %generation_id,
            paths = path_records.len(),
            codes = code_tables.codes.len(),
            subjects_with_pathway = summary.pathway_count,
            "target cohort complete"
        );

        Ok(CohortResult {
            generation_id,
            target_cohort_id,
            bit_index: bit_index.entries().collect(),
            path_records,
            code_tables,
            code_stats,
            summary,
        })
    }
}

/// Keeps each subject's earliest entry into the target cohort, ordered by subject.
fn first_memberships(target_cohort_id: CohortId, rows: Vec<TargetMembership>) -> Vec<TargetMembership> {
    let mut first: BTreeMap<SubjectId, TargetMembership> = BTreeMap::new();
    for row in rows
        .into_iter()
        .filter(|m| m.target_cohort_id == target_cohort_id)
    {
        match first.entry(row.subject_id) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                if row.anchor_start_date < slot.get().anchor_start_date {
                    slot.insert(row);
                }
            }
        }
    }
    first.into_values().collect()
}
