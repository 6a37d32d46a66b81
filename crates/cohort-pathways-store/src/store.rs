//! Concurrent destination store for pathway results.
//!
//! Units of work finish independently and append their complete
//! [`CohortResult`] in one call. A result is either fully visible or not
//! visible at all; readers never see part of a cohort's records.
//!
//! # Example
//!
//! ```ignore
//! use cohort_pathways_store::{InMemoryPathwayStore, OverwritePolicy, PathwayStore};
//!
//! let store = InMemoryPathwayStore::with_policy(OverwritePolicy::Replace);
//! store.commit_report(&report)?;
//!
//! for record in store.path_records(target_cohort_id) {
//!     println!("{:?} -> {}", record.step_codes, record.subject_count);
//! }
//! ```

use std::collections::BTreeMap;

use cohort_pathways::{
    CodeLongEntry, CodeStat, CodeTableEntry, CohortId, CohortResult, CohortSummary, GenerationId,
    PathRecord, PathwayReport,
};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// What to do when a target cohort already has stored output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Keep earlier generations and add the new one beside them.
    #[default]
    Append,
    /// Drop every earlier generation of the target cohort first.
    Replace,
    /// Refuse to store anything for a target cohort that already has output.
    FailIfPresent,
}

/// Counters for store activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Results accepted.
    pub appended: u64,
    /// Earlier generations dropped under [`OverwritePolicy::Replace`].
    pub replaced: u64,
    /// Results refused.
    pub rejected: u64,
}

/// Destination for finished cohort results.
pub trait PathwayStore: Send + Sync {
    /// Stores one complete result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::GenerationExists`] if the generation is already
    /// stored, or [`StoreError::TargetExists`] when the policy forbids
    /// replacing earlier output.
    fn append(&self, result: &CohortResult) -> StoreResult<()>;

    /// Generations stored for a target cohort, oldest first.
    fn generations(&self, target_cohort_id: CohortId) -> Vec<GenerationId>;

    /// Result for one generation of a target cohort.
    fn result(&self, target_cohort_id: CohortId, generation_id: &GenerationId)
        -> Option<CohortResult>;

    /// Most recently stored result for a target cohort.
    fn latest(&self, target_cohort_id: CohortId) -> Option<CohortResult>;
}

#[derive(Debug, Default)]
struct Tables {
    // per target cohort, in append order
    results: BTreeMap<CohortId, Vec<CohortResult>>,
    stats: StoreStats,
}

impl Tables {
    fn check(&self, policy: OverwritePolicy, result: &CohortResult) -> StoreResult<()> {
        let existing = match self.results.get(&result.target_cohort_id) {
            Some(existing) if !existing.is_empty() => existing,
            _ => return Ok(()),
        };
        match policy {
            OverwritePolicy::FailIfPresent => Err(StoreError::TargetExists {
                target_cohort_id: result.target_cohort_id,
            }),
            OverwritePolicy::Append
                if existing
                    .iter()
                    .any(|r| r.generation_id == result.generation_id) =>
            {
                Err(StoreError::GenerationExists {
                    target_cohort_id: result.target_cohort_id,
                    generation_id: result.generation_id.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn insert(&mut self, policy: OverwritePolicy, result: &CohortResult) {
        let slot = self.results.entry(result.target_cohort_id).or_default();
        if policy == OverwritePolicy::Replace && !slot.is_empty() {
            self.stats.replaced += slot.len() as u64;
            debug!(
                target_cohort = result.target_cohort_id,
                dropped = slot.len(),
                "replacing stored generations"
            );
            slot.clear();
        }
        slot.push(result.clone());
        self.stats.appended += 1;
    }
}

/// In-memory [`PathwayStore`] guarded by a single read-write lock.
///
/// Writers take the lock once per call, so concurrent units of work can
/// append without interfering with each other's cohorts.
#[derive(Debug, Default)]
pub struct InMemoryPathwayStore {
    policy: OverwritePolicy,
    tables: RwLock<Tables>,
}

impl InMemoryPathwayStore {
    /// Creates an empty store with [`OverwritePolicy::Append`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given policy.
    pub fn with_policy(policy: OverwritePolicy) -> Self {
        Self {
            policy,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Returns the overwrite policy.
    pub fn policy(&self) -> OverwritePolicy {
        self.policy
    }

    /// Stores every completed result of a report.
    ///
    /// All results are checked before any is inserted, so either the whole
    /// report is stored or none of it is. Returns the number stored.
    pub fn commit_report(&self, report: &PathwayReport) -> StoreResult<usize> {
        let mut tables = self.tables.write();
        let results: Vec<&CohortResult> = report.completed().collect();
        for result in &results {
            if let Err(e) = tables.check(self.policy, result) {
                tables.stats.rejected += 1;
                return Err(e);
            }
        }
        for result in &results {
            tables.insert(self.policy, result);
        }
        info!(
            stored = results.len(),
            skipped = report.skipped().count(),
            failed = report.failed().count(),
            "committed pathway report"
        );
        Ok(results.len())
    }

    /// Target cohorts with stored output.
    pub fn target_cohorts(&self) -> Vec<CohortId> {
        self.tables
            .read()
            .results
            .iter()
            .filter(|(_, results)| !results.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Path records of the latest generation of a target cohort.
    pub fn path_records(&self, target_cohort_id: CohortId) -> Vec<PathRecord> {
        self.latest(target_cohort_id)
            .map(|r| r.path_records)
            .unwrap_or_default()
    }

    /// Flat code table of the latest generation of a target cohort.
    pub fn codes(&self, target_cohort_id: CohortId) -> Vec<CodeTableEntry> {
        self.latest(target_cohort_id)
            .map(|r| r.code_tables.codes)
            .unwrap_or_default()
    }

    /// Long code table of the latest generation of a target cohort.
    pub fn codes_long(&self, target_cohort_id: CohortId) -> Vec<CodeLongEntry> {
        self.latest(target_cohort_id)
            .map(|r| r.code_tables.long)
            .unwrap_or_default()
    }

    /// Per-code stats of the latest generation of a target cohort.
    pub fn code_stats(&self, target_cohort_id: CohortId) -> Vec<CodeStat> {
        self.latest(target_cohort_id)
            .map(|r| r.code_stats)
            .unwrap_or_default()
    }

    /// Summaries of every stored generation, ordered by target cohort.
    pub fn summaries(&self) -> Vec<CohortSummary> {
        self.tables
            .read()
            .results
            .values()
            .flatten()
            .map(|r| r.summary.clone())
            .collect()
    }

    /// Returns activity counters.
    pub fn stats(&self) -> StoreStats {
        self.tables.read().stats
    }

    /// Removes everything.
    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.results.clear();
    }
}

impl PathwayStore for InMemoryPathwayStore {
    fn append(&self, result: &CohortResult) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if let Err(e) = tables.check(self.policy, result) {
            tables.stats.rejected += 1;
            return Err(e);
        }
        tables.insert(self.policy, result);
        debug!(
            target_cohort = result.target_cohort_id,
            generation = %result.generation_id,
            paths = result.path_records.len(),
            "stored cohort result"
        );
        Ok(())
    }

    fn generations(&self, target_cohort_id: CohortId) -> Vec<GenerationId> {
        self.tables
            .read()
            .results
            .get(&target_cohort_id)
            .map(|results| results.iter().map(|r| r.generation_id.clone()).collect())
            .unwrap_or_default()
    }

    fn result(
        &self,
        target_cohort_id: CohortId,
        generation_id: &GenerationId,
    ) -> Option<CohortResult> {
        self.tables
            .read()
            .results
            .get(&target_cohort_id)?
            .iter()
            .find(|r| &r.generation_id == generation_id)
            .cloned()
    }

    fn latest(&self, target_cohort_id: CohortId) -> Option<CohortResult> {
        self.tables
            .read()
            .results
            .get(&target_cohort_id)?
            .last()
            .cloned()
    }
}
