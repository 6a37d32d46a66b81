//! Minimum-cell-count suppression applied before publishing results.

use cohort_pathways::{CodeStat, CohortResult, PathRecord, PathwayConfig};
use tracing::debug;

/// Rows that survived suppression plus what was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suppressed<T> {
    /// Rows at or above the threshold.
    pub kept: Vec<T>,
    /// Number of rows removed.
    pub suppressed_rows: usize,
    /// Subjects represented by the removed rows.
    pub suppressed_subjects: usize,
}

/// Drops rows whose subject count is below a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuppressionPolicy {
    min_cell_count: usize,
}

impl SuppressionPolicy {
    /// Creates a policy with an explicit threshold. Zero keeps every row.
    pub fn new(min_cell_count: usize) -> Self {
        Self { min_cell_count }
    }

    /// Uses the configured `minCellCount`.
    pub fn from_config(config: &PathwayConfig) -> Self {
        Self::new(config.min_cell_count)
    }

    /// Returns the threshold.
    pub fn min_cell_count(&self) -> usize {
        self.min_cell_count
    }

    /// Returns true if a count may be published.
    pub fn allows(&self, subject_count: usize) -> bool {
        subject_count >= self.min_cell_count
    }

    /// Suppresses path records.
    pub fn paths(&self, records: &[PathRecord]) -> Suppressed<PathRecord> {
        self.filter(records, |r| r.subject_count)
    }

    /// Suppresses per-code stats on their subject count.
    pub fn code_stats(&self, stats: &[CodeStat]) -> Suppressed<CodeStat> {
        self.filter(stats, |s| s.subject_count)
    }

    /// Returns a copy of the result with small cells removed.
    ///
    /// Code tables and the summary are left as they are; they carry no
    /// per-path counts.
    pub fn apply(&self, result: &CohortResult) -> CohortResult {
        let paths = self.paths(&result.path_records);
        let stats = self.code_stats(&result.code_stats);
        debug!(
            target_cohort = result.target_cohort_id,
            min_cell_count = self.min_cell_count,
            paths_suppressed = paths.suppressed_rows,
            stats_suppressed = stats.suppressed_rows,
            "applied cell suppression"
        );
        CohortResult {
            path_records: paths.kept,
            code_stats: stats.kept,
            ..result.clone()
        }
    }

    fn filter<T: Clone>(&self, rows: &[T], count: impl Fn(&T) -> usize) -> Suppressed<T> {
        let mut kept = Vec::with_capacity(rows.len());
        let mut suppressed_rows = 0;
        let mut suppressed_subjects = 0;
        for row in rows {
            let n = count(row);
            if self.allows(n) {
                kept.push(row.clone());
            } else {
                suppressed_rows += 1;
                suppressed_subjects += n;
            }
        }
        Suppressed {
            kept,
            suppressed_rows,
            suppressed_subjects,
        }
    }
}

impl Default for SuppressionPolicy {
    fn default() -> Self {
        Self::new(cohort_pathways::DEFAULT_MIN_CELL_COUNT)
    }
}
