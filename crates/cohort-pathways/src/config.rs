//! Configuration types for pathway construction.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{PathwayError, PathwayResult};
use crate::types::CohortId;

/// Default maximum number of steps kept per path.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Default collapse window in days.
pub const DEFAULT_COLLAPSE_WINDOW_DAYS: u32 = 30;

/// Default minimum cell count applied by the export layer.
pub const DEFAULT_MIN_CELL_COUNT: usize = 5;

/// Configuration for a pathway run.
///
/// Option names follow the camelCase form used by pathway analysis
/// definitions, so a JSON definition deserializes directly.
///
/// # Example
///
/// ```rust
/// use cohort_pathways::PathwayConfig;
///
/// let config = PathwayConfig::builder()
///     .with_target_cohorts([1, 2])
///     .with_event_cohorts([10, 20, 30])
///     .with_max_depth(4)
///     .with_collapse_window_days(14)
///     .build();
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PathwayConfig {
    /// Target cohorts to build pathways for.
    pub target_cohort_ids: Vec<CohortId>,
    /// Event cohorts that may appear as steps.
    pub event_cohort_ids: Vec<CohortId>,
    /// Keep consecutive steps with an identical combo code.
    #[serde(default)]
    pub allow_repeats: bool,
    /// Maximum number of steps per path.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Occurrences starting within this many days of a step's window start join that step.
    #[serde(default = "default_collapse_window_days")]
    pub collapse_window_days: u32,
    /// Suppression threshold for published counts.
    #[serde(default = "default_min_cell_count")]
    pub min_cell_count: usize,
    /// Run target cohorts and subjects in parallel (requires `parallel` feature).
    #[serde(default)]
    pub parallel: bool,
    /// Upper bound on distinct event cohorts per unit of work (None = unbounded).
    #[serde(default)]
    pub max_event_cohorts: Option<usize>,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_collapse_window_days() -> u32 {
    DEFAULT_COLLAPSE_WINDOW_DAYS
}

fn default_min_cell_count() -> usize {
    DEFAULT_MIN_CELL_COUNT
}

impl Default for PathwayConfig {
    fn default() -> Self {
        Self {
            target_cohort_ids: Vec::new(),
            event_cohort_ids: Vec::new(),
            allow_repeats: false,
            max_depth: DEFAULT_MAX_DEPTH,
            collapse_window_days: DEFAULT_COLLAPSE_WINDOW_DAYS,
            min_cell_count: DEFAULT_MIN_CELL_COUNT,
            parallel: false,
            max_event_cohorts: None,
        }
    }
}

impl PathwayConfig {
    /// Creates a new builder for PathwayConfig.
    pub fn builder() -> PathwayConfigBuilder {
        PathwayConfigBuilder::default()
    }

    /// Parses and validates a JSON pathway definition.
    ///
    /// Missing cohort lists, negative integers and unknown options are
    /// reported as configuration errors.
    pub fn from_json_str(json: &str) -> PathwayResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PathwayError::configuration(format!("invalid pathway definition: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for problems that abort a run.
    pub fn validate(&self) -> PathwayResult<()> {
        check_cohort_list("targetCohortIds", &self.target_cohort_ids)?;
        check_cohort_list("eventCohortIds", &self.event_cohort_ids)?;
        if self.max_event_cohorts == Some(0) {
            return Err(PathwayError::configuration(
                "maxEventCohorts must be at least 1 when set",
            ));
        }
        Ok(())
    }
}

fn check_cohort_list(name: &str, ids: &[CohortId]) -> PathwayResult<()> {
    if ids.is_empty() {
        return Err(PathwayError::configuration(format!("{} must not be empty", name)));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id) {
            return Err(PathwayError::configuration(format!(
                "{} contains duplicate cohort {}",
                name, id
            )));
        }
    }
    Ok(())
}

/// Builder for PathwayConfig.
#[derive(Debug, Clone, Default)]
pub struct PathwayConfigBuilder {
    config: PathwayConfig,
}

impl PathwayConfigBuilder {
    /// Sets the target cohorts.
    pub fn with_target_cohorts(mut self, ids: impl IntoIterator<Item = CohortId>) -> Self {
        self.config.target_cohort_ids = ids.into_iter().collect();
        self
    }

    /// Sets the event cohorts.
    pub fn with_event_cohorts(mut self, ids: impl IntoIterator<Item = CohortId>) -> Self {
        self.config.event_cohort_ids = ids.into_iter().collect();
        self
    }

    /// Keeps or collapses consecutive identical steps.
    pub fn with_allow_repeats(mut self, allow_repeats: bool) -> Self {
        self.config.allow_repeats = allow_repeats;
        self
    }

    /// Sets the maximum path depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Sets the collapse window.
    pub fn with_collapse_window_days(mut self, days: u32) -> Self {
        self.config.collapse_window_days = days;
        self
    }

    /// Sets the minimum cell count.
    pub fn with_min_cell_count(mut self, min_cell_count: usize) -> Self {
        self.config.min_cell_count = min_cell_count;
        self
    }

    /// Enables or disables parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Caps the number of distinct event cohorts per unit of work.
    pub fn with_max_event_cohorts(mut self, limit: usize) -> Self {
        self.config.max_event_cohorts = Some(limit);
        self
    }

    /// Builds the PathwayConfig.
    pub fn build(self) -> PathwayConfig {
        self.config
    }
}
