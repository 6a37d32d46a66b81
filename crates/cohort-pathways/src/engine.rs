//! Pathway engine: availability checks, generation ids and unit scheduling.

use std::fmt;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::aggregate::PathRecord;
use crate::bit_index::BitIndexMap;
use crate::config::PathwayConfig;
use crate::error::{PathwayError, PathwayResult};
use crate::generation::{GenerationId, GenerationIdSource, UuidGenerationSource};
use crate::traits::CohortSource;
use crate::types::{CohortId, CohortSide};
use crate::unit::{CohortResult, PathwayUnit};

/// Some, but not all, configured cohorts of one side are instantiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityWarning {
    /// Side of the analysis.
    pub side: CohortSide,
    /// Configured cohorts with at least one row.
    pub instantiated: Vec<CohortId>,
    /// Configured cohorts with no rows.
    pub missing: Vec<CohortId>,
}

impl fmt::Display for AvailabilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} configured {} cohorts instantiated; missing {:?}",
            self.instantiated.len(),
            self.instantiated.len() + self.missing.len(),
            self.side,
            self.missing
        )
    }
}

/// Instantiated cohorts on both sides of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Availability {
    /// Instantiated target cohorts, in configured order.
    pub targets: Vec<CohortId>,
    /// Instantiated event cohorts, in configured order.
    pub events: Vec<CohortId>,
    /// Partial availability on either side.
    pub warnings: Vec<AvailabilityWarning>,
}

/// What happened to one target cohort.
#[derive(Debug)]
pub enum CohortOutcome {
    /// The unit of work finished and produced output.
    Completed(CohortResult),
    /// Pathway construction was skipped (e.g. no event cohorts for this target).
    Skipped {
        /// Target cohort.
        target_cohort_id: CohortId,
        /// Generation allocated to the unit.
        generation_id: GenerationId,
        /// Why nothing was produced.
        reason: String,
    },
    /// The unit of work failed; none of its output exists.
    Failed {
        /// Target cohort.
        target_cohort_id: CohortId,
        /// Generation allocated to the unit.
        generation_id: GenerationId,
        /// The failure.
        error: PathwayError,
    },
}

impl CohortOutcome {
    /// Target cohort of the unit.
    pub fn target_cohort_id(&self) -> CohortId {
        match self {
            CohortOutcome::Completed(result) => result.target_cohort_id,
            CohortOutcome::Skipped {
                target_cohort_id, ..
            }
            | CohortOutcome::Failed {
                target_cohort_id, ..
            } => *target_cohort_id,
        }
    }

    /// Generation allocated to the unit.
    pub fn generation_id(&self) -> &GenerationId {
        match self {
            CohortOutcome::Completed(result) => &result.generation_id,
            CohortOutcome::Skipped { generation_id, .. }
            | CohortOutcome::Failed { generation_id, .. } => generation_id,
        }
    }

    /// The result, if the unit completed.
    pub fn result(&self) -> Option<&CohortResult> {
        match self {
            CohortOutcome::Completed(result) => Some(result),
            _ => None,
        }
    }
}

/// Merged outcome of a run, one entry per instantiated target cohort.
#[derive(Debug, Default)]
pub struct PathwayReport {
    /// Outcomes in configured target order.
    pub outcomes: Vec<CohortOutcome>,
    /// Partial availability detected before the run.
    pub warnings: Vec<AvailabilityWarning>,
}

impl PathwayReport {
    /// Results of completed units.
    pub fn completed(&self) -> impl Iterator<Item = &CohortResult> {
        self.outcomes.iter().filter_map(CohortOutcome::result)
    }

    /// Looks up the result for a target cohort.
    pub fn result_for(&self, target_cohort_id: CohortId) -> Option<&CohortResult> {
        self.completed()
            .find(|r| r.target_cohort_id == target_cohort_id)
    }

    /// Path records of every completed unit.
    pub fn path_records(&self) -> impl Iterator<Item = &PathRecord> {
        self.completed().flat_map(|r| r.path_records.iter())
    }

    /// Outcomes that were skipped.
    pub fn skipped(&self) -> impl Iterator<Item = &CohortOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CohortOutcome::Skipped { .. }))
    }

    /// Outcomes that failed.
    pub fn failed(&self) -> impl Iterator<Item = &CohortOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CohortOutcome::Failed { .. }))
    }

    /// Returns true if every unit completed.
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o, CohortOutcome::Completed(_)))
    }

    /// Consumes the report, keeping only completed results.
    pub fn into_results(self) -> Vec<CohortResult> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                CohortOutcome::Completed(result) => Some(result),
                _ => None,
            })
            .collect()
    }
}

/// Main pathway engine.
///
/// The engine bridges a [`CohortSource`] and the per-target
/// [`PathwayUnit`]: it validates the configuration, checks which cohorts
/// are instantiated, allocates one generation id per target cohort and
/// runs the units, in parallel when the `parallel` feature is enabled and
/// requested.
///
/// # Example
///
/// ```ignore
/// use cohort_pathways::{PathwayConfig, PathwayEngine};
///
/// let config = PathwayConfig::builder()
///     .with_target_cohorts([1])
///     .with_event_cohorts([10, 20])
///     .build();
///
/// let engine = PathwayEngine::new(&source, config);
/// let report = engine.run()?;
/// for record in report.path_records() {
///     println!("{:?} -> {}", record.step_codes, record.subject_count);
/// }
/// ```
pub struct PathwayEngine<'a> {
    source: &'a dyn CohortSource,
    config: PathwayConfig,
    generations: Box<dyn GenerationIdSource + 'a>,
}

impl<'a> PathwayEngine<'a> {
    /// Creates an engine that allocates UUID generation ids.
    pub fn new(source: &'a dyn CohortSource, config: PathwayConfig) -> Self {
        Self {
            source,
            config,
            generations: Box::new(UuidGenerationSource),
        }
    }

    /// Replaces the generation id source.
    pub fn with_generation_source(mut self, generations: impl GenerationIdSource + 'a) -> Self {
        self.generations = Box::new(generations);
        self
    }

    /// Returns a reference to the engine configuration.
    pub fn config(&self) -> &PathwayConfig {
        &self.config
    }

    /// Checks which configured cohorts are instantiated.
    ///
    /// # Errors
    ///
    /// Returns [`PathwayError::DataAvailability`] if no configured cohort of
    /// one side is instantiated, or a source error.
    pub fn check_availability(&self) -> PathwayResult<Availability> {
        let mut availability = Availability::default();
        let (targets, target_warning) =
            self.instantiated(CohortSide::Target, &self.config.target_cohort_ids)?;
        let (events, event_warning) =
            self.instantiated(CohortSide::Event, &self.config.event_cohort_ids)?;

        availability.targets = targets;
        availability.events = events;
        availability.warnings.extend(target_warning);
        availability.warnings.extend(event_warning);
        Ok(availability)
    }

    fn instantiated(
        &self,
        side: CohortSide,
        configured: &[CohortId],
    ) -> PathwayResult<(Vec<CohortId>, Option<AvailabilityWarning>)> {
        let mut instantiated = Vec::with_capacity(configured.len());
        let mut missing = Vec::new();
        for &id in configured {
            if self.source.cohort_count(id)? > 0 {
                instantiated.push(id);
            } else {
                missing.push(id);
            }
        }

        if instantiated.is_empty() {
            return Err(PathwayError::DataAvailability {
                side,
                configured: configured.to_vec(),
            });
        }

        let warning = (!missing.is_empty()).then(|| AvailabilityWarning {
            side,
            instantiated: instantiated.clone(),
            missing,
        });
        Ok((instantiated, warning))
    }

    /// Runs every instantiated target cohort.
    ///
    /// Configuration and total availability problems abort before any unit
    /// starts. Problems inside one unit are reported in its
    /// [`CohortOutcome`] and do not affect the other units.
    pub fn run(&self) -> PathwayResult<PathwayReport> {
        self.config.validate()?;
        let availability = self.check_availability()?;
        for warning in &availability.warnings {
            warn!(side = %warning.side, missing = ?warning.missing, "partial cohort availability");
        }

        let bit_index = self.bit_index(&availability.events)?;

        // Ids are allocated up front so every unit owns its id before it writes anything.
        let jobs: Vec<(CohortId, GenerationId)> = availability
            .targets
            .iter()
            .map(|&target| (target, self.generations.next_id()))
            .collect();

        info!(
            targets = jobs.len(),
            event_cohorts = bit_index.len(),
            parallel = self.config.parallel,
            "starting pathway run"
        );

        let unit = PathwayUnit::new(&self.config, self.source);
        let bit_index = &bit_index;
        let run_job = |(target, generation): &(CohortId, GenerationId)| -> CohortOutcome {
            outcome_of(*target, generation, unit.run(*target, generation.clone(), bit_index))
        };

        #[cfg(feature = "parallel")]
        let outcomes: Vec<CohortOutcome> = if self.config.parallel {
            use rayon::prelude::*;
            jobs.par_iter().map(&run_job).collect()
        } else {
            jobs.iter().map(&run_job).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<CohortOutcome> = jobs.iter().map(&run_job).collect();

        Ok(PathwayReport {
            outcomes,
            warnings: availability.warnings,
        })
    }

    /// Runs a single target cohort with a caller-supplied generation id.
    ///
    /// The bit index is built from the instantiated event cohorts exactly
    /// as [`run`](Self::run) builds it, so codes match a full run over the
    /// same source.
    pub fn run_target(
        &self,
        target_cohort_id: CohortId,
        generation_id: GenerationId,
    ) -> PathwayResult<CohortResult> {
        self.config.validate()?;
        let (events, _) = self.instantiated(CohortSide::Event, &self.config.event_cohort_ids)?;
        let bit_index = self.bit_index(&events)?;
        PathwayUnit::new(&self.config, self.source).run(target_cohort_id, generation_id, &bit_index)
    }

    /// Assigns bits to the instantiated event cohorts, once per run.
    fn bit_index(&self, events: &[CohortId]) -> PathwayResult<BitIndexMap> {
        BitIndexMap::build(events.iter().copied(), self.config.max_event_cohorts)
    }
}

fn outcome_of(
    target_cohort_id: CohortId,
    generation_id: &GenerationId,
    result: PathwayResult<CohortResult>,
) -> CohortOutcome {
    match result {
        Ok(result) => CohortOutcome::Completed(result),
        Err(PathwayError::Configuration(reason)) => {
            warn!(target_cohort = target_cohort_id, %reason, "skipping target cohort");
            CohortOutcome::Skipped {
                target_cohort_id,
                generation_id: generation_id.clone(),
                reason,
            }
        }
        Err(err) => {
            error!(target_cohort = target_cohort_id, error = %err, "target cohort failed");
            CohortOutcome::Failed {
                target_cohort_id,
                generation_id: generation_id.clone(),
                error: err,
            }
        }
    }
}
