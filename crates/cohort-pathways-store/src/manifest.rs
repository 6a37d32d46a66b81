//! Manifest describing one pathway run.

use chrono::{DateTime, Utc};
use cohort_pathways::{CohortId, CohortOutcome, GenerationId, PathwayConfig, PathwayReport};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::fingerprint::fingerprint_hex;

/// Manifest for the output of one run.
///
/// The manifest records the configuration the run used, when it was
/// written, and one entry per target cohort with its generation id,
/// status, row counts and content fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunManifest {
    /// Timestamp when the manifest was created.
    pub created_at: DateTime<Utc>,
    /// Version of the engine that produced the output.
    pub engine_version: String,
    /// Configuration of the run.
    pub config: PathwayConfig,
    /// Partial availability messages.
    pub warnings: Vec<String>,
    /// Per-target-cohort entries.
    pub cohorts: Vec<ManifestEntry>,
}

/// Entry for a single target cohort in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Target cohort.
    pub target_cohort_id: CohortId,
    /// Generation allocated to the cohort's unit of work.
    pub generation_id: GenerationId,
    /// How the unit ended.
    pub status: CohortStatus,
    /// Number of distinct paths.
    pub path_count: usize,
    /// Number of distinct codes.
    pub code_count: usize,
    /// Subjects with a non-empty path.
    pub subject_count: usize,
    /// Content fingerprint, for completed cohorts.
    pub fingerprint: Option<String>,
    /// Skip reason or error message.
    pub message: Option<String>,
}

/// How a target cohort's unit of work ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CohortStatus {
    /// Output was produced.
    Completed,
    /// Nothing to build for the cohort.
    Skipped,
    /// The unit failed.
    Failed,
}

impl ManifestEntry {
    fn from_outcome(outcome: &CohortOutcome) -> StoreResult<Self> {
        let mut entry = Self {
            target_cohort_id: outcome.target_cohort_id(),
            generation_id: outcome.generation_id().clone(),
            status: CohortStatus::Completed,
            path_count: 0,
            code_count: 0,
            subject_count: 0,
            fingerprint: None,
            message: None,
        };
        match outcome {
            CohortOutcome::Completed(result) => {
                entry.path_count = result.path_records.len();
                entry.code_count = result.code_tables.codes.len();
                entry.subject_count = result.summary.pathway_count;
                entry.fingerprint = Some(fingerprint_hex(result)?);
            }
            CohortOutcome::Skipped { reason, .. } => {
                entry.status = CohortStatus::Skipped;
                entry.message = Some(reason.clone());
            }
            CohortOutcome::Failed { error, .. } => {
                entry.status = CohortStatus::Failed;
                entry.message = Some(error.to_string());
            }
        }
        Ok(entry)
    }
}

impl RunManifest {
    /// Creates a new empty manifest.
    pub fn new(config: PathwayConfig) -> Self {
        Self {
            created_at: Utc::now(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            warnings: Vec::new(),
            cohorts: Vec::new(),
        }
    }

    /// Builds a manifest describing a finished run.
    pub fn from_report(config: &PathwayConfig, report: &PathwayReport) -> StoreResult<Self> {
        let mut manifest = Self::new(config.clone());
        manifest.warnings = report.warnings.iter().map(ToString::to_string).collect();
        for outcome in &report.outcomes {
            manifest.add_entry(ManifestEntry::from_outcome(outcome)?);
        }
        Ok(manifest)
    }

    /// Adds a cohort entry to the manifest.
    pub fn add_entry(&mut self, entry: ManifestEntry) {
        self.cohorts.push(entry);
    }

    /// Returns the number of cohort entries.
    pub fn count(&self) -> usize {
        self.cohorts.len()
    }

    /// Returns the number of entries with the given status.
    pub fn count_with(&self, status: CohortStatus) -> usize {
        self.cohorts.iter().filter(|e| e.status == status).count()
    }

    /// Returns the total number of distinct paths across all cohorts.
    pub fn total_paths(&self) -> usize {
        self.cohorts.iter().map(|e| e.path_count).sum()
    }

    /// Finds the entry for a target cohort.
    pub fn get_entry(&self, target_cohort_id: CohortId) -> Option<&ManifestEntry> {
        self.cohorts
            .iter()
            .find(|e| e.target_cohort_id == target_cohort_id)
    }

    /// Saves the manifest to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> StoreResult<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| StoreError::io_error(path, e))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(())
    }

    /// Loads a manifest from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| StoreError::io_error(path, e))?;
        let reader = BufReader::new(file);
        let manifest: Self = serde_json::from_reader(reader)
            .map_err(|e| StoreError::Deserialization(e.to_string()))?;
        Ok(manifest)
    }
}

impl std::fmt::Display for RunManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Pathway Run Manifest")?;
        writeln!(f, "  Created:         {}", self.created_at)?;
        writeln!(f, "  Engine:          {}", self.engine_version)?;
        writeln!(f, "  Target Cohorts:  {}", self.count())?;
        writeln!(
            f,
            "  Completed:       {}",
            self.count_with(CohortStatus::Completed)
        )?;
        writeln!(
            f,
            "  Skipped:         {}",
            self.count_with(CohortStatus::Skipped)
        )?;
        writeln!(
            f,
            "  Failed:          {}",
            self.count_with(CohortStatus::Failed)
        )?;
        writeln!(f, "  Total Paths:     {}", self.total_paths())?;
        Ok(())
    }
}
