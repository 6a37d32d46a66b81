//! Error types for the store crate.

use std::path::PathBuf;

use cohort_pathways::{CohortId, GenerationId};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while storing or exporting results.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Records for this generation are already present.
    #[error("Generation {generation_id} already stored for target cohort {target_cohort_id}")]
    GenerationExists {
        /// Target cohort of the rejected result.
        target_cohort_id: CohortId,
        /// Generation already present.
        generation_id: GenerationId,
    },

    /// Output for the target cohort exists and the policy forbids replacing it.
    #[error("Target cohort {target_cohort_id} already has stored output")]
    TargetExists {
        /// Target cohort with existing output.
        target_cohort_id: CohortId,
    },

    /// I/O error while reading or writing a manifest.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl StoreError {
    /// Creates an I/O error with path context.
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
