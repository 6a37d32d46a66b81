//! Error types for pathway construction.

use crate::combo::ComboCode;
use crate::types::{CohortId, CohortSide};

/// Errors that can occur while building cohort pathways.
#[derive(thiserror::Error, Debug)]
pub enum PathwayError {
    /// Invalid or missing parameter, or an empty event cohort set for a unit of work.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// None of the configured cohorts on one side are instantiated.
    #[error("No instantiated {side} cohorts among configured {configured:?}")]
    DataAvailability {
        /// Side of the analysis with no data.
        side: CohortSide,
        /// The cohort ids that were configured for that side.
        configured: Vec<CohortId>,
    },

    /// A combo code that the current bit index cannot have produced.
    #[error("Combo code {code} cannot be decoded: {remainder} remains after removing known bit values")]
    Decoding {
        /// The code being decoded.
        code: ComboCode,
        /// Value left over after greedy decomposition.
        remainder: ComboCode,
    },

    /// Error reported by the cohort source.
    #[error("Cohort source error: {0}")]
    Source(String),
}

impl PathwayError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a source error.
    pub fn source_error(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }
}

/// Result type for pathway operations.
pub type PathwayResult<T> = std::result::Result<T, PathwayError>;
