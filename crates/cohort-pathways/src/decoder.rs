//! Combo decoding: recovering the event cohorts behind a combo code.

use serde::Serialize;

use crate::bit_index::BitIndexMap;
use crate::combo::ComboCode;
use crate::error::{PathwayError, PathwayResult};
use crate::types::CohortId;

/// The constituents of one combo code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboDecoding {
    /// The decoded code.
    pub code: ComboCode,
    /// 1-based cohort indices, ascending.
    pub cohort_indices: Vec<usize>,
    /// Event cohort ids, parallel to `cohort_indices`.
    pub event_cohort_ids: Vec<CohortId>,
}

impl ComboDecoding {
    /// Number of event cohorts in the combo.
    pub fn number_of_events(&self) -> usize {
        self.cohort_indices.len()
    }

    /// Returns true if more than one event cohort is present.
    pub fn is_combination(&self) -> bool {
        self.cohort_indices.len() > 1
    }
}

/// Decodes combo codes against one bit index.
#[derive(Debug, Clone, Copy)]
pub struct ComboDecoder<'a> {
    bit_index: &'a BitIndexMap,
}

impl<'a> ComboDecoder<'a> {
    /// Creates a decoder over the given bit index.
    pub fn new(bit_index: &'a BitIndexMap) -> Self {
        Self { bit_index }
    }

    /// Decomposes a code into its constituent cohorts.
    ///
    /// Walks the bit values from largest to smallest and clears every one
    /// that is set in the remaining value. Each bit value is used at most
    /// once, so this is the exact inverse of OR-composition.
    ///
    /// # Errors
    ///
    /// Returns [`PathwayError::Decoding`] for the empty code and for any code
    /// that still has a remainder once all known bit values are removed.
    pub fn decode(&self, code: &ComboCode) -> PathwayResult<ComboDecoding> {
        let mut remaining = code.clone();
        let mut cohort_indices = Vec::with_capacity(code.member_count() as usize);

        if !remaining.is_empty() {
            for cohort_index in (1..=self.bit_index.len()).rev() {
                if remaining.is_empty() {
                    break;
                }
                let bit = match self.bit_index.bit_at(cohort_index) {
                    Some(bit) => bit,
                    None => continue,
                };
                if remaining.checked_remove(bit) {
                    cohort_indices.push(cohort_index);
                }
            }
        }

        if code.is_empty() || !remaining.is_empty() {
            return Err(PathwayError::Decoding {
                code: code.clone(),
                remainder: remaining,
            });
        }

        cohort_indices.reverse();
        let event_cohort_ids = cohort_indices
            .iter()
            .filter_map(|&idx| self.bit_index.cohort_at(idx))
            .collect();

        Ok(ComboDecoding {
            code: code.clone(),
            cohort_indices,
            event_cohort_ids,
        })
    }
}
