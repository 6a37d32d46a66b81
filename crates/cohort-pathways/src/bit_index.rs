//! Bit index assignment: dense positions and bit values for event cohorts.

use std::collections::HashMap;

use serde::Serialize;

use crate::combo::ComboCode;
use crate::error::{PathwayError, PathwayResult};
use crate::types::CohortId;

/// One row of a [`BitIndexMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BitIndexEntry {
    /// The event cohort.
    pub event_cohort_id: CohortId,
    /// Dense 1-based position.
    pub cohort_index: usize,
    /// `2^(cohort_index - 1)`.
    pub bit_value: ComboCode,
}

/// Mapping from event cohort id to a dense index and a power-of-two bit value.
///
/// Cohorts are ranked by ascending id, so the same set of instantiated
/// cohorts always yields the same mapping. The map is immutable after
/// construction; every combo code produced and decoded within a unit of
/// work goes through the same instance.
///
/// # Example
///
/// ```rust
/// use cohort_pathways::{BitIndexMap, ComboCode};
///
/// let map = BitIndexMap::build([20, 10], None).unwrap();
/// assert_eq!(map.index_of(10), Some(1));
/// assert_eq!(map.bit_of(20), Some(&ComboCode::from(2)));
/// ```
#[derive(Clone)]
pub struct BitIndexMap {
    /// Position `i` holds the cohort with index `i + 1`.
    cohorts: Vec<CohortId>,
    /// Bit values, parallel to `cohorts`.
    bits: Vec<ComboCode>,
    /// Cohort id -> zero-based position.
    positions: HashMap<CohortId, usize>,
}

impl BitIndexMap {
    /// Builds the map from the instantiated event cohort ids.
    ///
    /// Duplicates are ignored. Fails with a configuration error when the
    /// set is empty or exceeds `max_cohorts`.
    pub fn build<I: IntoIterator<Item = CohortId>>(
        instantiated: I,
        max_cohorts: Option<usize>,
    ) -> PathwayResult<Self> {
        let mut cohorts: Vec<CohortId> = instantiated.into_iter().collect();
        cohorts.sort_unstable();
        cohorts.dedup();

        if cohorts.is_empty() {
            return Err(PathwayError::configuration("no instantiated event cohorts"));
        }
        if let Some(limit) = max_cohorts {
            if cohorts.len() > limit {
                return Err(PathwayError::configuration(format!(
                    "{} instantiated event cohorts exceed maxEventCohorts {}",
                    cohorts.len(),
                    limit
                )));
            }
        }

        let bits = (0..cohorts.len() as u64).map(ComboCode::single_bit).collect();
        let positions = cohorts
            .iter()
            .enumerate()
            .map(|(pos, &id)| (id, pos))
            .collect();

        Ok(Self {
            cohorts,
            bits,
            positions,
        })
    }

    /// Gets the 1-based cohort index for an event cohort.
    #[inline]
    pub fn index_of(&self, event_cohort_id: CohortId) -> Option<usize> {
        self.positions.get(&event_cohort_id).map(|pos| pos + 1)
    }

    /// Gets the bit value for an event cohort.
    #[inline]
    pub fn bit_of(&self, event_cohort_id: CohortId) -> Option<&ComboCode> {
        self.positions.get(&event_cohort_id).map(|&pos| &self.bits[pos])
    }

    /// Gets the event cohort at a 1-based cohort index.
    #[inline]
    pub fn cohort_at(&self, cohort_index: usize) -> Option<CohortId> {
        cohort_index
            .checked_sub(1)
            .and_then(|pos| self.cohorts.get(pos))
            .copied()
    }

    /// Gets the bit value at a 1-based cohort index.
    #[inline]
    pub fn bit_at(&self, cohort_index: usize) -> Option<&ComboCode> {
        cohort_index.checked_sub(1).and_then(|pos| self.bits.get(pos))
    }

    /// Returns true if the event cohort has a bit assigned.
    #[inline]
    pub fn contains(&self, event_cohort_id: CohortId) -> bool {
        self.positions.contains_key(&event_cohort_id)
    }

    /// Returns the number of assigned cohorts.
    #[inline]
    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    /// Always false for a successfully built map.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    /// Returns the event cohort ids in index order.
    pub fn cohort_ids(&self) -> impl Iterator<Item = CohortId> + '_ {
        self.cohorts.iter().copied()
    }

    /// Returns every entry in index order.
    pub fn entries(&self) -> impl Iterator<Item = BitIndexEntry> + '_ {
        self.cohorts
            .iter()
            .zip(&self.bits)
            .enumerate()
            .map(|(pos, (&id, bit))| BitIndexEntry {
                event_cohort_id: id,
                cohort_index: pos + 1,
                bit_value: bit.clone(),
            })
    }

    /// Encodes a set of event cohorts as a combo code.
    ///
    /// Cohorts without an assigned bit are ignored.
    pub fn encode<I: IntoIterator<Item = CohortId>>(&self, event_cohort_ids: I) -> ComboCode {
        let mut code = ComboCode::empty();
        for id in event_cohort_ids {
            if let Some(bit) = self.bit_of(id) {
                code |= bit;
            }
        }
        code
    }
}

impl std::fmt::Debug for BitIndexMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitIndexMap")
            .field("len", &self.len())
            .field("cohorts", &self.cohorts)
            .finish()
    }
}
