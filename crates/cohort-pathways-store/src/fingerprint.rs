//! Content fingerprints of cohort results.
//!
//! Two runs over the same inputs differ only in their generation ids. The
//! fingerprint hashes everything else, so replays can be compared without
//! looking at individual rows.

use cohort_pathways::{BitIndexEntry, CohortId, CohortResult, ComboCode};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{StoreError, StoreResult};

/// Generation-free view of a result, in output order.
#[derive(Serialize)]
struct Canonical<'a> {
    target_cohort_id: CohortId,
    bit_index: &'a [BitIndexEntry],
    paths: Vec<(&'a [ComboCode], usize)>,
    codes: Vec<(&'a ComboCode, &'a str, bool)>,
    long: Vec<(&'a ComboCode, CohortId, &'a str, usize)>,
    stats: Vec<(&'a ComboCode, usize, usize)>,
    subjects: (usize, usize),
}

impl<'a> Canonical<'a> {
    fn of(result: &'a CohortResult) -> Self {
        Self {
            target_cohort_id: result.target_cohort_id,
            bit_index: &result.bit_index,
            paths: result
                .path_records
                .iter()
                .map(|r| (r.step_codes.as_slice(), r.subject_count))
                .collect(),
            codes: result
                .code_tables
                .codes
                .iter()
                .map(|e| (&e.code, e.display_name.as_str(), e.is_combination))
                .collect(),
            long: result
                .code_tables
                .long
                .iter()
                .map(|e| {
                    (
                        &e.code,
                        e.event_cohort_id,
                        e.event_cohort_name.as_str(),
                        e.number_of_events,
                    )
                })
                .collect(),
            stats: result
                .code_stats
                .iter()
                .map(|s| (&s.code, s.subject_count, s.event_count))
                .collect(),
            subjects: (
                result.summary.target_cohort_count,
                result.summary.pathway_count,
            ),
        }
    }
}

/// Computes the SHA-256 fingerprint of a result, ignoring its generation id.
pub fn fingerprint(result: &CohortResult) -> StoreResult<[u8; 32]> {
    let bytes = serde_json::to_vec(&Canonical::of(result))
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hasher.finalize().into())
}

/// Returns the fingerprint as a hex string.
pub fn fingerprint_hex(result: &CohortResult) -> StoreResult<String> {
    fingerprint(result).map(|digest| hex::encode(&digest))
}

/// Returns true if two results carry the same content.
pub fn same_content(a: &CohortResult, b: &CohortResult) -> StoreResult<bool> {
    Ok(fingerprint(a)? == fingerprint(b)?)
}

/// Helper module for hex encoding (minimal implementation).
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cohort_pathways::{
        EventOccurrence, GenerationId, InMemoryCohortSource, PathwayConfig, PathwayEngine,
        TargetMembership,
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    fn run(source: &InMemoryCohortSource, generation: &str) -> CohortResult {
        let config = PathwayConfig::builder()
            .with_target_cohorts([100])
            .with_event_cohorts([10, 20])
            .build();
        PathwayEngine::new(source, config)
            .run_target(100, GenerationId::new(generation))
            .unwrap()
    }

    fn source() -> InMemoryCohortSource {
        InMemoryCohortSource::new()
            .with_membership(TargetMembership::new(1, 100, day(1)))
            .with_occurrence(EventOccurrence::new(1, 10, day(2), day(2)))
            .with_occurrence(EventOccurrence::new(1, 20, day(3), day(3)))
    }

    #[test]
    fn test_fingerprint_ignores_generation() {
        let source = source();
        let a = run(&source, "g1");
        let b = run(&source, "g2");

        assert_ne!(a.generation_id, b.generation_id);
        assert!(same_content(&a, &b).unwrap());
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let a = run(&source(), "g1");
        let b = run(
            &source()
                .with_membership(TargetMembership::new(2, 100, day(1)))
                .with_occurrence(EventOccurrence::new(2, 10, day(5), day(5))),
            "g1",
        );
        assert!(!same_content(&a, &b).unwrap());
    }

    #[test]
    fn test_fingerprint_hex() {
        let hex = fingerprint_hex(&run(&source(), "g1")).unwrap();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
