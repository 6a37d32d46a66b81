use std::collections::{BTreeSet, HashMap};

use chrono::{Days, NaiveDate};
use cohort_pathways::{
    aggregate_paths, BitIndexMap, CodeTableBuilder, ComboCode, ComboDecoder, EventOccurrence,
    GenerationId, PathReducer, StepBuilder, SubjectPath, TargetMembership,
};
use proptest::prelude::*;

fn anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn arb_cohorts() -> impl Strategy<Value = BTreeSet<u64>> {
    prop::collection::btree_set(1u64..10_000, 1..90)
}

/// Events as (cohort slot, day offset) pairs over a fixed cohort list.
fn arb_events() -> impl Strategy<Value = Vec<(usize, u64)>> {
    prop::collection::vec((0usize..6, 0u64..400), 0..40)
}

fn occurrences(events: &[(usize, u64)]) -> Vec<EventOccurrence> {
    let cohorts = [10u64, 20, 30, 40, 50, 60];
    events
        .iter()
        .map(|&(slot, offset)| {
            let start = anchor().checked_add_days(Days::new(offset)).unwrap();
            EventOccurrence::new(1, cohorts[slot], start, start)
        })
        .collect()
}

fn event_map() -> BitIndexMap {
    BitIndexMap::build([10, 20, 30, 40, 50, 60], None).unwrap()
}

// ── Encoding ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn decode_inverts_or_of_any_subset(cohorts in arb_cohorts(), mask in any::<u128>()) {
        let map = BitIndexMap::build(cohorts.iter().copied(), None).unwrap();
        let subset: BTreeSet<u64> = cohorts
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1u128 << (i % 128)) != 0)
            .map(|(_, &id)| id)
            .collect();
        prop_assume!(!subset.is_empty());

        let code = map.encode(subset.iter().copied());
        let decoding = ComboDecoder::new(&map).decode(&code).unwrap();

        let decoded: BTreeSet<u64> = decoding.event_cohort_ids.into_iter().collect();
        prop_assert_eq!(decoded, subset);
    }

    #[test]
    fn bit_index_is_dense_and_ascending(cohorts in arb_cohorts()) {
        let map = BitIndexMap::build(cohorts.iter().copied(), None).unwrap();
        prop_assert_eq!(map.len(), cohorts.len());
        for (rank, &id) in cohorts.iter().enumerate() {
            prop_assert_eq!(map.index_of(id), Some(rank + 1));
            let expected = ComboCode::single_bit(rank as u64);
            prop_assert_eq!(map.bit_of(id), Some(&expected));
        }
    }
}

// ── Steps and reduction ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn steps_are_never_empty_and_ordered(events in arb_events(), window in 0u32..60) {
        let map = event_map();
        let membership = TargetMembership::new(1, 100, anchor());
        let rows = occurrences(&events);

        let steps = StepBuilder::new(&map, window).build(&membership, &rows);

        let qualifying = rows.len();
        prop_assert_eq!(steps.iter().map(|s| s.event_count).sum::<usize>(), qualifying);
        for (i, step) in steps.iter().enumerate() {
            prop_assert!(!step.combo.is_empty());
            prop_assert_eq!(step.ordinal, i + 1);
        }
        for pair in steps.windows(2) {
            prop_assert!((pair[1].window_start - pair[0].window_start).num_days() > i64::from(window));
        }
    }

    #[test]
    fn step_building_ignores_input_order(events in arb_events(), window in 0u32..60) {
        let map = event_map();
        let membership = TargetMembership::new(1, 100, anchor());
        let rows = occurrences(&events);
        let mut reversed = rows.clone();
        reversed.reverse();

        let builder = StepBuilder::new(&map, window);
        prop_assert_eq!(builder.build(&membership, &rows), builder.build(&membership, &reversed));
    }

    #[test]
    fn reduced_paths_respect_depth_and_repeats(
        events in arb_events(),
        window in 0u32..60,
        max_depth in 0usize..8,
        allow_repeats in any::<bool>(),
    ) {
        let map = event_map();
        let membership = TargetMembership::new(1, 100, anchor());
        let steps = StepBuilder::new(&map, window).build(&membership, &occurrences(&events));

        let codes = PathReducer::new(allow_repeats, max_depth).reduce(&steps);

        prop_assert!(codes.len() <= max_depth);
        if !allow_repeats {
            for pair in codes.windows(2) {
                prop_assert_ne!(&pair[0], &pair[1]);
            }
        }
    }
}

// ── Aggregation and code tables ───────────────────────────────────────────

fn arb_paths() -> impl Strategy<Value = Vec<Vec<u64>>> {
    prop::collection::vec(prop::collection::vec(1u64..8, 1..5), 0..30)
}

fn subject_paths(raw: &[Vec<u64>]) -> Vec<SubjectPath> {
    raw.iter()
        .enumerate()
        .map(|(i, codes)| SubjectPath {
            target_cohort_id: 100,
            subject_id: i as u64,
            step_codes: codes.iter().map(|&c| ComboCode::from(c)).collect(),
        })
        .collect()
}

proptest! {
    #[test]
    fn aggregation_is_order_independent(
        (paths, shuffled) in arb_paths().prop_flat_map(|raw| {
            let paths = subject_paths(&raw);
            (Just(paths.clone()), Just(paths).prop_shuffle())
        })
    ) {
        let generation = GenerationId::new("g");

        let left = aggregate_paths(&generation, 100, &paths);
        let right = aggregate_paths(&generation, 100, &shuffled);

        prop_assert_eq!(&left, &right);
        prop_assert_eq!(left.iter().map(|r| r.subject_count).sum::<usize>(), paths.len());
    }

    #[test]
    fn code_tables_are_idempotent(raw in arb_paths()) {
        let map = BitIndexMap::build([10, 20, 30], None).unwrap();
        let names: HashMap<u64, String> = HashMap::new();
        let generation = GenerationId::new("g");
        let records = aggregate_paths(&generation, 100, &subject_paths(&raw));
        let builder = CodeTableBuilder::new(&map, &names);

        let first = builder
            .build(&generation, 100, records.iter().flat_map(|r| r.step_codes.iter()))
            .unwrap();
        let second = builder
            .build(&generation, 100, records.iter().rev().flat_map(|r| r.step_codes.iter()))
            .unwrap();

        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
