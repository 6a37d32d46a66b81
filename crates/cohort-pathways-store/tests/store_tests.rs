//! Engine-to-store integration tests.

use std::sync::Arc;
use std::thread;

use chrono::{Days, NaiveDate};
use cohort_pathways::{
    EventOccurrence, GenerationId, InMemoryCohortSource, PathwayConfig, PathwayEngine,
    SequentialGenerationSource, TargetMembership,
};
use cohort_pathways_store::{
    same_content, CohortStatus, InMemoryPathwayStore, OverwritePolicy, PathwayStore, RunManifest,
    StoreError, SuppressionPolicy,
};
use tempfile::tempdir;

fn day(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 6, 1)
        .unwrap()
        .checked_add_days(Days::new(offset))
        .unwrap()
}

/// Three target cohorts of different sizes over two event cohorts.
fn source() -> InMemoryCohortSource {
    let mut source = InMemoryCohortSource::new()
        .with_name(10, "Metformin")
        .with_name(20, "Insulin");
    for subject in 0..30u64 {
        let target = 100 + subject % 3;
        source.extend_memberships([TargetMembership::new(subject, target, day(0))]);
        source.extend_occurrences([EventOccurrence::new(subject, 10, day(1), day(1))]);
        if subject % 2 == 0 {
            source.extend_occurrences([EventOccurrence::new(subject, 20, day(60), day(60))]);
        }
    }
    source
}

fn config() -> PathwayConfig {
    PathwayConfig::builder()
        .with_target_cohorts([100, 101, 102])
        .with_event_cohorts([10, 20])
        .with_min_cell_count(5)
        .build()
}

#[test]
fn test_commit_report_stores_every_completed_cohort() {
    let source = source();
    let report = PathwayEngine::new(&source, config()).run().unwrap();

    let store = InMemoryPathwayStore::new();
    assert_eq!(store.commit_report(&report).unwrap(), 3);
    assert_eq!(store.target_cohorts(), vec![100, 101, 102]);

    for result in report.completed() {
        let stored = store.latest(result.target_cohort_id).unwrap();
        assert_eq!(stored.generation_id, result.generation_id);
        assert_eq!(stored.path_records, result.path_records);
    }
}

#[test]
fn test_report_commit_is_all_or_nothing() {
    let source = source();
    let engine = PathwayEngine::new(&source, config())
        .with_generation_source(SequentialGenerationSource::with_prefix("r"));
    let first = engine.run().unwrap();

    let store = InMemoryPathwayStore::with_policy(OverwritePolicy::FailIfPresent);
    // only target 101 is present before the commit
    store.append(first.result_for(101).unwrap()).unwrap();

    let err = store.commit_report(&first).unwrap_err();
    assert!(matches!(
        err,
        StoreError::TargetExists {
            target_cohort_id: 101
        }
    ));
    assert_eq!(store.target_cohorts(), vec![101]);
}

#[test]
fn test_concurrent_appends_do_not_interfere() {
    let source = source();
    let engine = PathwayEngine::new(&source, config());
    let results: Vec<_> = [100u64, 101, 102]
        .iter()
        .flat_map(|&target| {
            (0..4).map(move |n| (target, GenerationId::new(format!("{target}-{n}"))))
        })
        .map(|(target, generation)| engine.run_target(target, generation).unwrap())
        .collect();

    let store = Arc::new(InMemoryPathwayStore::new());
    thread::scope(|scope| {
        for result in &results {
            let store = Arc::clone(&store);
            scope.spawn(move || store.append(result).unwrap());
        }
    });

    for target in [100u64, 101, 102] {
        let generations = store.generations(target);
        assert_eq!(generations.len(), 4);
        for generation in &generations {
            let stored = store.result(target, generation).unwrap();
            assert!(stored
                .path_records
                .iter()
                .all(|r| r.target_cohort_id == target && &r.generation_id == generation));
        }
    }
    assert_eq!(store.stats().appended, 12);
}

#[test]
fn test_replay_replaced_with_same_content() {
    let source = source();
    let engine = PathwayEngine::new(&source, config());
    let store = InMemoryPathwayStore::with_policy(OverwritePolicy::Replace);

    let first = engine.run_target(100, GenerationId::new("a")).unwrap();
    let second = engine.run_target(100, GenerationId::new("b")).unwrap();
    store.append(&first).unwrap();
    store.append(&second).unwrap();

    assert_eq!(store.generations(100), vec![GenerationId::new("b")]);
    assert!(same_content(&first, &store.latest(100).unwrap()).unwrap());
}

#[test]
fn test_manifest_and_suppression_for_export() {
    let source = source();
    let config = config();
    let report = PathwayEngine::new(&source, config.clone()).run().unwrap();

    let manifest = RunManifest::from_report(&config, &report).unwrap();
    assert_eq!(manifest.count_with(CohortStatus::Completed), 3);

    let dir = tempdir().unwrap();
    let path = dir.path().join("run.json");
    manifest.save(&path).unwrap();
    assert_eq!(RunManifest::load(&path).unwrap().total_paths(), manifest.total_paths());

    // target 100 holds subjects 0,3,...,27: five with both events, five with one
    let policy = SuppressionPolicy::from_config(&config);
    let result = report.result_for(100).unwrap();
    let published = policy.apply(result);
    assert_eq!(result.subject_total(), 10);
    assert!(published.path_records.iter().all(|r| r.subject_count >= 5));
    assert_eq!(published.path_records.len(), 2);
}
