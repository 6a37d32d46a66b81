//! # cohort-pathways
//!
//! Pathway construction and combinatorial event encoding for cohort studies.
//!
//! For every subject of a target cohort, the engine turns dated event-cohort
//! memberships into an ordered sequence of steps, collapses events that
//! start close together into combined steps, and counts how many subjects
//! share each distinct sequence.
//!
//! ## Key Features
//!
//! - **Deterministic** - the same rows always produce the same records; only the generation id varies
//! - **Unbounded combos** - combo codes are big integers, so there is no cap on distinct event cohorts
//! - **Isolated units of work** - each target cohort runs independently under its own generation id
//! - **Optional parallelism** - enable the `parallel` feature to run cohorts and subjects on rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use cohort_pathways::{
//!     ComboCode, EventOccurrence, InMemoryCohortSource, PathwayConfig, PathwayEngine,
//!     TargetMembership,
//! };
//!
//! let day = |d| NaiveDate::from_ymd_opt(2020, 1, d).unwrap();
//! let source = InMemoryCohortSource::new()
//!     .with_membership(TargetMembership::new(1, 100, day(1)))
//!     .with_occurrence(EventOccurrence::new(1, 10, day(2), day(3)))
//!     .with_occurrence(EventOccurrence::new(1, 20, day(4), day(5)))
//!     .with_name(10, "Metformin")
//!     .with_name(20, "Insulin");
//!
//! let config = PathwayConfig::builder()
//!     .with_target_cohorts([100])
//!     .with_event_cohorts([10, 20])
//!     .build();
//!
//! let report = PathwayEngine::new(&source, config).run().unwrap();
//! let result = report.result_for(100).unwrap();
//!
//! // Both events start within 30 days, so they form one combined step.
//! assert_eq!(result.path_records[0].step_codes, vec![ComboCode::from(3)]);
//! assert_eq!(result.code_tables.codes[0].display_name, "Metformin, Insulin");
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` - Enables parallel execution using rayon
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       cohort-pathways                        │
//! │                                                              │
//! │  PathwayEngine                                               │
//! │  ├── validate config, check cohort availability              │
//! │  ├── allocate one generation id per target cohort            │
//! │  └── run PathwayUnit per target cohort                       │
//! │                                                              │
//! │  PathwayUnit                                                 │
//! │  ├── BitIndexMap      event cohort → index, bit value        │
//! │  ├── StepBuilder      events → collapsed steps               │
//! │  ├── PathReducer      repeats + max depth                    │
//! │  ├── aggregate_paths  paths → PathRecord counts              │
//! │  ├── ComboDecoder     combo code → event cohorts             │
//! │  ├── CodeTableBuilder codes → flat + long tables             │
//! │  └── code_stats       per-code subject/event counts          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod aggregate;
mod bit_index;
mod codes;
mod combo;
mod config;
mod decoder;
mod engine;
mod error;
mod generation;
mod reducer;
mod source;
mod stats;
mod steps;
mod traits;
mod types;
mod unit;

// Public re-exports
pub use aggregate::{aggregate_paths, PathRecord};
pub use bit_index::{BitIndexEntry, BitIndexMap};
pub use codes::{
    CodeLongEntry, CodeTableBuilder, CodeTableEntry, CodeTables, COMBINATION_NAME_SEPARATOR,
};
pub use combo::ComboCode;
pub use config::{
    PathwayConfig, PathwayConfigBuilder, DEFAULT_COLLAPSE_WINDOW_DAYS, DEFAULT_MAX_DEPTH,
    DEFAULT_MIN_CELL_COUNT,
};
pub use decoder::{ComboDecoder, ComboDecoding};
pub use engine::{Availability, AvailabilityWarning, CohortOutcome, PathwayEngine, PathwayReport};
pub use error::{PathwayError, PathwayResult};
pub use generation::{
    GenerationId, GenerationIdSource, SequentialGenerationSource, UuidGenerationSource,
};
pub use reducer::{PathReducer, SubjectPath};
pub use source::InMemoryCohortSource;
pub use stats::{code_stats, CodeStat, CohortSummary};
pub use steps::{Step, StepBuilder};
pub use traits::{CohortNameLookup, CohortSource, SourceNames};
pub use types::{CohortId, CohortSide, EventOccurrence, SubjectId, TargetMembership};
pub use unit::{CohortResult, PathwayUnit};
