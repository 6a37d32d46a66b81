//! # cohort-pathways-store
//!
//! Destination side of [`cohort_pathways`]: where finished cohort results go.
//!
//! ## Components
//!
//! - **Result store** - [`InMemoryPathwayStore`] accepts complete
//!   [`CohortResult`](cohort_pathways::CohortResult)s from concurrent units of
//!   work, honouring an [`OverwritePolicy`]
//! - **Run manifest** - [`RunManifest`] records configuration, per-cohort
//!   status and content fingerprints as JSON
//! - **Fingerprints** - SHA-256 over result content without generation ids,
//!   for comparing replays
//! - **Suppression** - [`SuppressionPolicy`] removes rows below the
//!   minimum cell count before publishing
//!
//! ## Example
//!
//! ```ignore
//! use cohort_pathways::PathwayEngine;
//! use cohort_pathways_store::{InMemoryPathwayStore, RunManifest, SuppressionPolicy};
//!
//! let report = PathwayEngine::new(&source, config.clone()).run()?;
//! let manifest = RunManifest::from_report(&config, &report)?;
//! manifest.save("out/manifest.json")?;
//!
//! let store = InMemoryPathwayStore::new();
//! store.commit_report(&report)?;
//!
//! let policy = SuppressionPolicy::from_config(&config);
//! let publishable = policy.paths(&store.path_records(1));
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod fingerprint;
pub mod manifest;
pub mod store;
pub mod suppression;

pub use error::{StoreError, StoreResult};
pub use fingerprint::{fingerprint, fingerprint_hex, same_content};
pub use manifest::{CohortStatus, ManifestEntry, RunManifest};
pub use store::{InMemoryPathwayStore, OverwritePolicy, PathwayStore, StoreStats};
pub use suppression::{Suppressed, SuppressionPolicy};
