//! Generation identifiers scoping one unit of work's output.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier carried by every record produced by one unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationId(String);

impl GenerationId {
    /// Wraps a caller-supplied identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GenerationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Source of unique generation identifiers.
///
/// Implementations must never hand out the same id twice for the lifetime
/// of the source.
pub trait GenerationIdSource: Send + Sync {
    /// Returns a fresh identifier.
    fn next_id(&self) -> GenerationId;
}

/// Random version 4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerationSource;

impl GenerationIdSource for UuidGenerationSource {
    fn next_id(&self) -> GenerationId {
        GenerationId(Uuid::new_v4().to_string())
    }
}

/// Run prefix plus a monotonically increasing counter, e.g. `20240101T120000-000001`.
#[derive(Debug)]
pub struct SequentialGenerationSource {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialGenerationSource {
    /// Uses the current UTC time as the run prefix.
    pub fn new() -> Self {
        Self::with_prefix(Utc::now().format("%Y%m%dT%H%M%S").to_string())
    }

    /// Uses a caller-supplied run prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialGenerationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationIdSource for SequentialGenerationSource {
    fn next_id(&self) -> GenerationId {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        GenerationId(format!("{}-{:06}", self.prefix, seq))
    }
}
