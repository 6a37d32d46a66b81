//! Input records consumed by the pathway engine.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a target or event cohort.
pub type CohortId = u64;

/// Identifier of a subject (person).
pub type SubjectId = u64;

/// One dated membership of a subject in an event cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOccurrence {
    /// The subject experiencing the event.
    pub subject_id: SubjectId,
    /// The event cohort the occurrence belongs to.
    pub event_cohort_id: CohortId,
    /// First day of the occurrence.
    pub start_date: NaiveDate,
    /// Last day of the occurrence.
    pub end_date: NaiveDate,
}

impl EventOccurrence {
    /// Creates a new occurrence.
    pub fn new(
        subject_id: SubjectId,
        event_cohort_id: CohortId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            subject_id,
            event_cohort_id,
            start_date,
            end_date,
        }
    }
}

/// Entry of a subject into a target cohort.
///
/// The anchor start date is the origin for relative step timing. When an
/// anchor end date is present, occurrences starting after it are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetMembership {
    /// The subject entering the cohort.
    pub subject_id: SubjectId,
    /// The target cohort entered.
    pub target_cohort_id: CohortId,
    /// Cohort entry date.
    pub anchor_start_date: NaiveDate,
    /// Cohort exit date, if known.
    #[serde(default)]
    pub anchor_end_date: Option<NaiveDate>,
}

impl TargetMembership {
    /// Creates an open-ended membership.
    pub fn new(subject_id: SubjectId, target_cohort_id: CohortId, anchor_start_date: NaiveDate) -> Self {
        Self {
            subject_id,
            target_cohort_id,
            anchor_start_date,
            anchor_end_date: None,
        }
    }

    /// Sets the cohort exit date.
    pub fn with_end_date(mut self, anchor_end_date: NaiveDate) -> Self {
        self.anchor_end_date = Some(anchor_end_date);
        self
    }

    /// Returns true if an occurrence starting on `date` falls inside this membership.
    #[inline]
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.anchor_start_date && self.anchor_end_date.map_or(true, |end| date <= end)
    }
}

/// Which side of the analysis a cohort is configured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CohortSide {
    /// Population anchor cohorts.
    Target,
    /// Event cohorts forming pathway steps.
    Event,
}

impl fmt::Display for CohortSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CohortSide::Target => write!(f, "target"),
            CohortSide::Event => write!(f, "event"),
        }
    }
}
