//! Step building: collapsing a subject's dated events into ordered steps.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::bit_index::BitIndexMap;
use crate::combo::ComboCode;
use crate::types::{CohortId, EventOccurrence, TargetMembership};

/// One position in a subject's pathway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// 1-based position in the subject's sequence.
    pub ordinal: usize,
    /// Union of the bit values of every cohort in the window. Never empty.
    pub combo: ComboCode,
    /// Start date of the first occurrence in the window.
    pub window_start: NaiveDate,
    /// Days from the anchor start date to the window start.
    pub days_from_anchor: i64,
    /// Occurrences folded into this step.
    pub event_count: usize,
}

/// Builds step sequences for single subjects.
///
/// An occurrence joins the current step when it starts no more than
/// `collapse_window_days` after the step's window start, so the window is
/// the closed interval `[window_start, window_start + collapse_window_days]`.
/// Any later occurrence opens a new step whose window starts at its own
/// start date.
#[derive(Debug, Clone, Copy)]
pub struct StepBuilder<'a> {
    bit_index: &'a BitIndexMap,
    collapse_window_days: i64,
}

struct OpenWindow {
    start: NaiveDate,
    cohorts: BTreeSet<CohortId>,
    event_count: usize,
}

impl<'a> StepBuilder<'a> {
    /// Creates a builder over the given bit index.
    pub fn new(bit_index: &'a BitIndexMap, collapse_window_days: u32) -> Self {
        Self {
            bit_index,
            collapse_window_days: i64::from(collapse_window_days),
        }
    }

    /// Returns true if the occurrence can contribute to the membership's pathway.
    #[inline]
    pub fn qualifies(&self, membership: &TargetMembership, occurrence: &EventOccurrence) -> bool {
        occurrence.subject_id == membership.subject_id
            && self.bit_index.contains(occurrence.event_cohort_id)
            && membership.covers(occurrence.start_date)
    }

    /// Builds the ordered steps for one subject.
    ///
    /// Non-qualifying occurrences are skipped; a subject with none left
    /// yields an empty list. Input order does not matter.
    pub fn build<'o, I>(&self, membership: &TargetMembership, occurrences: I) -> Vec<Step>
    where
        I: IntoIterator<Item = &'o EventOccurrence>,
    {
        let mut qualifying: Vec<&EventOccurrence> = occurrences
            .into_iter()
            .filter(|o| self.qualifies(membership, o))
            .collect();
        qualifying.sort_by_key(|o| (o.start_date, o.event_cohort_id));

        let mut steps = Vec::new();
        let mut window: Option<OpenWindow> = None;

        for occurrence in qualifying {
            match window.as_mut() {
                Some(open)
                    if (occurrence.start_date - open.start).num_days()
                        <= self.collapse_window_days =>
                {
                    open.cohorts.insert(occurrence.event_cohort_id);
                    open.event_count += 1;
                }
                _ => {
                    if let Some(closed) = window.take() {
                        steps.push(self.close(closed, steps.len() + 1, membership));
                    }
                    window = Some(OpenWindow {
                        start: occurrence.start_date,
                        cohorts: BTreeSet::from([occurrence.event_cohort_id]),
                        event_count: 1,
                    });
                }
            }
        }
        if let Some(closed) = window {
            steps.push(self.close(closed, steps.len() + 1, membership));
        }

        steps
    }

    fn close(&self, window: OpenWindow, ordinal: usize, membership: &TargetMembership) -> Step {
        Step {
            ordinal,
            combo: self.bit_index.encode(window.cohorts),
            window_start: window.start,
            days_from_anchor: (window.start - membership.anchor_start_date).num_days(),
            event_count: window.event_count,
        }
    }
}
