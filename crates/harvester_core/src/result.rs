use serde::Serialize;

use crate::{HarvestError, HarvestStatus};

/// Terminal product of a session, produced exactly once however it ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestResult<R> {
    /// Deduplicated records in discovery order.
    pub records: Vec<R>,
    pub status: HarvestStatus,
    /// Measurement observed by the final probe.
    pub measurement: usize,
    /// Load-more steps taken.
    pub steps: u32,
    /// Set only when `status` is `Failed`.
    pub error: Option<HarvestError>,
    /// Non-fatal problems absorbed along the way.
    pub warnings: Vec<HarvestError>,
}

impl<R> HarvestResult<R> {
    pub fn failed(error: HarvestError) -> Self {
        Self {
            records: Vec::new(),
            status: HarvestStatus::Failed,
            measurement: 0,
            steps: 0,
            error: Some(error),
            warnings: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `EmptyResult` when a session ran its course on a found region but
    /// nothing usable came out. Failed and cancelled sessions never carry it.
    pub fn soft_error(&self) -> Option<HarvestError> {
        let ran_its_course = matches!(
            self.status,
            HarvestStatus::Converged | HarvestStatus::Capped | HarvestStatus::EndMarkerSeen
        );
        if ran_its_course && self.records.is_empty() {
            Some(HarvestError::EmptyResult)
        } else {
            None
        }
    }
}
