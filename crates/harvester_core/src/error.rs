use std::fmt;

use serde::Serialize;

use crate::ReviewSort;

/// Which scrollable region a harvester was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionKind {
    Listing,
    Detail,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionKind::Listing => write!(f, "listing results feed"),
            RegionKind::Detail => write!(f, "reviews pane"),
        }
    }
}

/// Everything that can go wrong in a session. Only `RegionNotFound` ends a
/// session as `Failed`; the rest travel as warnings next to the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HarvestError {
    #[error("{region} not found: {hint}")]
    RegionNotFound { region: RegionKind, hint: String },
    #[error("harvest finished without any usable records")]
    EmptyResult,
    #[error("candidate {index} skipped: {reason}")]
    ExtractionCandidate { index: usize, reason: String },
    #[error("could not apply sort order {order}: {reason}")]
    SortApplication { order: ReviewSort, reason: String },
}
