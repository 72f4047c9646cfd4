use std::fmt;

use harvester_core::{Keyed, RegionKind, ReviewSort};
use scraper::{ElementRef, Html};

use crate::region::RegionSpec;

/// A candidate that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateError {
    pub index: usize,
    pub reason: String,
}

pub type Candidates<'a, R> = Box<dyn Iterator<Item = Result<R, CandidateError>> + 'a>;

/// Best-effort interaction performed before measuring starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreStep {
    OpenReviewsTab,
    ApplySort(ReviewSort),
}

impl fmt::Display for PreStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreStep::OpenReviewsTab => write!(f, "open reviews tab"),
            PreStep::ApplySort(order) => write!(f, "apply sort {order}"),
        }
    }
}

/// What distinguishes one harvester from another: where the items live,
/// how growth is measured and how records are read.
pub trait HarvestSchema: Send + Sync {
    type Record: Keyed + Clone + Send + 'static;

    fn region_kind(&self) -> RegionKind;

    fn region(&self) -> &RegionSpec;

    /// Distinct item count inside the region.
    fn measure(&self, region: ElementRef<'_>) -> usize;

    /// Authoritative "no more results" signal inside the region.
    fn end_marker(&self, _region: ElementRef<'_>) -> bool {
        false
    }

    /// Lazily read the records of every item currently in the region.
    fn extract<'a>(&'a self, doc: &'a Html, region: ElementRef<'a>) -> Candidates<'a, Self::Record>;

    fn pre_steps(&self) -> Vec<PreStep> {
        Vec::new()
    }

    /// CSS path of the element to activate for `step`, if present.
    fn locate_pre_step(&self, _step: PreStep, _doc: &Html) -> Option<String> {
        None
    }

    /// Human-readable explanation for a missing region.
    fn missing_region_hint(&self, _doc: &Html) -> String {
        format!("make sure the page shows a {}", self.region_kind())
    }
}
