use std::fmt;

use harvester_core::{
    HarvestError, HarvestResult, HarvestStatus, ListingRecord, ProgressEvent, ReviewRecord, ReviewSort,
};

/// Why a page driver could not do what was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Decode,
    /// The driver has no way to perform the action.
    Unsupported,
    /// The target element is not on the current page.
    TargetMissing,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Decode => write!(f, "undecodable response body"),
            FailureKind::Unsupported => write!(f, "unsupported by this page driver"),
            FailureKind::TargetMissing => write!(f, "target element not found"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct PageError {
    pub kind: FailureKind,
    pub message: String,
}

impl PageError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// What a background harvest should collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestJob {
    Listings { url: String },
    Reviews { url: String, sort: ReviewSort },
}

impl HarvestJob {
    pub fn url(&self) -> &str {
        match self {
            HarvestJob::Listings { url } | HarvestJob::Reviews { url, .. } => url,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HarvestJob::Listings { .. } => "listings",
            HarvestJob::Reviews { .. } => "reviews",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HarvestReport {
    Listings(HarvestResult<ListingRecord>),
    Reviews(HarvestResult<ReviewRecord>),
}

impl HarvestReport {
    /// An unstarted session of the kind `job` asked for.
    pub fn failed(job: &HarvestJob, error: HarvestError) -> Self {
        match job {
            HarvestJob::Listings { .. } => HarvestReport::Listings(HarvestResult::failed(error)),
            HarvestJob::Reviews { .. } => HarvestReport::Reviews(HarvestResult::failed(error)),
        }
    }

    pub fn status(&self) -> HarvestStatus {
        match self {
            HarvestReport::Listings(r) => r.status,
            HarvestReport::Reviews(r) => r.status,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HarvestReport::Listings(r) => r.len(),
            HarvestReport::Reviews(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn error(&self) -> Option<&HarvestError> {
        match self {
            HarvestReport::Listings(r) => r.error.as_ref(),
            HarvestReport::Reviews(r) => r.error.as_ref(),
        }
    }

    pub fn warnings(&self) -> &[HarvestError] {
        match self {
            HarvestReport::Listings(r) => &r.warnings,
            HarvestReport::Reviews(r) => &r.warnings,
        }
    }

    /// Fatal error, or `EmptyResult` for a session that ran its course with nothing.
    pub fn problem(&self) -> Option<HarvestError> {
        self.error().cloned().or_else(|| match self {
            HarvestReport::Listings(r) => r.soft_error(),
            HarvestReport::Reviews(r) => r.soft_error(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress(ProgressEvent),
    Finished(HarvestReport),
}
