use std::fmt;

use crate::HarvestStatus;

/// Side effects the controller must execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadMore,
    Wait(Delay),
    /// Extract and deduplicate what is loaded right now.
    Harvest,
    Progress(ProgressEvent),
    /// Run the final extraction pass and return the result.
    Finish(HarvestStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    Scroll,
    Stabilize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Scrolling,
    Loading,
    Processing,
}

impl fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressPhase::Scrolling => write!(f, "scrolling"),
            ProgressPhase::Loading => write!(f, "loading"),
            ProgressPhase::Processing => write!(f, "processing"),
        }
    }
}

/// Status update for whoever is watching the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub count: usize,
}
