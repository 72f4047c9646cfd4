use serde::Serialize;

use crate::HarvestSettings;

/// How a session ended. `Running` only appears on an unfinished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HarvestStatus {
    #[default]
    Running,
    Converged,
    Capped,
    EndMarkerSeen,
    Cancelled,
    Failed,
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Top of a step: waiting for the pre-step probe.
    Stepping,
    /// Load-more issued: waiting for the post-step probe.
    Loading { before: usize },
    Terminal(HarvestStatus),
}

/// Mutable loop state of one harvest. Created per invocation and owned by
/// the controller; nothing in it outlives the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSession {
    settings: HarvestSettings,
    measurement: usize,
    no_change_streak: u32,
    step: u32,
    reported: usize,
    phase: Phase,
}

impl HarvestSession {
    pub fn new(settings: HarvestSettings) -> Self {
        Self {
            settings,
            measurement: 0,
            no_change_streak: 0,
            step: 0,
            reported: 0,
            phase: Phase::Idle,
        }
    }

    pub fn settings(&self) -> &HarvestSettings {
        &self.settings
    }

    pub fn measurement(&self) -> usize {
        self.measurement
    }

    pub fn no_change_streak(&self) -> u32 {
        self.no_change_streak
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> HarvestStatus {
        match self.phase {
            Phase::Terminal(status) => status,
            _ => HarvestStatus::Running,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Terminal(_))
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn observe(&mut self, measurement: usize) {
        self.measurement = measurement;
    }

    pub(crate) fn begin_step(&mut self) -> u32 {
        self.step += 1;
        self.step
    }

    pub(crate) fn reset_streak(&mut self) {
        self.no_change_streak = 0;
    }

    pub(crate) fn bump_streak(&mut self) -> u32 {
        self.no_change_streak += 1;
        self.no_change_streak
    }

    /// Count to report for `measurement`, never below anything reported
    /// before, so progress stays non-decreasing when a list recycles nodes.
    pub(crate) fn report(&mut self, measurement: usize) -> usize {
        self.reported = self.reported.max(measurement);
        self.reported
    }
}
