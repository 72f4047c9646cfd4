/// Observations the controller feeds into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Initial probe located the region.
    RegionFound { measurement: usize },
    /// Initial probe could not locate the region.
    RegionMissing,
    /// Top of a step: stop flag and current measurement.
    StepStarted { stopped: bool, measurement: usize },
    /// After load-more and the scroll delay.
    Loaded {
        stopped: bool,
        measurement: usize,
        end_marker: bool,
    },
}
