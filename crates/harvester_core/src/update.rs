use crate::effect::{Delay, Effect, ProgressEvent, ProgressPhase};
use crate::stability::{classify, Stability};
use crate::{HarvestSession, HarvestStatus, Msg, Phase};

/// Pure update function: applies an observation to the session and returns
/// the effects the controller has to run next.
///
/// Messages that do not fit the current phase are ignored. Once the session
/// is terminal nothing changes it again.
pub fn update(mut session: HarvestSession, msg: Msg) -> (HarvestSession, Vec<Effect>) {
    let effects = match (session.phase(), msg) {
        (Phase::Idle, Msg::RegionFound { measurement }) => {
            session.observe(measurement);
            session.set_phase(Phase::Stepping);
            let count = session.report(measurement);
            vec![
                Effect::Harvest,
                Effect::Progress(ProgressEvent {
                    phase: ProgressPhase::Scrolling,
                    count,
                }),
            ]
        }
        (Phase::Idle, Msg::RegionMissing) => {
            // No progress events: the loop never started.
            session.set_phase(Phase::Terminal(HarvestStatus::Failed));
            vec![Effect::Finish(HarvestStatus::Failed)]
        }
        (
            Phase::Stepping,
            Msg::StepStarted {
                stopped,
                measurement,
            },
        ) => {
            session.observe(measurement);
            if stopped {
                terminate(&mut session, HarvestStatus::Cancelled, Vec::new())
            } else if measurement >= session.settings().cap {
                terminate(&mut session, HarvestStatus::Capped, Vec::new())
            } else {
                session.begin_step();
                session.set_phase(Phase::Loading {
                    before: measurement,
                });
                vec![Effect::LoadMore, Effect::Wait(Delay::Scroll)]
            }
        }
        (
            Phase::Loading { before },
            Msg::Loaded {
                stopped,
                measurement,
                end_marker,
            },
        ) => on_loaded(&mut session, before, stopped, measurement, end_marker),
        _ => Vec::new(),
    };

    (session, effects)
}

fn on_loaded(
    session: &mut HarvestSession,
    before: usize,
    stopped: bool,
    measurement: usize,
    end_marker: bool,
) -> Vec<Effect> {
    if stopped {
        return terminate(session, HarvestStatus::Cancelled, Vec::new());
    }
    session.observe(measurement);

    // Virtualized lists recycle nodes, so every settled view is harvested,
    // not only the ones that grew.
    let mut effects = vec![Effect::Harvest];
    match classify(before, measurement) {
        Stability::Grew => {
            session.reset_streak();
            let count = session.report(measurement);
            effects.push(Effect::Progress(ProgressEvent {
                phase: ProgressPhase::Loading,
                count,
            }));
            effects.push(Effect::Wait(Delay::Stabilize));
        }
        Stability::NoChange => {
            let streak = session.bump_streak();
            if streak >= session.settings().no_change_limit {
                return terminate(session, HarvestStatus::Converged, effects);
            }
        }
    }

    // Checked after the streak: a step that completes the streak converges
    // even when the marker shows on it.
    if end_marker {
        return terminate(session, HarvestStatus::EndMarkerSeen, effects);
    }
    if session.step() >= session.settings().max_steps {
        return terminate(session, HarvestStatus::Capped, effects);
    }

    session.set_phase(Phase::Stepping);
    effects
}

fn terminate(
    session: &mut HarvestSession,
    status: HarvestStatus,
    mut effects: Vec<Effect>,
) -> Vec<Effect> {
    session.set_phase(Phase::Terminal(status));
    let count = session.report(session.measurement());
    effects.push(Effect::Progress(ProgressEvent {
        phase: ProgressPhase::Processing,
        count,
    }));
    effects.push(Effect::Finish(status));
    effects
}
