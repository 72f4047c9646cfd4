use std::sync::atomic::{AtomicU64, Ordering};

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use harvester_core::{
    update, Deduplicator, Delay, Effect, HarvestError, HarvestResult, HarvestSession,
    HarvestSettings, HarvestStatus, Msg, RegionKind,
};
use scraper::Html;

use crate::page::{Page, RegionHandle};
use crate::progress::ProgressSink;
use crate::region::region_handle;
use crate::schema::{CandidateError, HarvestSchema, PreStep};
use crate::signal::StopSignal;

static SESSION_SEQ: AtomicU64 = AtomicU64::new(1);

/// One probe of the region.
#[derive(Debug, Clone)]
struct Probe {
    measurement: usize,
    end_marker: bool,
    handle: RegionHandle,
}

enum Observation {
    Found(Probe),
    /// Page answered but the region is gone; keep the last handle.
    RegionLost,
    Unavailable,
}

/// One extraction pass over a snapshot.
#[derive(Debug, Default)]
struct Pass {
    measurement: usize,
    added: usize,
    skipped: Vec<CandidateError>,
}

/// Drives the incremental load loop for one schema.
///
/// The loop itself lives in [`harvester_core::update`]; this type executes
/// its effects against a [`Page`]. Markup is parsed only inside synchronous
/// helpers so no parsed document is ever held across an await point.
pub struct Harvester<S> {
    schema: S,
}

impl<S: HarvestSchema> Harvester<S> {
    pub fn new(schema: S) -> Self {
        Self { schema }
    }

    /// Run one session to its terminal state. Never fails: a page that does
    /// not show the expected region yields a `Failed` result.
    pub async fn run(
        &self,
        page: &dyn Page,
        settings: HarvestSettings,
        stop: &StopSignal,
        sink: &dyn ProgressSink,
    ) -> HarvestResult<S::Record> {
        let kind = self.schema.region_kind();
        let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
        engine_logging::set_session_label(&format!("{}-{}", session_prefix(kind), seq));
        let settings = sanitize(settings);
        engine_info!(
            "Harvest started: cap={} no_change_limit={} max_steps={}",
            settings.cap,
            settings.no_change_limit,
            settings.max_steps
        );

        let mut warnings = Vec::new();
        self.run_pre_steps(page, &settings, stop, &mut warnings).await;

        let mut session = HarvestSession::new(settings);
        let (first, mut last_html) = match self.initial_probe(page).await {
            Ok(found) => found,
            Err(hint) => {
                let (_, effects) = update(session, Msg::RegionMissing);
                debug_assert_eq!(effects, vec![Effect::Finish(HarvestStatus::Failed)]);
                let error = HarvestError::RegionNotFound { region: kind, hint };
                engine_error!("{}", error);
                let mut result = HarvestResult::failed(error);
                result.warnings = warnings;
                return result;
            }
        };

        let mut handle = first.handle;
        let mut dedup = Deduplicator::new();
        let mut msg = Msg::RegionFound {
            measurement: first.measurement,
        };

        let status = loop {
            let (next, effects) = update(session, msg);
            session = next;

            let mut loaded = false;
            let mut finished = None;
            for effect in effects {
                match effect {
                    Effect::LoadMore => {
                        if let Err(err) = page.load_more(&handle).await {
                            engine_warn!("Load more failed: {}", err);
                        }
                        loaded = true;
                    }
                    Effect::Wait(Delay::Scroll) => {
                        tokio::time::sleep(session.settings().scroll_delay()).await
                    }
                    Effect::Wait(Delay::Stabilize) => {
                        tokio::time::sleep(session.settings().stabilize_delay()).await
                    }
                    Effect::Harvest => {
                        let pass = self.harvest(&last_html, &mut dedup);
                        engine_debug!(
                            "Step {}: {} new records, {} kept",
                            session.step(),
                            pass.added,
                            dedup.len()
                        );
                    }
                    Effect::Progress(event) => sink.emit(event),
                    Effect::Finish(status) => finished = Some(status),
                }
            }
            if let Some(status) = finished {
                break status;
            }

            let stopped = stop.is_stopped();
            let observation = if stopped {
                Observation::Unavailable
            } else {
                self.observe(page, &mut last_html).await
            };
            let (measurement, end_marker) = match observation {
                Observation::Found(probe) => {
                    handle = probe.handle;
                    (probe.measurement, probe.end_marker)
                }
                Observation::RegionLost => (0, false),
                Observation::Unavailable => (session.measurement(), false),
            };
            msg = if loaded {
                engine_debug!(
                    "Step {}: measurement {} streak {} end_marker {}",
                    session.step(),
                    measurement,
                    session.no_change_streak(),
                    end_marker
                );
                Msg::Loaded {
                    stopped,
                    measurement,
                    end_marker,
                }
            } else {
                Msg::StepStarted {
                    stopped,
                    measurement,
                }
            };
        };

        let final_html = match page.snapshot().await {
            Ok(html) => html,
            Err(err) => {
                engine_warn!("Final snapshot failed, using last one: {}", err);
                last_html
            }
        };
        let pass = self.harvest(&final_html, &mut dedup);
        for skipped in &pass.skipped {
            engine_warn!("Skipped candidate {}: {}", skipped.index, skipped.reason);
        }
        warnings.extend(pass.skipped.into_iter().map(|c| HarvestError::ExtractionCandidate {
            index: c.index,
            reason: c.reason,
        }));

        let result = HarvestResult {
            records: dedup.into_records(),
            status,
            measurement: pass.measurement,
            steps: session.step(),
            error: None,
            warnings,
        };
        if let Some(soft) = result.soft_error() {
            engine_warn!("{}", soft);
        }
        engine_info!(
            "Harvest finished: {:?} with {} records after {} steps",
            result.status,
            result.records.len(),
            result.steps
        );
        result
    }

    async fn run_pre_steps(
        &self,
        page: &dyn Page,
        settings: &HarvestSettings,
        stop: &StopSignal,
        warnings: &mut Vec<HarvestError>,
    ) {
        for step in self.schema.pre_steps() {
            if stop.is_stopped() {
                break;
            }
            let before = match page.snapshot().await {
                Ok(html) => html,
                Err(err) => {
                    skip_pre_step(step, err.to_string(), warnings);
                    continue;
                }
            };
            let outcome = match self.locate(step, &before) {
                Some(path) => page.activate(&path).await.map_err(|err| err.to_string()),
                None => Err("no matching control on the page".to_string()),
            };
            if let Err(reason) = outcome {
                skip_pre_step(step, reason, warnings);
                continue;
            }
            tokio::time::sleep(settings.stabilize_delay()).await;
            match self.region_kept(page, &before).await {
                Ok(()) => engine_info!("Pre-step done: {}", step),
                Err(reason) => skip_pre_step(step, reason, warnings),
            }
        }
    }

    /// A pre-step must not take away a region that was already showing.
    /// When it does, the page goes back to the view it left.
    async fn region_kept(&self, page: &dyn Page, before: &str) -> Result<(), String> {
        if !self.region_present(before) {
            return Ok(());
        }
        match page.snapshot().await {
            Ok(after) if self.region_present(&after) => return Ok(()),
            Ok(_) => {}
            Err(err) => engine_warn!("Snapshot after pre-step failed: {}", err),
        }
        if let Err(err) = page.restore().await {
            engine_error!("Could not go back after pre-step: {}", err);
        }
        Err(format!(
            "activating it left the page without the {}",
            self.schema.region_kind()
        ))
    }

    async fn initial_probe(&self, page: &dyn Page) -> Result<(Probe, String), String> {
        let html = page
            .snapshot()
            .await
            .map_err(|err| format!("page unavailable: {err}"))?;
        let probe = self.probe(&html)?;
        Ok((probe, html))
    }

    /// Snapshot and probe. A failed snapshot keeps the previous one.
    async fn observe(&self, page: &dyn Page, last_html: &mut String) -> Observation {
        match page.snapshot().await {
            Ok(html) => *last_html = html,
            Err(err) => {
                engine_warn!("Snapshot failed: {}", err);
                return Observation::Unavailable;
            }
        }
        match self.probe(last_html) {
            Ok(probe) => Observation::Found(probe),
            Err(hint) => {
                engine_warn!("Region lost mid-session: {}", hint);
                Observation::RegionLost
            }
        }
    }

    fn probe(&self, html: &str) -> Result<Probe, String> {
        let doc = Html::parse_document(html);
        match self.schema.region().resolve(&doc) {
            Some(region) => Ok(Probe {
                measurement: self.schema.measure(region),
                end_marker: self.schema.end_marker(region),
                handle: region_handle(region),
            }),
            None => Err(self.schema.missing_region_hint(&doc)),
        }
    }

    fn region_present(&self, html: &str) -> bool {
        let doc = Html::parse_document(html);
        self.schema.region().resolve(&doc).is_some()
    }

    fn locate(&self, step: PreStep, html: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        self.schema.locate_pre_step(step, &doc)
    }

    fn harvest(&self, html: &str, dedup: &mut Deduplicator<S::Record>) -> Pass {
        let doc = Html::parse_document(html);
        let Some(region) = self.schema.region().resolve(&doc) else {
            return Pass::default();
        };
        let mut pass = Pass {
            measurement: self.schema.measure(region),
            ..Pass::default()
        };
        for candidate in self.schema.extract(&doc, region) {
            match candidate {
                Ok(record) => {
                    if dedup.add(record) {
                        pass.added += 1;
                    }
                }
                Err(err) => pass.skipped.push(err),
            }
        }
        pass
    }
}

fn skip_pre_step(step: PreStep, reason: String, warnings: &mut Vec<HarvestError>) {
    engine_warn!("Pre-step '{}' skipped: {}", step, reason);
    if let PreStep::ApplySort(order) = step {
        warnings.push(HarvestError::SortApplication { order, reason });
    }
}

fn session_prefix(kind: RegionKind) -> &'static str {
    match kind {
        RegionKind::Listing => "listings",
        RegionKind::Detail => "reviews",
    }
}

fn sanitize(mut settings: HarvestSettings) -> HarvestSettings {
    if let Err(err) = settings.validate() {
        engine_warn!("Adjusting settings: {}", err);
        settings.cap = settings.cap.max(1);
        settings.no_change_limit = settings.no_change_limit.max(1);
        settings.max_steps = settings.max_steps.max(1);
    }
    settings
}
