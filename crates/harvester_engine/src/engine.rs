use std::io;
use std::sync::mpsc;
use std::thread;

use engine_logging::{engine_error, engine_info};
use harvester_core::{HarvestError, HarvestSettings, ProgressEvent};
use url::Url;

use crate::controller::Harvester;
use crate::http_page::{FetchSettings, HttpFeedPage};
use crate::listing::{ListingMarkup, ListingSchema};
use crate::page::Page;
use crate::progress::{ChannelProgressSink, ProgressSink};
use crate::review::ReviewSchema;
use crate::signal::StopSignal;
use crate::{EngineEvent, HarvestJob, HarvestReport, RegionKind};

/// A harvest running on its own thread.
///
/// Progress and the final report arrive as [`EngineEvent`]s; exactly one
/// `Finished` is sent per handle.
pub struct HarvestHandle {
    stop: StopSignal,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl HarvestHandle {
    pub fn spawn(job: HarvestJob, settings: HarvestSettings, fetch: FetchSettings) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (event_tx, event_rx) = mpsc::channel();
        let stop = StopSignal::new();
        let worker_stop = stop.clone();

        // The session label is thread-local, so the session owns the thread.
        thread::Builder::new()
            .name(format!("harvest-{}", job.label()))
            .spawn(move || {
                let sink = ChannelProgressSink::new(event_tx.clone());
                let report = runtime.block_on(run_job(&job, settings, fetch, &worker_stop, &sink));
                let _ = event_tx.send(EngineEvent::Finished(report));
            })?;

        Ok(Self { stop, event_rx })
    }

    /// Signal that asks the session to finish early. It still reports what
    /// it has.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    /// Block until the report arrives, handing progress to `on_progress`.
    pub fn wait(self, mut on_progress: impl FnMut(ProgressEvent)) -> Option<HarvestReport> {
        while let Some(event) = self.recv() {
            match event {
                EngineEvent::Progress(progress) => on_progress(progress),
                EngineEvent::Finished(report) => return Some(report),
            }
        }
        None
    }
}

/// Open `job`'s URL over HTTP and harvest it.
pub async fn run_job(
    job: &HarvestJob,
    settings: HarvestSettings,
    fetch: FetchSettings,
    stop: &StopSignal,
    sink: &dyn ProgressSink,
) -> HarvestReport {
    engine_info!("Opening {} for {}", job.url(), job.label());
    let page = match HttpFeedPage::open(job.url(), fetch).await {
        Ok(page) => page,
        Err(err) => {
            engine_error!("Could not open {}: {}", job.url(), err);
            return HarvestReport::failed(
                job,
                HarvestError::RegionNotFound {
                    region: region_kind(job),
                    hint: format!("page unavailable: {err}"),
                },
            );
        }
    };
    let base = page.current_url();
    harvest_page(job, &page, Some(base), settings, stop, sink).await
}

/// Harvest an already opened page with the schema `job` calls for.
pub async fn harvest_page(
    job: &HarvestJob,
    page: &dyn Page,
    base_url: Option<Url>,
    settings: HarvestSettings,
    stop: &StopSignal,
    sink: &dyn ProgressSink,
) -> HarvestReport {
    let schema_failed = |err: crate::SchemaError| {
        HarvestReport::failed(
            job,
            HarvestError::RegionNotFound {
                region: region_kind(job),
                hint: format!("invalid page schema: {err}"),
            },
        )
    };
    match job {
        HarvestJob::Listings { .. } => {
            let schema = match ListingSchema::new(&ListingMarkup::default()) {
                Ok(schema) => schema,
                Err(err) => return schema_failed(err),
            };
            let schema = match base_url {
                Some(base) => schema.with_base_url(base),
                None => schema,
            };
            HarvestReport::Listings(Harvester::new(schema).run(page, settings, stop, sink).await)
        }
        HarvestJob::Reviews { sort, .. } => {
            let schema = match ReviewSchema::new(*sort) {
                Ok(schema) => schema,
                Err(err) => return schema_failed(err),
            };
            HarvestReport::Reviews(Harvester::new(schema).run(page, settings, stop, sink).await)
        }
    }
}

fn region_kind(job: &HarvestJob) -> RegionKind {
    match job {
        HarvestJob::Listings { .. } => RegionKind::Listing,
        HarvestJob::Reviews { .. } => RegionKind::Detail,
    }
}
