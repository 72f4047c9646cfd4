//! Harvester engine: page drivers, schemas and effect execution.
mod controller;
mod decode;
mod engine;
mod export;
mod http_page;
mod listing;
mod locate;
mod page;
mod progress;
mod region;
mod review;
mod schema;
mod signal;
mod types;

pub use controller::Harvester;
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use engine::{harvest_page, run_job, HarvestHandle};
pub use export::{
    ensure_output_dir, export_report, listings_csv, reviews_csv, reviews_filename, to_csv,
    AtomicFileWriter, ExportError, ExportSummary, LISTINGS_FILENAME,
};
pub use harvester_core::RegionKind;
pub use http_page::{FetchSettings, HttpFeedPage};
pub use listing::{ListingMarkup, ListingSchema};
pub use locate::{FieldSpec, Locator, SchemaError, Source};
pub use page::{Page, RegionHandle};
pub use progress::{ChannelProgressSink, LogProgressSink, ProgressSink};
pub use region::{css_path, region_handle, select_by_path, RegionSpec};
pub use review::ReviewSchema;
pub use schema::{CandidateError, Candidates, HarvestSchema, PreStep};
pub use signal::StopSignal;
pub use types::{EngineEvent, FailureKind, HarvestJob, HarvestReport, PageError};
