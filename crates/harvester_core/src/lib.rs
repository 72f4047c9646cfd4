//! Harvester core: pure session state machine, records and deduplication.
mod dedup;
mod effect;
mod error;
mod msg;
mod record;
mod result;
mod settings;
mod stability;
mod state;
mod update;

pub use dedup::Deduplicator;
pub use effect::{Delay, Effect, ProgressEvent, ProgressPhase};
pub use error::{HarvestError, RegionKind};
pub use msg::Msg;
pub use record::{
    identity_url, normalize_text, DedupKey, Keyed, ListingRecord, ReviewRecord,
    REVIEW_KEY_TEXT_PREFIX,
};
pub use result::HarvestResult;
pub use settings::{HarvestSettings, ReviewSort, ScrollSpeed, SettingsError};
pub use stability::{classify, Stability};
pub use state::{HarvestSession, HarvestStatus, Phase};
pub use update::update;
