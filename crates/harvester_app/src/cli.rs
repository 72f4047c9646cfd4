use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use engine_logging::LogDestination;
use harvester_core::{ReviewSort, ScrollSpeed};

#[derive(Parser, Debug, Clone)]
#[command(name = "harvester", about = "Harvest venue listings and reviews from infinite feeds")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (RON). Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "harvester_settings.ron")]
    pub settings: PathBuf,

    /// Write the effective settings back to the settings file.
    #[arg(long, global = true)]
    pub save_settings: bool,

    /// Directory for CSV exports and manifests.
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,

    /// Where log lines go.
    #[arg(long, global = true, value_enum, default_value_t = LogTarget::Terminal)]
    pub log: LogTarget,

    /// Enable debug logging.
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Collect venues from a search results feed.
    Listings(Common),
    /// Collect the reviews of one venue.
    Reviews {
        #[command(flatten)]
        common: Common,

        /// Order to request before harvesting.
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
    },
}

impl Command {
    pub fn common(&self) -> &Common {
        match self {
            Command::Listings(common) | Command::Reviews { common, .. } => common,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct Common {
    /// Page to harvest.
    #[arg(long)]
    pub url: String,

    /// Stop once this many items are loaded.
    #[arg(long)]
    pub cap: Option<usize>,

    /// Scroll delay preset.
    #[arg(long, value_enum)]
    pub speed: Option<SpeedArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(value: LogTarget) -> Self {
        match value {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedArg {
    Fast,
    Normal,
    Slow,
}

impl From<SpeedArg> for ScrollSpeed {
    fn from(value: SpeedArg) -> Self {
        match value {
            SpeedArg::Fast => ScrollSpeed::Fast,
            SpeedArg::Normal => ScrollSpeed::Normal,
            SpeedArg::Slow => ScrollSpeed::Slow,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    MostRelevant,
    Newest,
    HighestRating,
    LowestRating,
}

impl From<SortArg> for ReviewSort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::MostRelevant => ReviewSort::MostRelevant,
            SortArg::Newest => ReviewSort::Newest,
            SortArg::HighestRating => ReviewSort::HighestRating,
            SortArg::LowestRating => ReviewSort::LowestRating,
        }
    }
}
