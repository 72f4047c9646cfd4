use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-session tuning of the harvest loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestSettings {
    /// Stop once this many items are loaded.
    pub cap: usize,
    /// Wait after each load-more request.
    pub scroll_delay_ms: u64,
    /// Extra wait after growth so the page can settle before the next probe.
    pub stabilize_delay_ms: u64,
    /// Consecutive no-growth steps tolerated before declaring convergence.
    pub no_change_limit: u32,
    /// Hard ceiling on load-more steps.
    pub max_steps: u32,
}

impl HarvestSettings {
    pub fn listings() -> Self {
        Self {
            cap: 2000,
            scroll_delay_ms: 600,
            stabilize_delay_ms: 1000,
            no_change_limit: 3,
            max_steps: 50,
        }
    }

    pub fn reviews() -> Self {
        Self {
            cap: 2000,
            scroll_delay_ms: 800,
            stabilize_delay_ms: 1000,
            no_change_limit: 15,
            max_steps: 400,
        }
    }

    pub fn with_speed(mut self, speed: ScrollSpeed) -> Self {
        self.scroll_delay_ms = speed.delay_ms();
        self
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }

    pub fn stabilize_delay(&self) -> Duration {
        Duration::from_millis(self.stabilize_delay_ms)
    }

    /// Upper bound on time spent waiting, excluding probe and extraction work.
    pub fn worst_case_wait(&self) -> Duration {
        let per_step = self.scroll_delay_ms.saturating_add(self.stabilize_delay_ms);
        Duration::from_millis(per_step.saturating_mul(u64::from(self.max_steps)))
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.cap == 0 {
            return Err(SettingsError::Zero("cap"));
        }
        if self.no_change_limit == 0 {
            return Err(SettingsError::Zero("no_change_limit"));
        }
        if self.max_steps == 0 {
            return Err(SettingsError::Zero("max_steps"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error("unknown {kind} '{value}'")]
    Unknown { kind: &'static str, value: String },
}

/// Preset scroll delays offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollSpeed {
    Fast,
    Normal,
    Slow,
}

impl ScrollSpeed {
    pub fn delay_ms(self) -> u64 {
        match self {
            ScrollSpeed::Fast => 600,
            ScrollSpeed::Normal => 800,
            ScrollSpeed::Slow => 1200,
        }
    }
}

impl FromStr for ScrollSpeed {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(ScrollSpeed::Fast),
            "normal" => Ok(ScrollSpeed::Normal),
            "slow" => Ok(ScrollSpeed::Slow),
            other => Err(SettingsError::Unknown {
                kind: "scroll speed",
                value: other.to_string(),
            }),
        }
    }
}

/// Review ordering requested before a detail harvest starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewSort {
    #[default]
    MostRelevant,
    Newest,
    HighestRating,
    LowestRating,
}

impl ReviewSort {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewSort::MostRelevant => "most-relevant",
            ReviewSort::Newest => "newest",
            ReviewSort::HighestRating => "highest-rating",
            ReviewSort::LowestRating => "lowest-rating",
        }
    }

    /// Lowercase phrases that identify the option for this order on the page.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            ReviewSort::MostRelevant => &["most relevant", "relevance", "relevant"],
            ReviewSort::Newest => &["newest", "recent", "latest"],
            ReviewSort::HighestRating => &["highest", "high rating", "top rated"],
            ReviewSort::LowestRating => &["lowest", "low rating", "worst"],
        }
    }

    /// The page already shows this order without interaction.
    pub fn is_default(self) -> bool {
        self == ReviewSort::MostRelevant
    }
}

impl fmt::Display for ReviewSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewSort {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "most-relevant" | "relevant" => Ok(ReviewSort::MostRelevant),
            "newest" => Ok(ReviewSort::Newest),
            "highest-rating" | "highest" => Ok(ReviewSort::HighestRating),
            "lowest-rating" | "lowest" => Ok(ReviewSort::LowestRating),
            other => Err(SettingsError::Unknown {
                kind: "review sort",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_presets_map_to_delays() {
        let s = HarvestSettings::reviews().with_speed(ScrollSpeed::Slow);
        assert_eq!(s.scroll_delay(), Duration::from_millis(1200));
        assert_eq!("fast".parse::<ScrollSpeed>().unwrap(), ScrollSpeed::Fast);
        assert!("warp".parse::<ScrollSpeed>().is_err());
    }

    #[test]
    fn zero_thresholds_are_rejected() {
        let mut s = HarvestSettings::listings();
        assert!(s.validate().is_ok());
        s.no_change_limit = 0;
        assert_eq!(s.validate(), Err(SettingsError::Zero("no_change_limit")));
    }

    #[test]
    fn worst_case_wait_is_derived_from_steps() {
        let s = HarvestSettings {
            cap: 10,
            scroll_delay_ms: 100,
            stabilize_delay_ms: 50,
            no_change_limit: 2,
            max_steps: 4,
        };
        assert_eq!(s.worst_case_wait(), Duration::from_millis(600));
    }

    #[test]
    fn sort_round_trips_through_its_name() {
        for sort in [
            ReviewSort::MostRelevant,
            ReviewSort::Newest,
            ReviewSort::HighestRating,
            ReviewSort::LowestRating,
        ] {
            assert_eq!(sort.as_str().parse::<ReviewSort>().unwrap(), sort);
        }
    }
}
