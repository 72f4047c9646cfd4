use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::{engine_error, engine_info, engine_warn};
use harvester_core::{HarvestSettings, ReviewSort, ScrollSpeed};
use harvester_engine::AtomicFileWriter;
use serde::{Deserialize, Serialize};

/// Options remembered between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppSettings {
    pub listings: HarvestSettings,
    pub reviews: HarvestSettings,
    pub sort: ReviewSort,
    /// Overrides the scroll delay of both harvesters when set.
    pub speed: Option<ScrollSpeed>,
    pub output_dir: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            listings: HarvestSettings::listings(),
            reviews: HarvestSettings::reviews(),
            sort: ReviewSort::default(),
            speed: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

pub(crate) fn load_settings(path: &Path) -> AppSettings {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return AppSettings::default();
        }
        Err(err) => {
            engine_warn!("Failed to read settings from {:?}: {}", path, err);
            return AppSettings::default();
        }
    };

    match ron::from_str(&content) {
        Ok(settings) => {
            engine_info!("Loaded settings from {:?}", path);
            settings
        }
        Err(err) => {
            engine_warn!("Failed to parse settings from {:?}: {}", path, err);
            AppSettings::default()
        }
    }
}

pub(crate) fn save_settings(path: &Path, settings: &AppSettings) {
    let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
        engine_error!("Settings path {:?} has no file name", path);
        return;
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(settings, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_error!("Failed to serialize settings: {}", err);
            return;
        }
    };

    match AtomicFileWriter::new(dir).write(filename, &content) {
        Ok(written) => engine_info!("Saved settings to {:?}", written),
        Err(err) => engine_error!("Failed to write settings to {:?}: {}", path, err),
    }
}
