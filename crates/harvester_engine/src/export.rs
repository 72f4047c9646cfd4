use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use harvester_core::{HarvestResult, ListingRecord, ReviewRecord};
use serde_json::json;
use tempfile::NamedTempFile;

use crate::HarvestReport;

pub const LISTINGS_FILENAME: &str = "restaurants.csv";
const LISTING_HEADER: [&str; 4] = ["Name", "Star Rating", "Number of Reviews", "Link"];
const REVIEW_HEADER: [&str; 4] = ["Restaurant", "Reviewer", "Stars", "Review"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("manifest encoding failed: {0}")]
    Manifest(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub record_count: usize,
    pub csv_path: PathBuf,
    pub manifest_path: PathBuf,
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), ExportError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(ExportError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Writes `{dir}/{filename}` through a temp file and a rename, so readers
/// never see a half-written export.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, ExportError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| ExportError::Io(e.error))?;
        Ok(target)
    }
}

/// Every cell quoted, embedded quotes doubled, rows joined with `\n`.
pub fn to_csv<const N: usize>(header: [&str; N], rows: impl IntoIterator<Item = [String; N]>) -> String {
    let mut out = join_row(header.iter().map(|h| h.to_string()));
    for row in rows {
        out.push('\n');
        out.push_str(&join_row(row.into_iter()));
    }
    out
}

fn join_row(cells: impl Iterator<Item = String>) -> String {
    cells
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn listings_csv(records: &[ListingRecord]) -> String {
    to_csv(
        LISTING_HEADER,
        records.iter().map(|r| {
            [
                r.name.clone(),
                optional(r.rating),
                optional(r.review_count),
                r.identity_url.clone(),
            ]
        }),
    )
}

pub fn reviews_csv(records: &[ReviewRecord]) -> String {
    to_csv(
        REVIEW_HEADER,
        records.iter().map(|r| {
            [
                r.subject_name.clone(),
                r.author.clone(),
                optional(r.stars),
                r.text.clone(),
            ]
        }),
    )
}

/// `{subject}_reviews.csv` with the subject reduced to word characters,
/// whitespace and dashes.
pub fn reviews_filename(subject: &str) -> String {
    let kept: String = subject
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let mut stem = kept.trim().to_string();
    if stem.chars().count() > 80 {
        stem = stem.chars().take(80).collect::<String>().trim_end().to_string();
    }
    if stem.is_empty() || is_reserved_windows_name(&stem) {
        return "reviews.csv".to_string();
    }
    format!("{stem}_reviews.csv")
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Write the CSV for `report` plus a `{csv}.json` manifest next to it.
///
/// `harvested_utc` is stamped into the manifest as given.
pub fn export_report(
    output_dir: &Path,
    report: &HarvestReport,
    harvested_utc: &str,
) -> Result<ExportSummary, ExportError> {
    let (filename, csv) = match report {
        HarvestReport::Listings(result) => (LISTINGS_FILENAME.to_string(), listings_csv(&result.records)),
        HarvestReport::Reviews(result) => {
            let subject = result
                .records
                .first()
                .map(|r| r.subject_name.as_str())
                .unwrap_or_default();
            (reviews_filename(subject), reviews_csv(&result.records))
        }
    };

    let writer = AtomicFileWriter::new(output_dir.to_path_buf());
    let csv_path = writer.write(&filename, &csv)?;

    let manifest = match report {
        HarvestReport::Listings(result) => manifest("listings", result, &filename, harvested_utc)?,
        HarvestReport::Reviews(result) => manifest("reviews", result, &filename, harvested_utc)?,
    };
    let manifest_path = writer.write(&format!("{filename}.json"), &serde_json::to_string_pretty(&manifest)?)?;

    Ok(ExportSummary {
        record_count: report.len(),
        csv_path,
        manifest_path,
    })
}

fn manifest<R>(
    kind: &str,
    result: &HarvestResult<R>,
    filename: &str,
    harvested_utc: &str,
) -> Result<serde_json::Value, ExportError> {
    Ok(json!({
        "kind": kind,
        "file": filename,
        "status": serde_json::to_value(result.status)?,
        "record_count": result.records.len(),
        "measurement": result.measurement,
        "steps": result.steps,
        "error": serde_json::to_value(&result.error)?,
        "warnings": serde_json::to_value(&result.warnings)?,
        "harvested_utc": harvested_utc,
    }))
}

#[cfg(test)]
mod tests {
    use super::{reviews_filename, to_csv};

    #[test]
    fn quotes_are_doubled() {
        let csv = to_csv(["A", "B"], [["say \"hi\"".to_string(), String::new()]]);
        assert_eq!(csv, "\"A\",\"B\"\n\"say \"\"hi\"\"\",\"\"");
    }

    #[test]
    fn review_filenames_drop_punctuation() {
        assert_eq!(reviews_filename("Café Rouge: Bar & Grill!"), "Café Rouge Bar  Grill_reviews.csv");
        assert_eq!(reviews_filename("  ***  "), "reviews.csv");
        assert_eq!(reviews_filename("con"), "reviews.csv");
    }
}
