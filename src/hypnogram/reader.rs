//! Tabulated hypnogram loader.
//!
//! Reads CSV files with the columns `Entry, Onset, Duration, Stage` and an
//! optional `StageN`. Onsets and durations are in minutes.

use crate::core::error::AnalysisError;
use crate::hypnogram::types::{Entry, Stage};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Columns a hypnogram table may contain.
const KNOWN_COLUMNS: [&str; 5] = ["Entry", "Onset", "Duration", "Stage", "StageN"];

/// Columns a hypnogram table must contain.
const REQUIRED_COLUMNS: [&str; 4] = ["Entry", "Onset", "Duration", "Stage"];

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Entry")]
    entry: u32,
    #[serde(rename = "Onset")]
    onset: f64,
    #[serde(rename = "Duration")]
    duration: f64,
    #[serde(rename = "Stage")]
    stage: String,
    #[serde(rename = "StageN", default)]
    stage_numeric: Option<u8>,
}

/// Read a hypnogram CSV file into raw entries.
pub fn read_csv(path: &Path) -> Result<Vec<Entry>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::IoError(e.to_string()))?;
    from_reader(file)
}

/// Read hypnogram CSV data from any reader.
pub fn from_reader<R: Read>(rdr: R) -> Result<Vec<Entry>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(rdr);

    let headers = reader
        .headers()
        .map_err(|e| LoadError::ParseError(e.to_string()))?
        .clone();
    if let Some(unknown) = headers.iter().find(|h| !KNOWN_COLUMNS.contains(h)) {
        return Err(LoadError::UnexpectedColumn(unknown.to_string()));
    }
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|&&required| !headers.iter().any(|h| h == required))
    {
        return Err(LoadError::MissingColumn(missing.to_string()));
    }

    let mut entries: Vec<Entry> = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        let row = result.map_err(|e| LoadError::ParseError(e.to_string()))?;
        let stage: Stage = row.stage.parse()?;

        if let Some(code) = row.stage_numeric {
            if code != stage.numeric() {
                return Err(LoadError::StageCodeMismatch {
                    entry_id: row.entry,
                    stage,
                    code,
                });
            }
        }

        let entry = Entry::new(row.entry, row.onset, row.duration, stage);
        check_order(entries.last(), &entry)?;
        entries.push(entry);
    }

    tracing::debug!(entries = entries.len(), "loaded hypnogram table");

    Ok(entries)
}

/// Check an entry against its predecessor.
fn check_order(previous: Option<&Entry>, entry: &Entry) -> Result<(), LoadError> {
    let invalid = |reason: String| LoadError::InvalidEntry {
        entry_id: entry.entry_id,
        reason,
    };

    if entry.entry_id == 0 {
        return Err(invalid("entry ids start at 1".to_string()));
    }
    if !entry.onset_min.is_finite() || entry.onset_min < 0.0 {
        return Err(invalid(format!("invalid onset {}", entry.onset_min)));
    }
    if !entry.duration_min.is_finite() || entry.duration_min < 0.0 {
        return Err(invalid(format!("invalid duration {}", entry.duration_min)));
    }

    if let Some(prev) = previous {
        if entry.entry_id != prev.entry_id + 1 {
            return Err(invalid(format!(
                "entry ids must be contiguous, previous was {}",
                prev.entry_id
            )));
        }
        if entry.onset_min < prev.onset_min {
            return Err(invalid(format!(
                "onset {} precedes previous onset {}",
                entry.onset_min, prev.onset_min
            )));
        }
    }

    Ok(())
}

/// Hypnogram loading errors.
#[derive(Debug)]
pub enum LoadError {
    IoError(String),
    ParseError(String),
    UnexpectedColumn(String),
    MissingColumn(String),
    StageCodeMismatch { entry_id: u32, stage: Stage, code: u8 },
    InvalidEntry { entry_id: u32, reason: String },
    Analysis(AnalysisError),
}

impl From<AnalysisError> for LoadError {
    fn from(e: AnalysisError) -> Self {
        LoadError::Analysis(e)
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::IoError(e) => write!(f, "IO error: {e}"),
            LoadError::ParseError(e) => write!(f, "Parse error: {e}"),
            LoadError::UnexpectedColumn(c) => {
                write!(f, "CSV does not look like a hypnogram: unexpected column {c:?}")
            }
            LoadError::MissingColumn(c) => write!(f, "CSV is missing column {c:?}"),
            LoadError::StageCodeMismatch {
                entry_id,
                stage,
                code,
            } => write!(
                f,
                "Entry {entry_id}: StageN {code} does not match stage {stage}"
            ),
            LoadError::InvalidEntry { entry_id, reason } => write!(f, "Entry {entry_id}: {reason}"),
            LoadError::Analysis(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LoadError {}
