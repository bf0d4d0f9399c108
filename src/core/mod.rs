//! Core functionality for hypnocycle.
//!
//! This module contains:
//! - Run encoding and awakening classification
//! - Cycle detection (NREM run filter, segregation, offset resolution)
//! - Merging detected cycles back onto the entries
//! - Epoch resampling
//! - Report building for export

pub mod cycles;
pub mod error;
pub mod merge;
pub mod report;
pub mod resample;
pub mod runs;

// Re-export commonly used types
pub use cycles::{
    detect_cycles, filter_nrem_runs, resolve_offsets, segregate_runs, Cycle, CycleGroup, CycleId,
    NremRun, OffsetMode, SeparatedRun,
};
pub use error::AnalysisError;
pub use merge::merge_cycles;
pub use report::{
    CycleReport, CycleSummary, ReportBuilder, ReportEntry, PRODUCER_NAME, REPORT_VERSION,
};
pub use resample::{epoch_count, resample, resample_entries, Epoch, EPOCHS_PER_MINUTE};
pub use runs::{classify_awakenings, encode_runs};

use crate::config::CycleConfig;
use crate::hypnogram::types::{Entry, Hypnogram};

/// Result of running the full detection pipeline.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Hypnogram with run, awakening and cycle fields filled in
    pub hypnogram: Hypnogram,
    pub cycles: Vec<Cycle>,
}

/// Prepare raw entries, detect cycles and merge them back.
///
/// The whole configuration is validated before any entry is touched.
/// `entries` must be sorted by onset with strictly increasing ids; debug
/// builds panic otherwise. [`read_csv`](crate::hypnogram::read_csv) rejects
/// unordered files.
pub fn analyze(entries: Vec<Entry>, config: &CycleConfig) -> Result<Analysis, AnalysisError> {
    config.validate()?;

    let prepared = Hypnogram::prepare(entries, config.wake_thresh)?;
    let cycles = detect_cycles(&prepared, config)?;
    let hypnogram = merge_cycles(&prepared, &cycles);

    Ok(Analysis { hypnogram, cycles })
}
