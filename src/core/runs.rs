//! Run encoding and awakening classification.
//!
//! A run is a maximal block of consecutive entries sharing a sleep class.
//! Runs are numbered from 1 in a single forward pass; run lengths are
//! aggregated in a second pass once every entry has its run number.

use crate::core::error::{ensure_positive, AnalysisError};
use crate::hypnogram::types::{Awakening, Entry, Stage};

/// Assign `run_id` and `sleep_run_length` to every entry.
pub fn encode_runs(entries: &mut [Entry]) {
    let mut run_id = 0;
    let mut previous = None;
    for entry in entries.iter_mut() {
        let class = entry.sleep_class();
        if previous != Some(class) {
            run_id += 1;
            previous = Some(class);
        }
        entry.run_id = run_id;
    }

    let mut lengths = vec![0.0_f64; run_id as usize + 1];
    for entry in entries.iter() {
        lengths[entry.run_id as usize] += entry.duration_min;
    }
    for entry in entries.iter_mut() {
        entry.sleep_run_length = lengths[entry.run_id as usize];
    }
}

/// Tag Wake entries as short or long awakenings.
///
/// A Wake entry lasting at most `wake_thresh` minutes is `Short`, anything
/// longer is `Long`. Other stages are left untagged.
pub fn classify_awakenings(entries: &mut [Entry], wake_thresh: f64) -> Result<(), AnalysisError> {
    ensure_positive("wake_thresh", wake_thresh)?;

    for entry in entries.iter_mut() {
        entry.awakening = match entry.stage {
            Stage::W if entry.duration_min <= wake_thresh => Some(Awakening::Short),
            Stage::W => Some(Awakening::Long),
            _ => None,
        };
    }

    Ok(())
}
