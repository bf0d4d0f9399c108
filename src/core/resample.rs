//! Epoch-wise resampling of a hypnogram.
//!
//! Duration-based entries are expanded onto a fixed grid of 30 second epochs
//! so that every epoch carries the stage (and cycle, when merged) of the entry
//! it falls in.

use crate::core::cycles::CycleId;
use crate::core::error::AnalysisError;
use crate::hypnogram::types::{Entry, Hypnogram, Stage};
use serde::{Deserialize, Serialize};

/// Epochs per minute of recording.
pub const EPOCHS_PER_MINUTE: f64 = 2.0;

/// One epoch of a resampled hypnogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epoch {
    /// 0-based sequential epoch number
    pub epoch_number: u64,
    /// Id of the entry this epoch was expanded from
    pub entry_id: u32,
    pub stage: Stage,
    pub stage_numeric: u8,
    /// Cycle of the originating entry, if cycles were merged
    pub cycle_id: Option<CycleId>,
}

/// Number of epochs a span of `minutes` occupies.
pub fn epoch_count(minutes: f64) -> u64 {
    (minutes * EPOCHS_PER_MINUTE).round().max(0.0) as u64
}

/// Expand every entry into `round(duration * 2)` epochs.
///
/// Fails with [`AnalysisError::InconsistentDuration`] when the epochs do not
/// add up to the end of the recording, i.e. when entries overlap or leave
/// gaps. No partial output is returned in that case.
pub fn resample(hypnogram: &Hypnogram) -> Result<Vec<Epoch>, AnalysisError> {
    resample_entries(hypnogram.entries())
}

/// Like [`resample`], for a plain entry slice ordered by onset.
pub fn resample_entries(entries: &[Entry]) -> Result<Vec<Epoch>, AnalysisError> {
    let Some(last) = entries.last() else {
        return Ok(Vec::new());
    };

    let mut epochs = Vec::new();
    let mut epoch_number = 0;
    for entry in entries {
        let cycle_id = entry.cycle.map(|c| c.cycle_id);
        for _ in 0..epoch_count(entry.duration_min) {
            epochs.push(Epoch {
                epoch_number,
                entry_id: entry.entry_id,
                stage: entry.stage,
                stage_numeric: entry.stage_numeric(),
                cycle_id,
            });
            epoch_number += 1;
        }
    }

    let expected = epoch_count(last.offset_min());
    let actual = epochs.len() as u64;
    if actual != expected {
        return Err(AnalysisError::InconsistentDuration { expected, actual });
    }

    tracing::debug!(epochs = actual, "resampled hypnogram");

    Ok(epochs)
}
