//! Hypnogram entry types.
//!
//! An entry is one scored interval of a recording. Entries are created once by a
//! loader and then enriched in place by the run encoder, the awakening
//! classifier and the cycle merge step. They are never removed.

use crate::core::cycles::{CycleId, OffsetMode};
use crate::core::error::AnalysisError;
use crate::core::runs::{classify_awakenings, encode_runs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A scored sleep stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    W,
    N1,
    N2,
    N3,
    R,
}

impl Stage {
    /// Numeric stage code: W=0, N1=1, N2=2, N3=3, R=4.
    pub fn numeric(self) -> u8 {
        match self {
            Stage::W => 0,
            Stage::N1 => 1,
            Stage::N2 => 2,
            Stage::N3 => 3,
            Stage::R => 4,
        }
    }

    /// Inverse of [`Stage::numeric`].
    pub fn from_numeric(code: u8) -> Option<Self> {
        match code {
            0 => Some(Stage::W),
            1 => Some(Stage::N1),
            2 => Some(Stage::N2),
            3 => Some(Stage::N3),
            4 => Some(Stage::R),
            _ => None,
        }
    }

    /// Coarse sleep class of this stage.
    pub fn sleep_class(self) -> SleepClass {
        match self {
            Stage::W => SleepClass::Wake,
            Stage::N1 | Stage::N2 | Stage::N3 => SleepClass::Nrem,
            Stage::R => SleepClass::Rem,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::W => "W",
            Stage::N1 => "N1",
            Stage::N2 => "N2",
            Stage::N3 => "N3",
            Stage::R => "R",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = AnalysisError;

    /// Parse a stage label.
    ///
    /// Accepts the canonical labels, bare integers for NREM depth ("1", "2",
    /// "3") and EDF annotation descriptions such as `"Sleep stage N2"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let label = if trimmed.starts_with("Sleep stage") {
            trimmed.split_whitespace().nth(2).unwrap_or("")
        } else {
            trimmed
        };

        match label {
            "W" => Ok(Stage::W),
            "N1" | "1" => Ok(Stage::N1),
            "N2" | "2" => Ok(Stage::N2),
            "N3" | "3" => Ok(Stage::N3),
            "R" => Ok(Stage::R),
            _ => Err(AnalysisError::UnrecognizedStage(s.to_string())),
        }
    }
}

/// Coarse sleep class used to build runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SleepClass {
    Wake,
    #[serde(rename = "NREM")]
    Nrem,
    #[serde(rename = "REM")]
    Rem,
}

impl SleepClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SleepClass::Wake => "Wake",
            SleepClass::Nrem => "NREM",
            SleepClass::Rem => "REM",
        }
    }
}

impl fmt::Display for SleepClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Length classification of a Wake entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Awakening {
    Short,
    Long,
}

impl Awakening {
    pub fn as_str(self) -> &'static str {
        match self {
            Awakening::Short => "Short",
            Awakening::Long => "Long",
        }
    }
}

/// Cycle fields written onto an entry by the merge step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleAnnotation {
    pub cycle_id: CycleId,
    /// Duration of the whole cycle in minutes
    pub cycle_duration: f64,
    pub cycle_offset_mode: OffsetMode,
}

/// One scored interval of a hypnogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// 1-based entry index, strictly increasing and contiguous
    pub entry_id: u32,
    /// Onset in minutes from the start of the recording
    pub onset_min: f64,
    /// Duration in minutes
    pub duration_min: f64,
    pub stage: Stage,
    /// Run number, set by the run encoder (0 until then)
    pub run_id: u32,
    /// Total duration of the run this entry belongs to
    pub sleep_run_length: f64,
    /// Set only for Wake entries
    pub awakening: Option<Awakening>,
    /// Set by the merge step for entries inside a detected cycle
    pub cycle: Option<CycleAnnotation>,
}

impl Entry {
    /// Create an entry from the loader contract fields.
    pub fn new(entry_id: u32, onset_min: f64, duration_min: f64, stage: Stage) -> Self {
        Self {
            entry_id,
            onset_min,
            duration_min,
            stage,
            run_id: 0,
            sleep_run_length: 0.0,
            awakening: None,
            cycle: None,
        }
    }

    pub fn sleep_class(&self) -> SleepClass {
        self.stage.sleep_class()
    }

    pub fn stage_numeric(&self) -> u8 {
        self.stage.numeric()
    }

    /// End of the entry in minutes.
    pub fn offset_min(&self) -> f64 {
        self.onset_min + self.duration_min
    }

    /// Unique run key, e.g. `NREM_002`.
    pub fn sleep_run_key(&self) -> String {
        format!("{}_{:03}", self.sleep_class(), self.run_id)
    }
}

/// An ordered, run-encoded hypnogram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hypnogram {
    entries: Vec<Entry>,
}

impl Hypnogram {
    /// Encode runs and classify awakenings on entries ordered by onset.
    ///
    /// Entries must be sorted by onset with strictly increasing ids, as
    /// [`read_csv`](crate::hypnogram::read_csv) guarantees. Lookups and
    /// cycle search windows rely on that order; debug builds assert it.
    pub fn prepare(mut entries: Vec<Entry>, wake_thresh: f64) -> Result<Self, AnalysisError> {
        debug_assert!(
            is_ordered(&entries),
            "hypnogram entries must be ordered by onset and entry id"
        );
        classify_awakenings(&mut entries, wake_thresh)?;
        encode_runs(&mut entries);

        tracing::debug!(
            entries = entries.len(),
            runs = entries.last().map(|e| e.run_id).unwrap_or(0),
            "prepared hypnogram"
        );

        Ok(Self { entries })
    }

    pub(crate) fn from_prepared(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// End of the recording in minutes (0 for an empty hypnogram).
    pub fn end_min(&self) -> f64 {
        self.entries.last().map(Entry::offset_min).unwrap_or(0.0)
    }

    /// Look up an entry by its id.
    pub fn get(&self, entry_id: u32) -> Option<&Entry> {
        self.entries
            .binary_search_by_key(&entry_id, |e| e.entry_id)
            .ok()
            .map(|idx| &self.entries[idx])
    }
}

/// Whether onsets are non-decreasing and entry ids strictly increasing.
pub(crate) fn is_ordered(entries: &[Entry]) -> bool {
    entries
        .windows(2)
        .all(|w| w[0].onset_min <= w[1].onset_min && w[0].entry_id < w[1].entry_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_numeric_mapping() {
        for (stage, code) in [
            (Stage::W, 0),
            (Stage::N1, 1),
            (Stage::N2, 2),
            (Stage::N3, 3),
            (Stage::R, 4),
        ] {
            assert_eq!(stage.numeric(), code);
            assert_eq!(Stage::from_numeric(code), Some(stage));
        }
        assert_eq!(Stage::from_numeric(5), None);
    }

    #[test]
    fn test_stage_parsing() {
        assert_eq!("W".parse::<Stage>().unwrap(), Stage::W);
        assert_eq!("N2".parse::<Stage>().unwrap(), Stage::N2);
        assert_eq!("3".parse::<Stage>().unwrap(), Stage::N3);
        assert_eq!(" R ".parse::<Stage>().unwrap(), Stage::R);
        assert_eq!("Sleep stage W".parse::<Stage>().unwrap(), Stage::W);
        assert_eq!("Sleep stage 2".parse::<Stage>().unwrap(), Stage::N2);

        let err = "N4".parse::<Stage>().unwrap_err();
        assert_eq!(err, AnalysisError::UnrecognizedStage("N4".to_string()));
        assert!("Sleep stage ?".parse::<Stage>().is_err());
        assert!("".parse::<Stage>().is_err());
    }

    #[test]
    fn test_sleep_class() {
        assert_eq!(Stage::W.sleep_class(), SleepClass::Wake);
        assert_eq!(Stage::N1.sleep_class(), SleepClass::Nrem);
        assert_eq!(Stage::N3.sleep_class(), SleepClass::Nrem);
        assert_eq!(Stage::R.sleep_class(), SleepClass::Rem);
        assert_eq!(SleepClass::Nrem.to_string(), "NREM");
    }

    #[test]
    fn test_run_key_padding() {
        let mut entry = Entry::new(1, 0.0, 5.0, Stage::N2);
        entry.run_id = 2;
        assert_eq!(entry.sleep_run_key(), "NREM_002");
        assert_eq!(entry.offset_min(), 5.0);
    }

    #[test]
    fn test_prepare_and_lookup() {
        let entries = vec![
            Entry::new(1, 0.0, 5.0, Stage::W),
            Entry::new(2, 5.0, 15.0, Stage::N2),
            Entry::new(3, 20.0, 10.0, Stage::N3),
        ];
        let hypnogram = Hypnogram::prepare(entries, 2.0).unwrap();

        assert_eq!(hypnogram.len(), 3);
        assert_eq!(hypnogram.end_min(), 30.0);
        assert_eq!(hypnogram.get(3).unwrap().stage, Stage::N3);
        assert!(hypnogram.get(4).is_none());
        assert_eq!(hypnogram.get(1).unwrap().awakening, Some(Awakening::Long));
        assert_eq!(hypnogram.get(2).unwrap().sleep_run_length, 25.0);
    }

    #[test]
    fn test_prepare_rejects_bad_threshold() {
        let entries = vec![Entry::new(1, 0.0, 5.0, Stage::W)];
        assert!(matches!(
            Hypnogram::prepare(entries, 0.0),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_hypnogram() {
        let hypnogram = Hypnogram::prepare(Vec::new(), 2.0).unwrap();
        assert!(hypnogram.is_empty());
        assert_eq!(hypnogram.end_min(), 0.0);
    }

    #[test]
    fn test_is_ordered() {
        let entries = vec![
            Entry::new(1, 0.0, 5.0, Stage::W),
            Entry::new(2, 5.0, 0.0, Stage::N2),
            Entry::new(3, 5.0, 10.0, Stage::N3),
        ];
        assert!(is_ordered(&entries));
        assert!(is_ordered(&[]));

        let swapped = vec![entries[1].clone(), entries[0].clone()];
        assert!(!is_ordered(&swapped));

        let repeated_id = vec![entries[0].clone(), Entry::new(1, 5.0, 5.0, Stage::N2)];
        assert!(!is_ordered(&repeated_id));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "ordered by onset")]
    fn test_prepare_asserts_order() {
        let entries = vec![
            Entry::new(2, 5.0, 15.0, Stage::N2),
            Entry::new(1, 0.0, 5.0, Stage::W),
        ];
        let _ = Hypnogram::prepare(entries, 2.0);
    }
}
