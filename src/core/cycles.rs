//! Sleep cycle detection.
//!
//! Detection runs in three stages over a prepared hypnogram:
//!
//! 1. **Filter**: keep NREM runs longer than `min_length`, one row per run.
//! 2. **Segregate**: group consecutive runs into provisional cycles. A run
//!    opens a new cycle when the gap after the *previous* run exceeds
//!    `min_separation`.
//! 3. **Resolve**: search each provisional cycle's window for its offset,
//!    trying in order the last REM entry, the first N3 entry directly
//!    followed by Wake, then the first long awakening. A cycle matching none
//!    of these is dropped.

use crate::config::CycleConfig;
use crate::core::error::{ensure_positive, AnalysisError};
use crate::hypnogram::types::{Awakening, Entry, Hypnogram, SleepClass, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Prefix of cycle labels.
const CYCLE_LABEL_PREFIX: &str = "CYC_";

/// 1-based cycle identifier, displayed as `CYC_<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CycleId(u32);

impl CycleId {
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    pub fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CYCLE_LABEL_PREFIX}{}", self.0)
    }
}

impl FromStr for CycleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(CYCLE_LABEL_PREFIX)
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .map(CycleId)
            .ok_or_else(|| format!("invalid cycle label: {s:?}"))
    }
}

impl TryFrom<String> for CycleId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CycleId> for String {
    fn from(id: CycleId) -> Self {
        id.to_string()
    }
}

/// The rule that terminated a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OffsetMode {
    /// End of the last REM entry in the window
    #[serde(rename = "Last_REM")]
    LastRem,
    /// End of the first N3 entry directly followed by Wake
    #[serde(rename = "Last_N3_Before_Awakening")]
    LastN3BeforeAwakening,
    /// Onset of the first long awakening
    #[serde(rename = "Long_Awakening")]
    LongAwakening,
}

impl OffsetMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OffsetMode::LastRem => "Last_REM",
            OffsetMode::LastN3BeforeAwakening => "Last_N3_Before_Awakening",
            OffsetMode::LongAwakening => "Long_Awakening",
        }
    }
}

impl fmt::Display for OffsetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A qualifying NREM run, represented by its first entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NremRun {
    /// Run key of the form `NREM_<run_id>`
    pub run_key: String,
    /// Id of the run's first entry
    pub entry_id: u32,
    pub onset_min: f64,
    /// Onset plus the total run length
    pub offset_min: f64,
}

/// A run with the gap separating it from the next run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeparatedRun {
    pub run: NremRun,
    /// Minutes until the next run's onset, or until the end of the recording
    /// for the final run
    pub gap_min: f64,
}

/// A provisional cycle: consecutive runs not separated by a long gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleGroup {
    pub id: CycleId,
    /// Id of the first entry of the first run
    pub onset_entry_id: u32,
    /// Onset of the first run
    pub lower_min: f64,
    /// Offset of the last run plus its gap
    pub upper_min: f64,
    pub runs: Vec<SeparatedRun>,
}

impl CycleGroup {
    fn new(id: CycleId, first: SeparatedRun) -> Self {
        Self {
            id,
            onset_entry_id: first.run.entry_id,
            lower_min: first.run.onset_min,
            upper_min: first.run.offset_min + first.gap_min,
            runs: vec![first],
        }
    }

    fn push(&mut self, run: SeparatedRun) {
        self.upper_min = run.run.offset_min + run.gap_min;
        self.runs.push(run);
    }
}

/// A resolved sleep cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub cycle_id: CycleId,
    pub onset_min: f64,
    pub offset_min: f64,
    pub duration_min: f64,
    pub offset_mode: OffsetMode,
    pub onset_entry_id: u32,
    pub offset_entry_id: u32,
}

impl Cycle {
    /// Entry ids covered by this cycle, inclusive on both ends.
    pub fn entry_range(&self) -> RangeInclusive<u32> {
        self.onset_entry_id..=self.offset_entry_id
    }
}

/// Select NREM runs longer than `min_length` minutes.
///
/// Returns one row per qualifying run, in onset order.
pub fn filter_nrem_runs(entries: &[Entry], min_length: f64) -> Result<Vec<NremRun>, AnalysisError> {
    ensure_positive("min_length", min_length)?;

    let mut runs: Vec<NremRun> = Vec::new();
    let mut last_run_id = None;

    for entry in entries {
        if entry.sleep_class() != SleepClass::Nrem || entry.sleep_run_length <= min_length {
            continue;
        }
        if last_run_id == Some(entry.run_id) {
            continue;
        }
        last_run_id = Some(entry.run_id);
        runs.push(NremRun {
            run_key: entry.sleep_run_key(),
            entry_id: entry.entry_id,
            onset_min: entry.onset_min,
            offset_min: entry.onset_min + entry.sleep_run_length,
        });
    }

    Ok(runs)
}

/// Group runs into provisional cycles.
///
/// `recording_end_min` bounds the gap of the final run.
pub fn segregate_runs(
    runs: &[NremRun],
    min_separation: f64,
    recording_end_min: f64,
) -> Result<Vec<CycleGroup>, AnalysisError> {
    ensure_positive("min_separation", min_separation)?;

    let mut groups: Vec<CycleGroup> = Vec::new();
    let mut number = 1;
    let mut previous_gap_exceeded = false;

    for (i, run) in runs.iter().enumerate() {
        let gap_min = match runs.get(i + 1) {
            Some(next) => next.onset_min - run.offset_min,
            None => recording_end_min - run.offset_min,
        };

        // Group membership lags the gap test by one row.
        if previous_gap_exceeded {
            number += 1;
        }
        previous_gap_exceeded = gap_min > min_separation;

        let separated = SeparatedRun {
            run: run.clone(),
            gap_min,
        };
        match groups.last_mut() {
            Some(group) if group.id.number() == number => group.push(separated),
            _ => groups.push(CycleGroup::new(CycleId(number), separated)),
        }
    }

    Ok(groups)
}

/// Resolve the offset of each provisional cycle.
///
/// Groups whose window matches none of the offset rules are dropped.
pub fn resolve_offsets(entries: &[Entry], groups: &[CycleGroup]) -> Vec<Cycle> {
    let mut cycles = Vec::with_capacity(groups.len());

    for group in groups {
        let window = search_window(entries, group.lower_min, group.upper_min);

        match find_offset(window) {
            Some((offset_min, offset_mode, offset_entry_id)) => cycles.push(Cycle {
                cycle_id: group.id,
                onset_min: group.lower_min,
                offset_min,
                duration_min: offset_min - group.lower_min,
                offset_mode,
                onset_entry_id: group.onset_entry_id,
                offset_entry_id,
            }),
            None => {
                tracing::warn!(
                    cycle = %group.id,
                    lower_min = group.lower_min,
                    upper_min = group.upper_min,
                    "no cycle offset found in window, dropping cycle"
                );
            }
        }
    }

    cycles
}

/// Entries with onset strictly between `lower` and `upper`.
///
/// Entries are sorted by onset, so the window is a contiguous slice.
fn search_window(entries: &[Entry], lower: f64, upper: f64) -> &[Entry] {
    let start = entries.partition_point(|e| e.onset_min <= lower);
    let end = entries.partition_point(|e| e.onset_min < upper);
    if start < end {
        &entries[start..end]
    } else {
        &[]
    }
}

/// Apply the offset rules in priority order.
fn find_offset(window: &[Entry]) -> Option<(f64, OffsetMode, u32)> {
    if let Some(rem) = window
        .iter()
        .rev()
        .find(|e| e.sleep_class() == SleepClass::Rem)
    {
        return Some((rem.offset_min(), OffsetMode::LastRem, rem.entry_id));
    }

    if let Some(pair) = window
        .windows(2)
        .find(|pair| pair[0].stage == Stage::N3 && pair[1].stage == Stage::W)
    {
        let n3 = &pair[0];
        return Some((n3.offset_min(), OffsetMode::LastN3BeforeAwakening, n3.entry_id));
    }

    // The awakening itself is not part of the cycle.
    window
        .iter()
        .find(|e| e.awakening == Some(Awakening::Long))
        .map(|wake| {
            (
                wake.onset_min,
                OffsetMode::LongAwakening,
                wake.entry_id.saturating_sub(1),
            )
        })
}

/// Detect sleep cycles in a prepared hypnogram.
pub fn detect_cycles(hypnogram: &Hypnogram, config: &CycleConfig) -> Result<Vec<Cycle>, AnalysisError> {
    config.validate()?;

    let entries = hypnogram.entries();
    let runs = filter_nrem_runs(entries, config.min_length)?;
    let groups = segregate_runs(&runs, config.min_separation, hypnogram.end_min())?;
    let cycles = resolve_offsets(entries, &groups);

    tracing::debug!(
        nrem_runs = runs.len(),
        groups = groups.len(),
        cycles = cycles.len(),
        "cycle detection complete"
    );

    Ok(cycles)
}
