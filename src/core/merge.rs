//! Write detected cycles back onto hypnogram entries.

use crate::core::cycles::Cycle;
use crate::hypnogram::types::{CycleAnnotation, Entry, Hypnogram};

/// Return a copy of the hypnogram with cycle fields set on every entry
/// inside a cycle's entry range.
///
/// Entries outside all cycles have no cycle annotation. Cycles are applied
/// in order, so if two ranges overlap the later cycle wins.
pub fn merge_cycles(hypnogram: &Hypnogram, cycles: &[Cycle]) -> Hypnogram {
    let mut entries: Vec<Entry> = hypnogram.entries().to_vec();
    for entry in entries.iter_mut() {
        entry.cycle = None;
    }

    for cycle in cycles {
        let annotation = CycleAnnotation {
            cycle_id: cycle.cycle_id,
            cycle_duration: cycle.duration_min,
            cycle_offset_mode: cycle.offset_mode,
        };

        // Entry ids are strictly increasing.
        let start = entries.partition_point(|e| e.entry_id < cycle.onset_entry_id);
        let end = entries.partition_point(|e| e.entry_id <= cycle.offset_entry_id);
        if start >= end {
            continue;
        }
        for entry in &mut entries[start..end] {
            entry.cycle = Some(annotation);
        }
    }

    Hypnogram::from_prepared(entries)
}
