//! Tabular exports.
//!
//! Writes the cycle table, the annotated entry table and the epoch table as
//! CSV. Missing values are written as empty cells.

use crate::core::cycles::Cycle;
use crate::core::resample::Epoch;
use crate::hypnogram::types::Entry;
use std::io::Write;

/// Header of the cycle table.
pub const CYCLE_COLUMNS: [&str; 7] = [
    "Cycle",
    "Onset",
    "Offset",
    "Duration",
    "Offset_Mode",
    "Onset_Entry",
    "Offset_Entry",
];

/// Header of the annotated entry table.
pub const ENTRY_COLUMNS: [&str; 13] = [
    "Entry",
    "Onset",
    "Duration",
    "Stage",
    "StageN",
    "Sleep",
    "Run",
    "Sleep_Run",
    "Sleep_Runlength",
    "Awakening",
    "Cycle_Num",
    "Cycle_Duration",
    "Cycle_Offset_Mode",
];

/// Write detected cycles.
pub fn write_cycles<W: Write>(writer: W, cycles: &[Cycle]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CYCLE_COLUMNS)?;
    for cycle in cycles {
        wtr.write_record([
            cycle.cycle_id.to_string(),
            cycle.onset_min.to_string(),
            cycle.offset_min.to_string(),
            cycle.duration_min.to_string(),
            cycle.offset_mode.to_string(),
            cycle.onset_entry_id.to_string(),
            cycle.offset_entry_id.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write entries with their run, awakening and cycle fields.
pub fn write_entries<W: Write>(writer: W, entries: &[Entry]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(ENTRY_COLUMNS)?;
    for entry in entries {
        let cycle = entry.cycle.as_ref();
        wtr.write_record([
            entry.entry_id.to_string(),
            entry.onset_min.to_string(),
            entry.duration_min.to_string(),
            entry.stage.to_string(),
            entry.stage_numeric().to_string(),
            entry.sleep_class().to_string(),
            entry.run_id.to_string(),
            entry.sleep_run_key(),
            entry.sleep_run_length.to_string(),
            entry
                .awakening
                .map(|a| a.as_str().to_string())
                .unwrap_or_default(),
            cycle.map(|c| c.cycle_id.to_string()).unwrap_or_default(),
            cycle
                .map(|c| c.cycle_duration.to_string())
                .unwrap_or_default(),
            cycle
                .map(|c| c.cycle_offset_mode.to_string())
                .unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write resampled epochs. The `Cycle_Num` column is only written when
/// `with_cycles` is set.
pub fn write_epochs<W: Write>(
    writer: W,
    epochs: &[Epoch],
    with_cycles: bool,
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["Epoch_number", "Hypnogram_Entry", "Stage", "StageN"];
    if with_cycles {
        header.push("Cycle_Num");
    }
    wtr.write_record(&header)?;

    for epoch in epochs {
        let mut record = vec![
            epoch.epoch_number.to_string(),
            epoch.entry_id.to_string(),
            epoch.stage.to_string(),
            epoch.stage_numeric.to_string(),
        ];
        if with_cycles {
            record.push(epoch.cycle_id.map(|c| c.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}
