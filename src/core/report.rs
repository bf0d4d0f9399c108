//! Cycle report builder.
//!
//! A report bundles the detected cycles, the cycle-annotated entries and a
//! coverage summary into a single serializable document.

use crate::config::CycleConfig;
use crate::core::cycles::Cycle;
use crate::hypnogram::types::{Entry, Hypnogram, SleepClass};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The current report format version.
pub const REPORT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "hypnocycle";

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
}

/// How much of the recording is covered by detected cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle_count: usize,
    /// Sum of all cycle durations in minutes
    pub total_cycle_duration_min: f64,
    /// End of the last entry in minutes
    pub recording_duration_min: f64,
    /// Share of the recording inside a cycle (0-100)
    pub coverage_percent: f64,
}

impl CycleSummary {
    pub fn compute(hypnogram: &Hypnogram, cycles: &[Cycle]) -> Self {
        let total_cycle_duration_min: f64 = cycles.iter().map(|c| c.duration_min).sum();
        let recording_duration_min = hypnogram.end_min();
        let coverage_percent = if recording_duration_min > 0.0 {
            100.0 * total_cycle_duration_min / recording_duration_min
        } else {
            0.0
        };

        Self {
            cycle_count: cycles.len(),
            total_cycle_duration_min,
            recording_duration_min,
            coverage_percent,
        }
    }

    /// One-line description, e.g. `2 sleep cycles - coverage: 45.0% of recording (80 of 178 min)`.
    pub fn headline(&self) -> String {
        format!(
            "{} sleep cycle{} - coverage: {:.1}% of recording ({} of {} min)",
            self.cycle_count,
            if self.cycle_count == 1 { "" } else { "s" },
            self.coverage_percent,
            self.total_cycle_duration_min,
            self.recording_duration_min
        )
    }
}

/// An entry together with the fields derived from its stage and run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    #[serde(flatten)]
    pub entry: Entry,
    pub sleep_class: SleepClass,
    pub stage_numeric: u8,
    /// Run key, e.g. `NREM_002`
    pub sleep_run_key: String,
}

impl From<&Entry> for ReportEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            sleep_class: entry.sleep_class(),
            stage_numeric: entry.stage_numeric(),
            sleep_run_key: entry.sleep_run_key(),
            entry: entry.clone(),
        }
    }
}

/// A complete cycle detection report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub report_version: String,
    pub report_id: String,
    /// When this report was generated (RFC3339)
    pub generated_at_utc: String,
    pub producer: ReportProducer,
    /// Label of the analysed recording, usually a file name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub config: CycleConfig,
    pub summary: CycleSummary,
    pub cycles: Vec<Cycle>,
    /// Entries with cycle annotations
    pub entries: Vec<ReportEntry>,
}

/// Builder for cycle reports.
pub struct ReportBuilder {
    source: Option<String>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self { source: None }
    }

    /// Set the recording label for generated reports.
    pub fn with_source(mut self, source: String) -> Self {
        self.source = Some(source);
        self
    }

    /// Build a report from a cycle-annotated hypnogram and its cycles.
    pub fn build(&self, hypnogram: &Hypnogram, cycles: &[Cycle], config: &CycleConfig) -> CycleReport {
        CycleReport {
            report_version: REPORT_VERSION.to_string(),
            report_id: Uuid::new_v4().to_string(),
            generated_at_utc: Utc::now().to_rfc3339(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            source: self.source.clone(),
            config: *config,
            summary: CycleSummary::compute(hypnogram, cycles),
            cycles: cycles.to_vec(),
            entries: hypnogram.entries().iter().map(ReportEntry::from).collect(),
        }
    }

    /// Build and serialize a report to JSON.
    pub fn build_json(
        &self,
        hypnogram: &Hypnogram,
        cycles: &[Cycle],
        config: &CycleConfig,
    ) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.build(hypnogram, cycles, config))
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cycles::{CycleId, OffsetMode};
    use crate::hypnogram::types::Stage;

    fn sample() -> (Hypnogram, Vec<Cycle>) {
        let entries = vec![
            Entry::new(1, 0.0, 10.0, Stage::W),
            Entry::new(2, 10.0, 30.0, Stage::N2),
            Entry::new(3, 40.0, 10.0, Stage::R),
        ];
        let hypnogram = Hypnogram::prepare(entries, 2.0).unwrap();
        let cycles = vec![Cycle {
            cycle_id: CycleId::new(1),
            onset_min: 10.0,
            offset_min: 50.0,
            duration_min: 40.0,
            offset_mode: OffsetMode::LastRem,
            onset_entry_id: 2,
            offset_entry_id: 3,
        }];
        (hypnogram, cycles)
    }

    #[test]
    fn test_summary_coverage() {
        let (hypnogram, cycles) = sample();
        let summary = CycleSummary::compute(&hypnogram, &cycles);

        assert_eq!(summary.cycle_count, 1);
        assert_eq!(summary.total_cycle_duration_min, 40.0);
        assert_eq!(summary.recording_duration_min, 50.0);
        assert_eq!(summary.coverage_percent, 80.0);
        assert!(summary.headline().starts_with("1 sleep cycle -"));
        assert!(summary.headline().contains("80.0%"));
    }

    #[test]
    fn test_summary_empty_recording() {
        let summary = CycleSummary::compute(&Hypnogram::default(), &[]);
        assert_eq!(summary.cycle_count, 0);
        assert_eq!(summary.coverage_percent, 0.0);
    }

    #[test]
    fn test_report_contents() {
        let (hypnogram, cycles) = sample();
        let report = ReportBuilder::new()
            .with_source("night1.csv".to_string())
            .build(&hypnogram, &cycles, &CycleConfig::default());

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.source.as_deref(), Some("night1.csv"));
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.entries.len(), 3);
        assert!(!report.generated_at_utc.is_empty());
    }

    #[test]
    fn test_report_ids_are_unique() {
        let (hypnogram, cycles) = sample();
        let builder = ReportBuilder::new();
        let config = CycleConfig::default();
        let a = builder.build(&hypnogram, &cycles, &config);
        let b = builder.build(&hypnogram, &cycles, &config);
        assert_ne!(a.report_id, b.report_id);
    }

    #[test]
    fn test_report_json_serialization() {
        let (hypnogram, cycles) = sample();
        let json = ReportBuilder::new()
            .build_json(&hypnogram, &cycles, &CycleConfig::default())
            .unwrap();

        assert!(json.contains("report_version"));
        assert!(json.contains("\"CYC_1\""));
        assert!(json.contains("\"Last_REM\""));
        assert!(json.contains("coverage_percent"));
        assert!(!json.contains("\"source\""));

        let parsed: CycleReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.cycles, cycles);
        assert_eq!(parsed.entries[1].entry, hypnogram.entries()[1]);
    }

    #[test]
    fn test_report_entries_carry_derived_fields() {
        let (hypnogram, cycles) = sample();
        let report = ReportBuilder::new().build(&hypnogram, &cycles, &CycleConfig::default());

        let value = serde_json::to_value(&report).unwrap();
        let entry = &value["entries"][1];
        assert_eq!(entry["entry_id"], 2);
        assert_eq!(entry["stage"], "N2");
        assert_eq!(entry["sleep_class"], "NREM");
        assert_eq!(entry["stage_numeric"], 2);
        assert_eq!(entry["sleep_run_key"], "NREM_002");
        assert_eq!(value["entries"][0]["sleep_run_key"], "Wake_001");
    }
}
