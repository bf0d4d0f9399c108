//! Hypnocycle - rule-based sleep cycle detection for scored hypnograms.
//!
//! This library takes a hypnogram (ordered entries scored W/N1/N2/N3/R with
//! onset and duration in minutes) and detects sleep cycles: spans that start
//! at a sufficiently long NREM run and end at a deterministic termination
//! point.
//!
//! # Offset Rules
//!
//! Each provisional cycle is searched for its offset, first match wins:
//!
//! - **Last_REM**: end of the last REM entry in the search window
//! - **Last_N3_Before_Awakening**: end of the first N3 entry directly followed by Wake
//! - **Long_Awakening**: onset of the first Wake entry longer than `wake_thresh`
//!
//! A provisional cycle matching none of the rules is dropped.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Hypnocycle                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Loader    │──▶│    Runs     │──▶│ NREM filter │        │
//! │  │   (CSV)     │   │ + awakening │   │ + segregate │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                                             │               │
//! │                                             ▼               │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │  Resample   │◀──│    Merge    │◀──│   Offset    │        │
//! │  │  (epochs)   │   │  (entries)  │   │  resolver   │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use hypnocycle::{analyze, CycleConfig, Entry, OffsetMode, Stage};
//!
//! let entries = vec![
//!     Entry::new(1, 0.0, 5.0, Stage::W),
//!     Entry::new(2, 5.0, 30.0, Stage::N2),
//!     Entry::new(3, 35.0, 10.0, Stage::R),
//!     Entry::new(4, 45.0, 10.0, Stage::W),
//! ];
//!
//! let analysis = analyze(entries, &CycleConfig::default()).unwrap();
//! assert_eq!(analysis.cycles.len(), 1);
//! assert_eq!(analysis.cycles[0].offset_mode, OffsetMode::LastRem);
//! assert_eq!(analysis.cycles[0].offset_min, 45.0);
//! ```

pub mod config;
pub mod core;
pub mod export;
pub mod hypnogram;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, CycleConfig};
pub use crate::core::{
    analyze, detect_cycles, merge_cycles, resample, Analysis, AnalysisError, Cycle, CycleId,
    CycleReport, CycleSummary, Epoch, OffsetMode, ReportBuilder, EPOCHS_PER_MINUTE,
};
pub use hypnogram::{read_csv, Awakening, Entry, Hypnogram, LoadError, SleepClass, Stage};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
