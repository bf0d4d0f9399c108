//! Hypnogram input for hypnocycle.
//!
//! This module provides the entry types produced by loaders and the CSV
//! loader itself. Loaders only supply the scored intervals; runs, awakenings
//! and cycles are filled in by the core pipeline.

pub mod reader;
pub mod types;

// Re-export commonly used types
pub use reader::{from_reader, read_csv, LoadError};
pub use types::{Awakening, CycleAnnotation, Entry, Hypnogram, SleepClass, Stage};
