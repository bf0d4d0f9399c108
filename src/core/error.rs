//! Errors raised by the cycle detection pipeline.

/// Errors produced while preparing, analysing or resampling a hypnogram.
///
/// Empty input is never an error: every stage maps an empty sequence to an
/// empty result.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A threshold was zero, negative or not finite.
    InvalidConfig(String),
    /// A stage label outside W/N1/N2/N3/R.
    UnrecognizedStage(String),
    /// The per-entry epoch counts do not add up to the recording length.
    InconsistentDuration { expected: u64, actual: u64 },
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::InvalidConfig(e) => write!(f, "Invalid config: {e}"),
            AnalysisError::UnrecognizedStage(label) => {
                write!(f, "Unrecognized sleep stage label: {label:?}")
            }
            AnalysisError::InconsistentDuration { expected, actual } => write!(
                f,
                "Inconsistent durations: entries span {actual} epochs but the recording ends at epoch {expected}"
            ),
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Check that a named threshold (in minutes) is a positive, finite number.
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<(), AnalysisError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidConfig(format!(
            "{name} must be a positive number of minutes, got {value}"
        )))
    }
}
