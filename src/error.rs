//! Error types for openfield-flux

use thiserror::Error;

/// Errors that can occur during analysis
///
/// Degenerate numeric cases (empty bins, missing behaviors, all-peripheral
/// windows) are absorbed by the aggregators and never surface here.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid analysis window: end ({end}) must be after start ({start})")]
    InvalidWindow { start: f64, end: f64 },

    #[error("Invalid bin size: {0} (must be positive and finite)")]
    InvalidBinSize(f64),

    #[error("Cannot average an empty group: {0}")]
    EmptyGroup(String),

    #[error("Series length mismatch for {subject}: expected {expected}, got {actual}")]
    LengthMismatch {
        subject: String,
        expected: usize,
        actual: usize,
    },

    #[error("Binned series do not share bins: {left} vs {right}")]
    BinMismatch { left: usize, right: usize },

    #[error("Invalid subject identifier: {0}")]
    InvalidSubjectId(String),

    #[error("Interval starts and ends differ in length: {starts} starts, {ends} ends")]
    MismatchedIntervals { starts: usize, ends: usize },

    #[error("Interval {index} ends before it starts: ({start}, {end})")]
    InvalidInterval { index: usize, start: f64, end: f64 },

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
