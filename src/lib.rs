//! OpenField Flux - Binning and aggregation engine for open-field behavioral data
//!
//! Flux reduces per-subject event streams from an open-field trial into
//! time-binned and whole-window metrics through a deterministic pipeline:
//! record loading → window binning → event / interval / ratio aggregation →
//! cross-subject reduction → report encoding.
//!
//! ## Modules
//!
//! - **Open-field pipeline**: crossings, periphery crossings, thigmotaxis and
//!   interval behaviors (freezing, grooming) binned over an analysis window
//! - **Rotarod**: chronological session numbering and learning curves by sex

pub mod adapter;
pub mod binning;
pub mod cohort;
pub mod config;
pub mod encoder;
pub mod error;
pub mod events;
pub mod intervals;
pub mod pipeline;
pub mod ratios;
pub mod rotarod;
pub mod types;

pub use config::AnalysisConfig;
pub use encoder::{CohortReport, ReportEncoder};
pub use error::AnalysisError;
pub use pipeline::{analyze_cohort, analyze_subject, CohortProcessor, CohortSummary, SubjectMetrics};
pub use types::{
    AnalysisWindow, BinEdges, BinSpec, BinnedSeries, IntervalSeries, Sex, SubjectId,
    SubjectRecord,
};

/// Crate version embedded in all reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "openfield-flux";
