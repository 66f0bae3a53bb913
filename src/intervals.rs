//! Interval behavior aggregation
//!
//! Per-bin summed duration for behaviors recorded as start/stop pairs
//! (freezing, grooming). Each interval contributes its overlap with each bin,
//! so intervals spanning several bins are split between them and intervals
//! outside the window contribute nothing. Intervals are never pre-filtered.

use crate::binning::build_bins;
use crate::error::AnalysisError;
use crate::types::{AnalysisWindow, BinEdges, BinSpec, BinnedSeries, IntervalSeries, SubjectRecord};

/// Summed behavior duration (seconds) per bin
///
/// A missing behavior key or an empty interval list means the behavior never
/// occurred and yields a zero-filled series of the expected length.
pub fn bin_durations(
    record: &SubjectRecord,
    window: &AnalysisWindow,
    bin: BinSpec,
    behavior_key: &str,
) -> Result<BinnedSeries<f64>, AnalysisError> {
    let edges = build_bins(window, bin)?;
    let durations = match record.behavior(behavior_key) {
        Some(intervals) if !intervals.is_empty() => overlap_durations(intervals, window, &edges),
        _ => {
            tracing::trace!(behavior = behavior_key, "no intervals recorded, zero-filling");
            vec![0.0; edges.num_bins()]
        }
    };
    Ok(BinnedSeries::new(durations, &edges))
}

/// Overlap of every interval with every bin, bins shifted to absolute time
fn overlap_durations(
    intervals: &IntervalSeries,
    window: &AnalysisWindow,
    edges: &BinEdges,
) -> Vec<f64> {
    edges
        .bins()
        .map(|(lo, hi)| {
            let bin_start = window.start() + lo;
            let bin_end = window.start() + hi;
            intervals
                .iter()
                .map(|(start, end)| overlap(start, end, bin_start, bin_end))
                .sum()
        })
        .collect()
}

/// Length of the overlap between `[start, end)` and `[bin_start, bin_end)`
pub fn overlap(start: f64, end: f64, bin_start: f64, bin_end: f64) -> f64 {
    (end.min(bin_end) - start.max(bin_start)).max(0.0)
}

/// Total behavior time across all bins
pub fn total_duration(series: &BinnedSeries<f64>) -> f64 {
    series.iter().sum()
}
