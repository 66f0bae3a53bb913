//! Window binning
//!
//! Derives bin edges from an analysis window and a bin size, and converts raw
//! timestamps into per-bin counts. Binning always happens in window-relative
//! seconds: timestamps are filtered to `[start, end)` and rebased to `t - start`
//! before they are histogrammed.

use crate::error::AnalysisError;
use crate::types::{AnalysisWindow, BinEdges, BinSpec};

/// Tolerance on the fractional bin count when deciding whether the bin size
/// divides the window
const DIVISIBILITY_TOLERANCE: f64 = 1e-9;

/// Largest number of bins a window may be split into
pub const MAX_BINS: usize = 100_000;

/// Build bin edges for a window
///
/// Edges start at `0` and step by the bin size. When the bin size does not
/// divide the window duration the final bin is shorter: its right edge is
/// truncated to the duration.
///
/// Fails with `InvalidBinSize` when the window would need more than
/// [`MAX_BINS`] bins.
pub fn build_bins(window: &AnalysisWindow, bin: BinSpec) -> Result<BinEdges, AnalysisError> {
    let duration = window.duration();
    let size = bin.seconds();

    let ratio = duration / size;
    if !ratio.is_finite() || ratio > MAX_BINS as f64 {
        return Err(AnalysisError::InvalidBinSize(size));
    }

    let rounded = ratio.round();
    let num_bins = if (ratio - rounded).abs() <= DIVISIBILITY_TOLERANCE {
        rounded as usize
    } else {
        ratio.ceil() as usize
    }
    .max(1);

    // i * size rather than a running sum keeps edges free of accumulated error
    let mut edges: Vec<f64> = (0..num_bins).map(|i| i as f64 * size).collect();
    edges.push(duration);

    Ok(BinEdges::from_edges(edges))
}

/// Validate raw bounds and build bin edges in one step
pub fn bins_for(start: f64, end: f64, bin_size: f64) -> Result<BinEdges, AnalysisError> {
    let window = AnalysisWindow::new(start, end)?;
    let bin = BinSpec::new(bin_size)?;
    build_bins(&window, bin)
}

/// Keep timestamps inside `[start, end)` and rebase them to the window start
pub fn filter_and_shift(timestamps: &[f64], window: &AnalysisWindow) -> Vec<f64> {
    timestamps
        .iter()
        .copied()
        .filter(|&t| window.contains(t))
        .map(|t| t - window.start())
        .collect()
}

/// Count window-relative values per bin
///
/// Bins are half-open `[e[i], e[i+1])` except the last, which also takes a
/// value sitting exactly on the final edge. Values outside the edges (and NaN)
/// are dropped.
pub fn histogram(values: &[f64], edges: &BinEdges) -> Vec<u32> {
    let edge_values = edges.edges();
    let num_bins = edges.num_bins();
    let first = edge_values[0];
    let last = edge_values[num_bins];

    let mut counts = vec![0u32; num_bins];
    for &value in values {
        if value.is_nan() || value < first || value > last {
            continue;
        }
        let index = edge_values
            .partition_point(|&edge| edge <= value)
            .saturating_sub(1)
            .min(num_bins - 1);
        counts[index] += 1;
    }
    counts
}

/// Filter, rebase and histogram raw timestamps against the window's bins
pub fn bin_timestamps(timestamps: &[f64], window: &AnalysisWindow, edges: &BinEdges) -> Vec<u32> {
    histogram(&filter_and_shift(timestamps, window), edges)
}
