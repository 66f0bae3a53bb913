//! Thigmotaxis and periphery/center ratios
//!
//! Degenerate counts are absorbed here so nothing downstream ever sees NaN or
//! an infinite value.

use crate::error::AnalysisError;
use crate::events::count_in_window;
use crate::types::{AnalysisWindow, BinnedSeries, SubjectRecord};

/// Per-bin proportion of crossings that are peripheral
///
/// A bin with zero total crossings yields `0.0`. Results are clamped to at
/// most `1.0`, which guards against periphery streams that overcount.
pub fn thigmotaxis_index(
    total: &BinnedSeries<u32>,
    periphery: &BinnedSeries<u32>,
) -> Result<BinnedSeries<f64>, AnalysisError> {
    if !total.shares_bins_with(periphery) {
        return Err(AnalysisError::BinMismatch {
            left: total.len(),
            right: periphery.len(),
        });
    }

    let mut periphery_counts = periphery.iter();
    Ok(total.map(|&total_count| {
        let periphery_count = periphery_counts.next().copied().unwrap_or(0);
        if total_count == 0 {
            0.0
        } else {
            (f64::from(periphery_count) / f64::from(total_count)).min(1.0)
        }
    }))
}

/// Whole-window ratio of periphery crossings to center crossings
///
/// Center crossings are `total - periphery` floored at `1`, so a window where
/// every crossing is peripheral returns the periphery count itself instead of
/// dividing by zero.
pub fn periphery_center_ratio(total_count: usize, periphery_count: usize) -> f64 {
    let center_count = total_count.saturating_sub(periphery_count).max(1);
    periphery_count as f64 / center_count as f64
}

/// Periphery/center ratio for both of a subject's streams inside a window
pub fn window_periphery_center_ratio(record: &SubjectRecord, window: &AnalysisWindow) -> f64 {
    let total = count_in_window(&record.crossing_times, window);
    let periphery = count_in_window(&record.periphery_times, window);
    periphery_center_ratio(total, periphery)
}
