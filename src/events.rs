//! Instantaneous event aggregation
//!
//! Per-bin and cumulative counts for crossing events. The same functions serve
//! the all-crossings stream and the periphery-only stream.

use crate::binning::{bin_timestamps, build_bins};
use crate::error::AnalysisError;
use crate::types::{AnalysisWindow, BinSpec, BinnedSeries, SubjectRecord};

/// Count events per bin
///
/// Each event inside `[start, end)` lands in exactly one bin; an event on the
/// window end is excluded.
pub fn bin_counts(
    timestamps: &[f64],
    window: &AnalysisWindow,
    bin: BinSpec,
) -> Result<BinnedSeries<u32>, AnalysisError> {
    let edges = build_bins(window, bin)?;
    Ok(BinnedSeries::new(bin_timestamps(timestamps, window, &edges), &edges))
}

/// Running sum of a count series, left to right
pub fn accumulate(series: &BinnedSeries<u32>) -> BinnedSeries<u32> {
    let mut running = 0u32;
    series.map(|&count| {
        running = running.saturating_add(count);
        running
    })
}

/// Total line crossings per bin
pub fn total_crossings(
    record: &SubjectRecord,
    window: &AnalysisWindow,
    bin: BinSpec,
) -> Result<BinnedSeries<u32>, AnalysisError> {
    bin_counts(&record.crossing_times, window, bin)
}

/// Accumulated line crossings per bin
pub fn accumulated_crossings(
    record: &SubjectRecord,
    window: &AnalysisWindow,
    bin: BinSpec,
) -> Result<BinnedSeries<u32>, AnalysisError> {
    Ok(accumulate(&total_crossings(record, window, bin)?))
}

/// Periphery line crossings per bin
pub fn periphery_crossings(
    record: &SubjectRecord,
    window: &AnalysisWindow,
    bin: BinSpec,
) -> Result<BinnedSeries<u32>, AnalysisError> {
    bin_counts(&record.periphery_times, window, bin)
}

/// Accumulated periphery line crossings per bin
pub fn accumulated_periphery_crossings(
    record: &SubjectRecord,
    window: &AnalysisWindow,
    bin: BinSpec,
) -> Result<BinnedSeries<u32>, AnalysisError> {
    Ok(accumulate(&periphery_crossings(record, window, bin)?))
}

/// Number of events inside the window
pub fn count_in_window(timestamps: &[f64], window: &AnalysisWindow) -> usize {
    timestamps.iter().filter(|&&t| window.contains(t)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scenario() -> (SubjectRecord, AnalysisWindow, BinSpec) {
        let record = SubjectRecord::new(
            vec![10.0, 160.0, 170.0, 400.0, 590.0],
            vec![10.0, 170.0],
        );
        (
            record,
            AnalysisWindow::new(0.0, 600.0).unwrap(),
            BinSpec::new(150.0).unwrap(),
        )
    }

    #[test]
    fn test_total_crossings() {
        let (record, window, bin) = scenario();
        let counts = total_crossings(&record, &window, bin).unwrap();
        assert_eq!(counts.values(), &[1, 2, 1, 1]);
        assert_eq!(counts.bin_ends_minutes(), &[2.5, 5.0, 7.5, 10.0]);
    }

    #[test]
    fn test_accumulated_crossings() {
        let (record, window, bin) = scenario();
        let accumulated = accumulated_crossings(&record, &window, bin).unwrap();
        assert_eq!(accumulated.values(), &[1, 3, 4, 5]);
        assert_eq!(accumulated.last(), Some(5));
    }

    #[test]
    fn test_periphery_crossings() {
        let (record, window, bin) = scenario();
        assert_eq!(
            periphery_crossings(&record, &window, bin).unwrap().values(),
            &[1, 1, 0, 0]
        );
        assert_eq!(
            accumulated_periphery_crossings(&record, &window, bin).unwrap().values(),
            &[1, 2, 2, 2]
        );
    }

    #[test]
    fn test_offset_window_rebases_timestamps() {
        let (record, _, bin) = scenario();
        let window = AnalysisWindow::new(3.0, 603.0).unwrap();
        // 10 -> 7, 160 -> 157, 170 -> 167, 400 -> 397, 590 -> 587
        assert_eq!(total_crossings(&record, &window, bin).unwrap().values(), &[1, 2, 1, 1]);
    }

    #[test]
    fn test_empty_stream_yields_zero_series() {
        let (_, window, bin) = scenario();
        let counts = bin_counts(&[], &window, bin).unwrap();
        assert_eq!(counts.values(), &[0, 0, 0, 0]);
        assert_eq!(accumulate(&counts).values(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_count_in_window() {
        let (record, _, _) = scenario();
        let window = AnalysisWindow::new(100.0, 400.0).unwrap();
        assert_eq!(count_in_window(&record.crossing_times, &window), 2);
    }
}
