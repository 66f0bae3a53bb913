//! Core types for the openfield-flux engine
//!
//! This module defines the data that flows through each stage of an analysis:
//! the per-subject event record, the analysis window and bin specification,
//! the derived bin edges, and the binned series every aggregator produces.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Half-open analysis window `[start, end)` in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow", into = "RawWindow")]
pub struct AnalysisWindow {
    start: f64,
    end: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawWindow {
    start_seconds: f64,
    end_seconds: f64,
}

impl AnalysisWindow {
    /// Create a window, rejecting `end <= start` and non-finite bounds
    pub fn new(start: f64, end: f64) -> Result<Self, AnalysisError> {
        if !start.is_finite() || !end.is_finite() || end <= start {
            return Err(AnalysisError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a window from bounds already known to be ordered and finite
    pub(crate) const fn from_trusted(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Window length in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Check if a timestamp falls within this window
    pub fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

impl TryFrom<RawWindow> for AnalysisWindow {
    type Error = AnalysisError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.start_seconds, raw.end_seconds)
    }
}

impl From<AnalysisWindow> for RawWindow {
    fn from(window: AnalysisWindow) -> Self {
        Self {
            start_seconds: window.start,
            end_seconds: window.end,
        }
    }
}

/// Fixed bin width in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct BinSpec(f64);

impl BinSpec {
    /// Create a bin specification, rejecting zero, negative and non-finite sizes
    pub fn new(bin_size_seconds: f64) -> Result<Self, AnalysisError> {
        if !bin_size_seconds.is_finite() || bin_size_seconds <= 0.0 {
            return Err(AnalysisError::InvalidBinSize(bin_size_seconds));
        }
        Ok(Self(bin_size_seconds))
    }

    pub(crate) const fn from_trusted(bin_size_seconds: f64) -> Self {
        Self(bin_size_seconds)
    }

    pub fn seconds(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for BinSpec {
    type Error = AnalysisError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BinSpec> for f64 {
    fn from(spec: BinSpec) -> Self {
        spec.0
    }
}

/// Bin edges in window-relative seconds
///
/// Always holds at least two edges; the first is `0.0` and the last equals the
/// window duration. Built by [`crate::binning::build_bins`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinEdges {
    edges: Vec<f64>,
}

impl BinEdges {
    pub(crate) fn from_edges(edges: Vec<f64>) -> Self {
        debug_assert!(edges.len() >= 2);
        Self { edges }
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn num_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Iterate over `(bin_start, bin_end)` pairs
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.edges.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// Bin end times in minutes, relative to the window start
    pub fn bin_ends_minutes(&self) -> Vec<f64> {
        self.edges[1..].iter().map(|edge| edge / 60.0).collect()
    }
}

/// One value per bin, paired with the bin end labels (minutes)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinnedSeries<T> {
    values: Vec<T>,
    bin_ends_minutes: Vec<f64>,
}

impl<T> BinnedSeries<T> {
    pub(crate) fn new(values: Vec<T>, edges: &BinEdges) -> Self {
        debug_assert_eq!(values.len(), edges.num_bins());
        Self {
            values,
            bin_ends_minutes: edges.bin_ends_minutes(),
        }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn bin_ends_minutes(&self) -> &[f64] {
        &self.bin_ends_minutes
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    /// Check that both series were binned over the same edges
    pub fn shares_bins_with<U>(&self, other: &BinnedSeries<U>) -> bool {
        self.bin_ends_minutes == other.bin_ends_minutes
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    /// Build a series over the same bins from transformed values
    pub(crate) fn map<U, F>(&self, f: F) -> BinnedSeries<U>
    where
        F: FnMut(&T) -> U,
    {
        BinnedSeries {
            values: self.values.iter().map(f).collect(),
            bin_ends_minutes: self.bin_ends_minutes.clone(),
        }
    }
}

impl<T: Copy> BinnedSeries<T> {
    pub fn last(&self) -> Option<T> {
        self.values.last().copied()
    }
}

impl<T> AsRef<[T]> for BinnedSeries<T> {
    fn as_ref(&self) -> &[T] {
        &self.values
    }
}

/// Start/stop pairs for one interval behavior (freezing, grooming, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawIntervals")]
pub struct IntervalSeries {
    starts: Vec<f64>,
    ends: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawIntervals {
    #[serde(default)]
    starts: Vec<f64>,
    #[serde(default)]
    ends: Vec<f64>,
}

impl IntervalSeries {
    /// Create an interval series from parallel start/end sequences
    pub fn new(starts: Vec<f64>, ends: Vec<f64>) -> Result<Self, AnalysisError> {
        if starts.len() != ends.len() {
            return Err(AnalysisError::MismatchedIntervals {
                starts: starts.len(),
                ends: ends.len(),
            });
        }
        for (index, (&start, &end)) in starts.iter().zip(&ends).enumerate() {
            if start.is_nan() || end.is_nan() || end < start {
                return Err(AnalysisError::InvalidInterval { index, start, end });
            }
        }
        Ok(Self { starts, ends })
    }

    /// Create an interval series from `(start, end)` pairs
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, AnalysisError> {
        let (starts, ends) = pairs.iter().copied().unzip();
        Self::new(starts, ends)
    }

    pub fn starts(&self) -> &[f64] {
        &self.starts
    }

    pub fn ends(&self) -> &[f64] {
        &self.ends
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.starts.iter().copied().zip(self.ends.iter().copied())
    }
}

impl TryFrom<RawIntervals> for IntervalSeries {
    type Error = AnalysisError;

    fn try_from(raw: RawIntervals) -> Result<Self, Self::Error> {
        Self::new(raw.starts, raw.ends)
    }
}

/// Raw open-field events for one subject
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    /// Every line-crossing timestamp (seconds, unordered)
    #[serde(default)]
    pub crossing_times: Vec<f64>,
    /// Crossings classified as peripheral (seconds, independent stream)
    #[serde(default)]
    pub periphery_times: Vec<f64>,
    /// Interval behaviors keyed by name; an absent key means "never occurred"
    #[serde(default)]
    pub interval_behaviors: BTreeMap<String, IntervalSeries>,
}

impl SubjectRecord {
    pub fn new(crossing_times: Vec<f64>, periphery_times: Vec<f64>) -> Self {
        Self {
            crossing_times,
            periphery_times,
            interval_behaviors: BTreeMap::new(),
        }
    }

    /// Attach an interval behavior
    pub fn with_behavior(mut self, key: impl Into<String>, intervals: IntervalSeries) -> Self {
        self.interval_behaviors.insert(key.into(), intervals);
        self
    }

    pub fn behavior(&self, key: &str) -> Option<&IntervalSeries> {
        self.interval_behaviors.get(key)
    }
}

/// Subject sex, encoded as the first character of a subject code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'F' => Some(Sex::Female),
            'M' => Some(Sex::Male),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Sex::Female => 'F',
            Sex::Male => 'M',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Female => "female",
            Sex::Male => "male",
        }
    }
}

/// Structured subject identifier (`MB` = male, cohort `B`)
///
/// Ordering matches the lexical order of the short code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId {
    sex: Sex,
    cohort: String,
}

impl SubjectId {
    pub fn new(sex: Sex, cohort: impl Into<String>) -> Result<Self, AnalysisError> {
        let cohort = cohort.into();
        if cohort.is_empty() || !cohort.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AnalysisError::InvalidSubjectId(format!(
                "{}{}",
                sex.code(),
                cohort
            )));
        }
        Ok(Self { sex, cohort })
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn cohort(&self) -> &str {
        &self.cohort
    }

    pub fn code(&self) -> String {
        self.to_string()
    }
}

impl FromStr for SubjectId {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let sex = chars
            .next()
            .and_then(Sex::from_code)
            .ok_or_else(|| AnalysisError::InvalidSubjectId(trimmed.to_string()))?;
        Self::new(sex, chars.as_str())
            .map_err(|_| AnalysisError::InvalidSubjectId(trimmed.to_string()))
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sex.code(), self.cohort)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = AnalysisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SubjectId> for String {
    fn from(id: SubjectId) -> Self {
        id.to_string()
    }
}
