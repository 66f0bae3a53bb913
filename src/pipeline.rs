//! Analysis pipeline orchestration
//!
//! Runs each subject record through the binning, event, interval and ratio
//! stages, collects the results keyed by subject, and reduces them across
//! subjects once every record is in.
//!
//! Pipeline: SubjectRecord → WindowBinner → {events | intervals | ratios} →
//! CohortProcessor → cohort reductions → ReportEncoder

use crate::binning::build_bins;
use crate::cohort::{
    mean_by_cohort_and_sex, mean_by_sex, stats_by_sex, CohortBreakdown, SexMeans, SexStats,
};
use crate::config::AnalysisConfig;
use crate::encoder::{CohortReport, ReportEncoder};
use crate::error::AnalysisError;
use crate::events::{accumulate, periphery_crossings, total_crossings};
use crate::intervals::bin_durations;
use crate::ratios::{thigmotaxis_index, window_periphery_center_ratio};
use crate::types::{BinnedSeries, SubjectId, SubjectRecord};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Every per-subject metric for one window/bin configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectMetrics {
    pub total_crossings: BinnedSeries<u32>,
    pub accumulated_crossings: BinnedSeries<u32>,
    pub periphery_crossings: BinnedSeries<u32>,
    pub accumulated_periphery_crossings: BinnedSeries<u32>,
    pub thigmotaxis_index: BinnedSeries<f64>,
    /// Summed duration per bin for each configured behavior
    pub behavior_durations: BTreeMap<String, BinnedSeries<f64>>,
    /// Whole-window periphery/center crossing ratio
    pub periphery_center_ratio: f64,
}

/// Cross-subject reductions of a cohort
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortSummary {
    pub subjects: usize,
    pub thigmotaxis_by_sex: SexMeans,
    pub total_crossings_by_sex: SexMeans,
    pub accumulated_crossings_by_sex: SexMeans,
    pub periphery_crossings_by_sex: SexMeans,
    pub behavior_durations_by_sex: BTreeMap<String, SexMeans>,
    pub periphery_center_ratio_by_sex: SexStats,
    pub thigmotaxis_by_cohort: CohortBreakdown,
    pub total_crossings_by_cohort: CohortBreakdown,
    pub behavior_durations_by_cohort: BTreeMap<String, CohortBreakdown>,
}

/// Analyze one subject record (stateless, one-shot)
pub fn analyze_subject(
    record: &SubjectRecord,
    config: &AnalysisConfig,
) -> Result<SubjectMetrics, AnalysisError> {
    let window = &config.window;
    let bin = config.bin();

    // Stage 1: instantaneous events
    let total = total_crossings(record, window, bin)?;
    let periphery = periphery_crossings(record, window, bin)?;
    let accumulated_total = accumulate(&total);
    let accumulated_periphery = accumulate(&periphery);

    // Stage 2: ratios
    let thigmotaxis = thigmotaxis_index(&total, &periphery)?;
    let ratio = window_periphery_center_ratio(record, window);

    // Stage 3: interval behaviors
    let behavior_durations: BTreeMap<String, BinnedSeries<f64>> = config
        .behaviors
        .iter()
        .map(|key| Ok((key.clone(), bin_durations(record, window, bin, key)?)))
        .collect::<Result<_, AnalysisError>>()?;

    Ok(SubjectMetrics {
        total_crossings: total,
        accumulated_crossings: accumulated_total,
        periphery_crossings: periphery,
        accumulated_periphery_crossings: accumulated_periphery,
        thigmotaxis_index: thigmotaxis,
        behavior_durations,
        periphery_center_ratio: ratio,
    })
}

/// Analyze a whole cohort and build its report (stateless, one-shot)
///
/// Absent records (`None`) are skipped and listed in the report.
pub fn analyze_cohort<I>(records: I, config: &AnalysisConfig) -> Result<CohortReport, AnalysisError>
where
    I: IntoIterator<Item = (SubjectId, Option<SubjectRecord>)>,
{
    let mut processor = CohortProcessor::new(config.clone());
    for (id, record) in records {
        processor.add_loaded(id, record.as_ref())?;
    }
    let summary = processor.summarize()?;
    ReportEncoder::new().encode(&processor, Some(summary))
}

/// Collects per-subject metrics before any cross-subject reduction
pub struct CohortProcessor {
    config: AnalysisConfig,
    subjects: BTreeMap<SubjectId, SubjectMetrics>,
    skipped: Vec<SubjectId>,
}

impl CohortProcessor {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            subjects: BTreeMap::new(),
            skipped: Vec::new(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a subject and store its metrics, replacing any earlier entry
    pub fn add_subject(
        &mut self,
        id: SubjectId,
        record: &SubjectRecord,
    ) -> Result<&SubjectMetrics, AnalysisError> {
        let metrics = analyze_subject(record, &self.config)?;
        tracing::debug!(
            subject = %id,
            crossings = metrics.accumulated_crossings.last().unwrap_or(0),
            ratio = metrics.periphery_center_ratio,
            "analyzed subject"
        );
        self.skipped.retain(|skipped| skipped != &id);
        match self.subjects.entry(id) {
            Entry::Occupied(mut entry) => {
                entry.insert(metrics);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(entry.insert(metrics)),
        }
    }

    /// Add a loader result, recording absent subjects as skipped
    ///
    /// The latest load of an id wins: an absent record drops metrics stored
    /// for it earlier.
    pub fn add_loaded(
        &mut self,
        id: SubjectId,
        record: Option<&SubjectRecord>,
    ) -> Result<(), AnalysisError> {
        match record {
            Some(record) => {
                self.add_subject(id, record)?;
            }
            None => {
                tracing::info!(subject = %id, "no record, skipping subject");
                if self.subjects.remove(&id).is_some() {
                    tracing::debug!(subject = %id, "dropped earlier metrics");
                }
                if !self.skipped.contains(&id) {
                    self.skipped.push(id);
                }
            }
        }
        Ok(())
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    pub fn metrics(&self, id: &SubjectId) -> Option<&SubjectMetrics> {
        self.subjects.get(id)
    }

    pub fn subjects(&self) -> &BTreeMap<SubjectId, SubjectMetrics> {
        &self.subjects
    }

    /// Subjects whose records were absent
    pub fn skipped(&self) -> &[SubjectId] {
        &self.skipped
    }

    /// Bin end labels (minutes) shared by every series of this configuration
    pub fn bin_ends_minutes(&self) -> Result<Vec<f64>, AnalysisError> {
        Ok(build_bins(&self.config.window, self.config.bin())?.bin_ends_minutes())
    }

    /// Reduce all collected subjects
    ///
    /// Fails with `EmptyGroup` unless both sexes have at least one subject.
    pub fn summarize(&self) -> Result<CohortSummary, AnalysisError> {
        let thigmotaxis = self.project(|m| m.thigmotaxis_index.values());
        let total = self.project(|m| m.total_crossings.values());
        let accumulated = self.project(|m| m.accumulated_crossings.values());
        let periphery = self.project(|m| m.periphery_crossings.values());
        let ratios: BTreeMap<SubjectId, f64> = self
            .subjects
            .iter()
            .map(|(id, m)| (id.clone(), m.periphery_center_ratio))
            .collect();

        let mut behavior_durations_by_sex = BTreeMap::new();
        let mut behavior_durations_by_cohort = BTreeMap::new();
        for key in &self.config.behaviors {
            let durations = self.project(|m| {
                m.behavior_durations
                    .get(key)
                    .map(BinnedSeries::values)
                    .unwrap_or(&[])
            });
            behavior_durations_by_sex.insert(key.clone(), mean_by_sex(&durations)?);
            behavior_durations_by_cohort.insert(key.clone(), mean_by_cohort_and_sex(&durations)?);
        }

        let summary = CohortSummary {
            subjects: self.subjects.len(),
            thigmotaxis_by_sex: mean_by_sex(&thigmotaxis)?,
            total_crossings_by_sex: mean_by_sex(&total)?,
            accumulated_crossings_by_sex: mean_by_sex(&accumulated)?,
            periphery_crossings_by_sex: mean_by_sex(&periphery)?,
            behavior_durations_by_sex,
            periphery_center_ratio_by_sex: stats_by_sex(&ratios)?,
            thigmotaxis_by_cohort: mean_by_cohort_and_sex(&thigmotaxis)?,
            total_crossings_by_cohort: mean_by_cohort_and_sex(&total)?,
            behavior_durations_by_cohort,
        };

        tracing::debug!(subjects = summary.subjects, "summarized cohort");
        Ok(summary)
    }

    /// Clear all collected subjects
    pub fn clear(&mut self) {
        self.subjects.clear();
        self.skipped.clear();
    }

    fn project<'a, T, F>(&'a self, f: F) -> BTreeMap<SubjectId, &'a [T]>
    where
        F: Fn(&'a SubjectMetrics) -> &'a [T],
    {
        self.subjects
            .iter()
            .map(|(id, metrics)| (id.clone(), f(metrics)))
            .collect()
    }
}
