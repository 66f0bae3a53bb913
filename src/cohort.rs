//! Cross-subject reductions
//!
//! Elementwise means of per-bin series and summary statistics of scalar
//! metrics, partitioned over typed subject identifiers. Every reduction needs
//! all subjects at once; an empty group is an error, never a silent zero.

use crate::error::AnalysisError;
use crate::types::{Sex, SubjectId};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Mean series for each sex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SexMeans {
    pub male: Vec<f64>,
    pub female: Vec<f64>,
}

/// Mean, standard error and size of one group of scalars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub n: usize,
    pub mean: f64,
    /// Standard error of the mean (sample std dev / sqrt(n)); `None` below two members
    pub sem: Option<f64>,
}

/// Scalar summary statistics for each sex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SexStats {
    pub male: GroupStats,
    pub female: GroupStats,
}

/// Mean series per cohort code, then per sex
pub type CohortBreakdown = BTreeMap<String, BTreeMap<Sex, Vec<f64>>>;

/// Elementwise mean of two groups split by a predicate
///
/// Subjects for which `predicate` holds form the first group, the rest form the
/// second. All series must have the same length.
pub fn mean_by_group<S, T, F>(
    values: &BTreeMap<SubjectId, S>,
    predicate: F,
) -> Result<(Vec<f64>, Vec<f64>), AnalysisError>
where
    S: AsRef<[T]>,
    T: Copy + Into<f64>,
    F: Fn(&SubjectId) -> bool,
{
    check_equal_lengths(values)?;

    let (group_a, group_b): (Vec<_>, Vec<_>) = values
        .iter()
        .map(|(id, series)| (id, series.as_ref()))
        .partition(|(id, _)| predicate(*id));

    Ok((
        elementwise_mean("group A", &group_a)?,
        elementwise_mean("group B", &group_b)?,
    ))
}

/// Elementwise mean of male and female subjects
pub fn mean_by_sex<S, T>(values: &BTreeMap<SubjectId, S>) -> Result<SexMeans, AnalysisError>
where
    S: AsRef<[T]>,
    T: Copy + Into<f64>,
{
    check_equal_lengths(values)?;

    let (male, female): (Vec<_>, Vec<_>) = values
        .iter()
        .map(|(id, series)| (id, series.as_ref()))
        .partition(|(id, _)| id.sex() == Sex::Male);

    Ok(SexMeans {
        male: elementwise_mean(Sex::Male.as_str(), &male)?,
        female: elementwise_mean(Sex::Female.as_str(), &female)?,
    })
}

/// Elementwise mean per (cohort, sex) cell
///
/// Only cells with at least one subject appear in the result.
pub fn mean_by_cohort_and_sex<S, T>(
    values: &BTreeMap<SubjectId, S>,
) -> Result<CohortBreakdown, AnalysisError>
where
    S: AsRef<[T]>,
    T: Copy + Into<f64>,
{
    check_equal_lengths(values)?;

    let mut cells: BTreeMap<(String, Sex), Vec<(&SubjectId, &[T])>> = BTreeMap::new();
    for (id, series) in values {
        cells
            .entry((id.cohort().to_string(), id.sex()))
            .or_default()
            .push((id, series.as_ref()));
    }

    let mut breakdown = CohortBreakdown::new();
    for ((cohort, sex), members) in cells {
        let label = format!("{}{}", sex.code(), cohort);
        let mean = elementwise_mean(&label, &members)?;
        breakdown.entry(cohort).or_default().insert(sex, mean);
    }
    Ok(breakdown)
}

/// Summary statistics of one group of scalars
pub fn group_stats(label: &str, values: &[f64]) -> Result<GroupStats, AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::EmptyGroup(label.to_string()));
    }

    let n = values.len();
    let mean = values.iter().mean();
    let sem = if n >= 2 {
        Some(values.iter().std_dev() / (n as f64).sqrt())
    } else {
        None
    };

    Ok(GroupStats { n, mean, sem })
}

/// Summary statistics of a scalar metric for each sex
pub fn stats_by_sex(values: &BTreeMap<SubjectId, f64>) -> Result<SexStats, AnalysisError> {
    let (male, female): (Vec<_>, Vec<_>) = values
        .iter()
        .partition(|(id, _)| id.sex() == Sex::Male);
    let male: Vec<f64> = male.into_iter().map(|(_, v)| *v).collect();
    let female: Vec<f64> = female.into_iter().map(|(_, v)| *v).collect();

    Ok(SexStats {
        male: group_stats(Sex::Male.as_str(), &male)?,
        female: group_stats(Sex::Female.as_str(), &female)?,
    })
}

fn check_equal_lengths<S, T>(values: &BTreeMap<SubjectId, S>) -> Result<(), AnalysisError>
where
    S: AsRef<[T]>,
{
    let mut iter = values.iter();
    let Some((_, first)) = iter.next() else {
        return Ok(());
    };
    let expected = first.as_ref().len();
    for (id, series) in iter {
        let actual = series.as_ref().len();
        if actual != expected {
            return Err(AnalysisError::LengthMismatch {
                subject: id.code(),
                expected,
                actual,
            });
        }
    }
    Ok(())
}

fn elementwise_mean<T>(label: &str, members: &[(&SubjectId, &[T])]) -> Result<Vec<f64>, AnalysisError>
where
    T: Copy + Into<f64>,
{
    let Some((_, first)) = members.first() else {
        return Err(AnalysisError::EmptyGroup(label.to_string()));
    };

    let mut sums = vec![0.0; first.len()];
    for (_, series) in members {
        for (sum, value) in sums.iter_mut().zip(series.iter()) {
            *sum += (*value).into();
        }
    }

    let n = members.len() as f64;
    Ok(sums.into_iter().map(|sum| sum / n).collect())
}
