//! Rotarod learning curves
//!
//! Trials are numbered into sessions chronologically per subject, then the
//! latency to fall is summarized per session and sex.

use crate::cohort::{group_stats, GroupStats};
use crate::error::AnalysisError;
use crate::types::{Sex, SubjectId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One rotarod trial as recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotarodTrial {
    pub subject: SubjectId,
    /// Local wall-clock time of the trial
    pub recorded_at: NaiveDateTime,
    pub latency_to_fall_sec: f64,
}

/// A trial with its session number (1-based, chronological per subject)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotarodSession {
    pub subject: SubjectId,
    pub session: u32,
    pub recorded_at: NaiveDateTime,
    pub latency_to_fall_sec: f64,
}

/// Latency statistics of one session for each sex
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session: u32,
    /// `None` when no male subject ran this session
    pub male: Option<GroupStats>,
    /// `None` when no female subject ran this session
    pub female: Option<GroupStats>,
}

/// Complete rotarod analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotarodReport {
    pub trials: usize,
    pub male_subjects: usize,
    pub female_subjects: usize,
    pub curves_by_subject: BTreeMap<SubjectId, Vec<f64>>,
    pub curves_by_sex: Vec<SessionSummary>,
}

/// Parse a JSON array of trials
///
/// Latencies must be finite and non-negative.
pub fn parse_trials(json: &str) -> Result<Vec<RotarodTrial>, AnalysisError> {
    let trials: Vec<RotarodTrial> = serde_json::from_str(json)
        .map_err(|e| AnalysisError::ParseError(format!("Failed to parse rotarod trials: {e}")))?;

    for (index, trial) in trials.iter().enumerate() {
        let latency = trial.latency_to_fall_sec;
        if !latency.is_finite() || latency < 0.0 {
            return Err(AnalysisError::ParseError(format!(
                "trial {index} ({}): invalid latency {latency}",
                trial.subject
            )));
        }
    }
    Ok(trials)
}

/// Load trials from a JSON file
pub fn load_trials(path: &Path) -> Result<Vec<RotarodTrial>, AnalysisError> {
    let content = std::fs::read_to_string(path)?;
    parse_trials(&content)
        .map_err(|e| AnalysisError::ParseError(format!("{}: {e}", path.display())))
}

/// Order trials by subject then time and number each subject's sessions from 1
pub fn assign_sessions(mut trials: Vec<RotarodTrial>) -> Vec<RotarodSession> {
    trials.sort_by(|a, b| {
        a.subject
            .cmp(&b.subject)
            .then_with(|| a.recorded_at.cmp(&b.recorded_at))
    });

    let mut next_session: BTreeMap<SubjectId, u32> = BTreeMap::new();
    trials
        .into_iter()
        .map(|trial| {
            let counter = next_session.entry(trial.subject.clone()).or_insert(0);
            *counter += 1;
            RotarodSession {
                subject: trial.subject,
                session: *counter,
                recorded_at: trial.recorded_at,
                latency_to_fall_sec: trial.latency_to_fall_sec,
            }
        })
        .collect()
}

/// Latency per session for each subject, in session order
pub fn learning_curves_by_subject(sessions: &[RotarodSession]) -> BTreeMap<SubjectId, Vec<f64>> {
    let mut ordered: Vec<&RotarodSession> = sessions.iter().collect();
    ordered.sort_by_key(|s| s.session);

    let mut curves: BTreeMap<SubjectId, Vec<f64>> = BTreeMap::new();
    for session in ordered {
        curves
            .entry(session.subject.clone())
            .or_default()
            .push(session.latency_to_fall_sec);
    }
    curves
}

/// Per-session latency statistics for each sex, in session order
pub fn learning_curves_by_sex(
    sessions: &[RotarodSession],
) -> Result<Vec<SessionSummary>, AnalysisError> {
    let mut by_session: BTreeMap<u32, BTreeMap<Sex, Vec<f64>>> = BTreeMap::new();
    for session in sessions {
        by_session
            .entry(session.session)
            .or_default()
            .entry(session.subject.sex())
            .or_default()
            .push(session.latency_to_fall_sec);
    }

    by_session
        .into_iter()
        .map(|(session, groups)| {
            Ok(SessionSummary {
                session,
                male: stats_if_present(Sex::Male, &groups)?,
                female: stats_if_present(Sex::Female, &groups)?,
            })
        })
        .collect()
}

/// Number sessions and summarize a set of trials
pub fn analyze_rotarod(trials: Vec<RotarodTrial>) -> Result<RotarodReport, AnalysisError> {
    let count = trials.len();
    let sessions = assign_sessions(trials);
    let curves_by_subject = learning_curves_by_subject(&sessions);
    let curves_by_sex = learning_curves_by_sex(&sessions)?;

    let male_subjects = curves_by_subject
        .keys()
        .filter(|id| id.sex() == Sex::Male)
        .count();

    tracing::debug!(
        trials = count,
        subjects = curves_by_subject.len(),
        sessions = curves_by_sex.len(),
        "analyzed rotarod trials"
    );

    Ok(RotarodReport {
        trials: count,
        male_subjects,
        female_subjects: curves_by_subject.len() - male_subjects,
        curves_by_subject,
        curves_by_sex,
    })
}

fn stats_if_present(
    sex: Sex,
    groups: &BTreeMap<Sex, Vec<f64>>,
) -> Result<Option<GroupStats>, AnalysisError> {
    match groups.get(&sex) {
        Some(values) if !values.is_empty() => group_stats(sex.as_str(), values).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TRIALS: &str = r#"[
        {"subject": "MB", "recorded_at": "2025-07-14T10:00:00", "latency_to_fall_sec": 60.0},
        {"subject": "MB", "recorded_at": "2025-07-12T10:00:00", "latency_to_fall_sec": 20.0},
        {"subject": "FB", "recorded_at": "2025-07-12T11:00:00", "latency_to_fall_sec": 30.0},
        {"subject": "MW", "recorded_at": "2025-07-12T09:30:00", "latency_to_fall_sec": 40.0},
        {"subject": "MB", "recorded_at": "2025-07-13T10:00:00", "latency_to_fall_sec": 45.0}
    ]"#;

    fn sessions() -> Vec<RotarodSession> {
        assign_sessions(parse_trials(TRIALS).unwrap())
    }

    #[test]
    fn test_sessions_numbered_chronologically() {
        let numbered: Vec<(String, u32, f64)> = sessions()
            .into_iter()
            .map(|s| (s.subject.code(), s.session, s.latency_to_fall_sec))
            .collect();

        assert_eq!(
            numbered,
            vec![
                ("FB".to_string(), 1, 30.0),
                ("MB".to_string(), 1, 20.0),
                ("MB".to_string(), 2, 45.0),
                ("MB".to_string(), 3, 60.0),
                ("MW".to_string(), 1, 40.0),
            ]
        );
    }

    #[test]
    fn test_learning_curves_by_subject() {
        let curves = learning_curves_by_subject(&sessions());
        let mb: SubjectId = "MB".parse().unwrap();
        assert_eq!(curves[&mb], vec![20.0, 45.0, 60.0]);
        assert_eq!(curves.len(), 3);
    }

    #[test]
    fn test_learning_curves_by_sex() {
        let curves = learning_curves_by_sex(&sessions()).unwrap();
        assert_eq!(curves.len(), 3);

        let first = &curves[0];
        assert_eq!(first.session, 1);
        let male = first.male.as_ref().unwrap();
        assert_eq!(male.n, 2);
        assert!((male.mean - 30.0).abs() < 1e-12);
        assert!(male.sem.is_some());
        assert_eq!(first.female.as_ref().unwrap().n, 1);
        assert_eq!(first.female.as_ref().unwrap().sem, None);

        // Only MB ran sessions 2 and 3
        assert!(curves[1].female.is_none());
        assert_eq!(curves[2].male.as_ref().unwrap().mean, 60.0);
    }

    #[test]
    fn test_analyze_rotarod() {
        let report = analyze_rotarod(parse_trials(TRIALS).unwrap()).unwrap();
        assert_eq!(report.trials, 5);
        assert_eq!(report.male_subjects, 2);
        assert_eq!(report.female_subjects, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["curves_by_subject"]["FB"], serde_json::json!([30.0]));
        assert!(json["curves_by_sex"][1]["female"].is_null());
    }

    #[test]
    fn test_parse_trials_rejects_bad_input() {
        let negative = r#"[{"subject": "MB", "recorded_at": "2025-07-12T10:00:00", "latency_to_fall_sec": -1.0}]"#;
        assert!(matches!(parse_trials(negative), Err(AnalysisError::ParseError(_))));

        let bad_subject = r#"[{"subject": "XB", "recorded_at": "2025-07-12T10:00:00", "latency_to_fall_sec": 1.0}]"#;
        assert!(parse_trials(bad_subject).is_err());

        let bad_time = r#"[{"subject": "MB", "recorded_at": "yesterday", "latency_to_fall_sec": 1.0}]"#;
        assert!(parse_trials(bad_time).is_err());
    }

    #[test]
    fn test_empty_trials() {
        let report = analyze_rotarod(Vec::new()).unwrap();
        assert_eq!(report.trials, 0);
        assert!(report.curves_by_sex.is_empty());
    }
}
