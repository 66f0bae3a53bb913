//! End-to-end scenarios: records on disk → loader → pipeline → report

use openfield_flux::adapter::{load_roster, subject_file_name};
use openfield_flux::config::{FREEZING_KEY, GROOMING_KEY};
use openfield_flux::rotarod::{analyze_rotarod, load_trials};
use openfield_flux::{analyze_cohort, AnalysisConfig, AnalysisError, SubjectId};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

fn id(code: &str) -> SubjectId {
    code.parse().unwrap()
}

fn write_subject(dir: &Path, code: &str, json: serde_json::Value) {
    fs::write(dir.join(subject_file_name(&id(code))), json.to_string()).unwrap();
}

fn seed_cohort(dir: &Path) {
    write_subject(
        dir,
        "MB",
        serde_json::json!({
            "subject_id": "MB",
            "crossing_times": [10.0, 160.0, 170.0, 400.0, 590.0],
            "periphery_times": [10.0, 170.0],
            "interval_behaviors": {
                "Freezing_start_stop": { "starts": [100.0], "ends": [250.0] }
            }
        }),
    );
    write_subject(
        dir,
        "MR",
        serde_json::json!({
            "crossing_times": [20.0, 30.0, 620.0],
            "periphery_times": [20.0, 30.0],
            "interval_behaviors": {
                "grooming_start_stop": { "starts": [590.0], "ends": [640.0] }
            }
        }),
    );
    write_subject(
        dir,
        "FB",
        serde_json::json!({
            "crossing_times": [200.0, 460.0],
            "periphery_times": [200.0]
        }),
    );
}

fn config(roster: &[&str]) -> AnalysisConfig {
    AnalysisConfig::new(0.0, 600.0, 150.0)
        .unwrap()
        .with_roster(roster.iter().map(|code| id(code)).collect())
}

#[test]
fn test_cohort_report_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    seed_cohort(dir.path());

    let config = config(&["FB", "FG", "MB", "MR"]);
    let loaded = load_roster(dir.path(), &config.roster).unwrap();
    let report = analyze_cohort(loaded, &config).unwrap();

    assert_eq!(report.bin_ends_minutes, vec![2.5, 5.0, 7.5, 10.0]);
    assert_eq!(report.skipped, vec![id("FG")]);
    assert_eq!(report.subjects.len(), 3);

    let mb = &report.subjects[&id("MB")];
    assert_eq!(mb.total_crossings.values(), &[1, 2, 1, 1]);
    assert_eq!(mb.accumulated_crossings.values(), &[1, 3, 4, 5]);
    assert_eq!(mb.periphery_crossings.values(), &[1, 1, 0, 0]);
    assert_eq!(mb.thigmotaxis_index.values(), &[1.0, 0.5, 0.0, 0.0]);
    assert_eq!(mb.behavior_durations[FREEZING_KEY].values(), &[50.0, 100.0, 0.0, 0.0]);
    assert!((mb.periphery_center_ratio - 2.0 / 3.0).abs() < 1e-12);

    // Crossing at 620 s falls outside the window; grooming is clipped at 600 s
    let mr = &report.subjects[&id("MR")];
    assert_eq!(mr.accumulated_crossings.last(), Some(2));
    assert_eq!(mr.behavior_durations[GROOMING_KEY].values(), &[0.0, 0.0, 0.0, 10.0]);
    // All-peripheral window: center count floors at 1
    assert_eq!(mr.periphery_center_ratio, 2.0);

    let summary = report.summary.as_ref().unwrap();
    assert_eq!(summary.subjects, 3);
    assert_eq!(summary.total_crossings_by_sex.male, vec![1.5, 1.0, 0.5, 0.5]);
    assert_eq!(summary.total_crossings_by_sex.female, vec![0.0, 1.0, 0.0, 1.0]);
    assert_eq!(summary.thigmotaxis_by_sex.male, vec![1.0, 0.25, 0.0, 0.0]);
    assert_eq!(summary.periphery_center_ratio_by_sex.female.n, 1);
    assert_eq!(summary.periphery_center_ratio_by_sex.female.mean, 1.0);
}

#[test]
fn test_missing_behavior_is_zero_filled() {
    let dir = tempfile::tempdir().unwrap();
    seed_cohort(dir.path());

    let config = config(&["FB", "MB"]);
    let report = analyze_cohort(load_roster(dir.path(), &config.roster).unwrap(), &config).unwrap();

    let fb = &report.subjects[&id("FB")];
    assert_eq!(fb.behavior_durations[FREEZING_KEY].values(), &[0.0; 4]);
    assert_eq!(fb.behavior_durations[GROOMING_KEY].values(), &[0.0; 4]);
}

#[test]
fn test_single_sex_cohort_cannot_be_summarized() {
    let dir = tempfile::tempdir().unwrap();
    seed_cohort(dir.path());

    let config = config(&["MB", "MR"]);
    let loaded = load_roster(dir.path(), &config.roster).unwrap();
    let err = analyze_cohort(loaded, &config).unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyGroup(ref group) if group == "female"));
}

#[test]
fn test_non_dividing_bins_share_labels() {
    let dir = tempfile::tempdir().unwrap();
    seed_cohort(dir.path());

    let config = AnalysisConfig::new(0.0, 600.0, 250.0)
        .unwrap()
        .with_roster(vec![id("MB"), id("FB")]);
    let report = analyze_cohort(load_roster(dir.path(), &config.roster).unwrap(), &config).unwrap();

    assert_eq!(report.bin_ends_minutes, vec![250.0 / 60.0, 500.0 / 60.0, 10.0]);
    let mb = &report.subjects[&id("MB")];
    assert_eq!(mb.total_crossings.values(), &[3, 1, 1]);
    assert_eq!(mb.behavior_durations[FREEZING_KEY].values(), &[150.0, 0.0, 0.0]);
    assert_eq!(
        mb.behavior_durations[FREEZING_KEY].bin_ends_minutes(),
        mb.total_crossings.bin_ends_minutes()
    );
}

#[test]
fn test_default_window_offsets_interval_bins() {
    let dir = tempfile::tempdir().unwrap();
    seed_cohort(dir.path());

    // Window [3, 603): bins are [3,153), [153,303), [303,453), [453,603)
    let config = AnalysisConfig::default().with_roster(vec![id("MB"), id("FB")]);
    let report = analyze_cohort(load_roster(dir.path(), &config.roster).unwrap(), &config).unwrap();

    let mb = &report.subjects[&id("MB")];
    assert_eq!(mb.total_crossings.values(), &[1, 2, 1, 1]);
    assert_eq!(mb.behavior_durations[FREEZING_KEY].values(), &[53.0, 97.0, 0.0, 0.0]);
}

#[test]
fn test_report_serializes_subject_keys_as_codes() {
    let dir = tempfile::tempdir().unwrap();
    seed_cohort(dir.path());

    let config = config(&["FB", "MB"]);
    let report = analyze_cohort(load_roster(dir.path(), &config.roster).unwrap(), &config).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert!(json["subjects"]["MB"].is_object());
    assert_eq!(json["config"]["roster"], serde_json::json!(["FB", "MB"]));
    assert_eq!(
        json["summary"]["thigmotaxis_by_cohort"]["B"]["male"],
        serde_json::json!([1.0, 0.5, 0.0, 0.0])
    );
}

#[test]
fn test_rotarod_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rotarod.json");
    fs::write(
        &path,
        serde_json::json!([
            { "subject": "FB", "recorded_at": "2025-07-13T09:00:00", "latency_to_fall_sec": 80.0 },
            { "subject": "FB", "recorded_at": "2025-07-12T09:00:00", "latency_to_fall_sec": 40.0 },
            { "subject": "MB", "recorded_at": "2025-07-12T09:10:00", "latency_to_fall_sec": 50.0 }
        ])
        .to_string(),
    )
    .unwrap();

    let report = analyze_rotarod(load_trials(&path).unwrap()).unwrap();
    assert_eq!(report.curves_by_subject[&id("FB")], vec![40.0, 80.0]);
    assert_eq!(report.curves_by_sex.len(), 2);
    assert!(report.curves_by_sex[1].male.is_none());
}
