//! Generate a cohort report for validation testing

use openfield_flux::adapter::parse_subject;
use openfield_flux::{analyze_cohort, AnalysisConfig, AnalysisError, SubjectId, SubjectRecord};

fn main() {
    let male = r#"{
        "crossing_times": [10.0, 160.0, 170.0, 400.0, 590.0],
        "periphery_times": [10.0, 170.0],
        "interval_behaviors": { "Freezing_start_stop": { "starts": [100.0], "ends": [250.0] } }
    }"#;
    let female = r#"{
        "crossing_times": [200.0, 460.0],
        "periphery_times": [200.0],
        "interval_behaviors": { "grooming_start_stop": { "starts": [300.0], "ends": [330.0] } }
    }"#;

    match build_report(&[("MB", male), ("FB", female)]) {
        Ok(report) => print!("{report}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}

fn build_report(subjects: &[(&str, &str)]) -> Result<String, AnalysisError> {
    let cohort = subjects
        .iter()
        .map(|(code, json)| Ok((code.parse::<SubjectId>()?, Some(parse_subject(json)?))))
        .collect::<Result<Vec<(SubjectId, Option<SubjectRecord>)>, AnalysisError>>()?;

    let config = AnalysisConfig::new(0.0, 600.0, 150.0)?;
    let report = analyze_cohort(cohort, &config)?;
    Ok(serde_json::to_string_pretty(&report)?)
}
