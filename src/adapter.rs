//! Subject record loader
//!
//! Parses per-subject JSON records and loads a roster of them from a data
//! directory. A missing file is an explicit absence (`None`), never a partial
//! record; callers skip absent subjects.

use crate::error::AnalysisError;
use crate::types::{SubjectId, SubjectRecord};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name suffix for open-field subject records
const SUBJECT_FILE_SUFFIX: &str = "_OpenField_rawdata.json";

/// Parse a subject record JSON string
pub fn parse_subject(json: &str) -> Result<SubjectRecord, AnalysisError> {
    serde_json::from_str(json)
        .map_err(|e| AnalysisError::ParseError(format!("Failed to parse subject record: {e}")))
}

/// File name holding a subject's record, e.g. `MB_OpenField_rawdata.json`
pub fn subject_file_name(id: &SubjectId) -> String {
    format!("{id}{SUBJECT_FILE_SUFFIX}")
}

/// Path of a subject's record inside a data directory
pub fn subject_path(data_dir: &Path, id: &SubjectId) -> PathBuf {
    data_dir.join(subject_file_name(id))
}

/// Load one subject's record; `Ok(None)` when the file does not exist
pub fn load_subject(data_dir: &Path, id: &SubjectId) -> Result<Option<SubjectRecord>, AnalysisError> {
    let path = subject_path(data_dir, id);
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let record = parse_subject(&content).map_err(|e| {
                AnalysisError::ParseError(format!("{}: {e}", path.display()))
            })?;
            tracing::debug!(
                subject = %id,
                crossings = record.crossing_times.len(),
                periphery = record.periphery_times.len(),
                behaviors = record.interval_behaviors.len(),
                "loaded subject record"
            );
            Ok(Some(record))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(subject = %id, path = %path.display(), "subject file not found, skipping");
            Ok(None)
        }
        Err(e) => Err(AnalysisError::Io(e)),
    }
}

/// Load every subject in a roster, preserving roster order
pub fn load_roster(
    data_dir: &Path,
    roster: &[SubjectId],
) -> Result<Vec<(SubjectId, Option<SubjectRecord>)>, AnalysisError> {
    roster
        .iter()
        .map(|id| Ok((id.clone(), load_subject(data_dir, id)?)))
        .collect()
}
