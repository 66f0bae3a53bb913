//! Cohort report encoding
//!
//! Encodes collected subject metrics and cohort reductions into a JSON report
//! with producer and provenance metadata for downstream presentation layers.

use crate::binning::build_bins;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::pipeline::{CohortProcessor, CohortSummary, SubjectMetrics};
use crate::types::{BinEdges, SubjectId};
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// When the report was computed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportProvenance {
    pub computed_at_utc: String,
}

/// Quality flags raised while building a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// At least one roster subject had no record
    MissingSubjects,
    /// The final bin is shorter than the bin size
    ShortFinalBin,
    /// Cross-subject reductions were not computed
    NoSummary,
}

/// Report quality section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportQuality {
    pub subjects_analyzed: usize,
    pub subjects_skipped: usize,
    pub flags: Vec<QualityFlag>,
}

/// Complete analysis report for a cohort
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub quality: ReportQuality,
    pub config: AnalysisConfig,
    pub bin_ends_minutes: Vec<f64>,
    pub subjects: BTreeMap<SubjectId, SubjectMetrics>,
    pub skipped: Vec<SubjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<CohortSummary>,
}

/// Report encoder
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Build a report from a processor and an optional cohort summary
    ///
    /// Fails when the configured window and bin size cannot be binned.
    pub fn encode(
        &self,
        processor: &CohortProcessor,
        summary: Option<CohortSummary>,
    ) -> Result<CohortReport, AnalysisError> {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = ReportProvenance {
            computed_at_utc: Utc::now().to_rfc3339(),
        };

        let edges = build_bins(&processor.config().window, processor.config().bin())?;
        let quality = self.build_quality(processor, &edges, summary.is_some());

        Ok(CohortReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            provenance,
            quality,
            config: processor.config().clone(),
            bin_ends_minutes: edges.bin_ends_minutes(),
            subjects: processor.subjects().clone(),
            skipped: processor.skipped().to_vec(),
            summary,
        })
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        processor: &CohortProcessor,
        summary: Option<CohortSummary>,
    ) -> Result<String, AnalysisError> {
        let report = self.encode(processor, summary)?;
        serde_json::to_string_pretty(&report).map_err(AnalysisError::JsonError)
    }

    fn build_quality(
        &self,
        processor: &CohortProcessor,
        edges: &BinEdges,
        has_summary: bool,
    ) -> ReportQuality {
        let mut flags = Vec::new();

        if !processor.skipped().is_empty() {
            flags.push(QualityFlag::MissingSubjects);
        }

        let size = processor.config().bin().seconds();
        if let Some((start, end)) = edges.bins().last() {
            // Any final bin build_bins did not round to a full one is at
            // least 1e-9 of a bin short
            if end - start < size * (1.0 - 1e-9) {
                flags.push(QualityFlag::ShortFinalBin);
            }
        }

        if !has_summary {
            flags.push(QualityFlag::NoSummary);
        }

        ReportQuality {
            subjects_analyzed: processor.subject_count(),
            subjects_skipped: processor.skipped().len(),
            flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubjectRecord;

    fn processor(config: AnalysisConfig) -> CohortProcessor {
        let mut processor = CohortProcessor::new(config);
        processor
            .add_subject(
                "MB".parse().unwrap(),
                &SubjectRecord::new(vec![10.0, 160.0], vec![10.0]),
            )
            .unwrap();
        processor
            .add_subject("FB".parse().unwrap(), &SubjectRecord::new(vec![400.0], vec![]))
            .unwrap();
        processor
    }

    #[test]
    fn test_encode_report() {
        let processor = processor(AnalysisConfig::new(0.0, 600.0, 150.0).unwrap());
        let summary = processor.summarize().unwrap();
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(&processor, Some(summary)).unwrap();

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.bin_ends_minutes, vec![2.5, 5.0, 7.5, 10.0]);
        assert_eq!(report.subjects.len(), 2);
        assert_eq!(report.quality.subjects_analyzed, 2);
        assert!(report.quality.flags.is_empty());
    }

    #[test]
    fn test_encode_to_json() {
        let processor = processor(AnalysisConfig::new(0.0, 600.0, 150.0).unwrap());
        let json = ReportEncoder::new()
            .encode_to_json(&processor, processor.summarize().ok())
            .unwrap();

        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(payload["report_version"], "1.0.0");
        assert_eq!(payload["producer"]["name"], "openfield-flux");
        assert_eq!(
            payload["subjects"]["MB"]["total_crossings"]["values"],
            serde_json::json!([1, 1, 0, 0])
        );
        assert_eq!(
            payload["summary"]["thigmotaxis_by_sex"]["male"],
            serde_json::json!([1.0, 0.0, 0.0, 0.0])
        );
        assert_eq!(payload["config"]["window"]["start_seconds"], 0.0);
    }

    #[test]
    fn test_quality_flags() {
        let mut processor = processor(AnalysisConfig::new(0.0, 600.0, 250.0).unwrap());
        processor.add_loaded("MW".parse().unwrap(), None).unwrap();

        let report = ReportEncoder::new().encode(&processor, None).unwrap();
        assert_eq!(
            report.quality.flags,
            vec![
                QualityFlag::MissingSubjects,
                QualityFlag::ShortFinalBin,
                QualityFlag::NoSummary
            ]
        );
        assert_eq!(report.quality.subjects_skipped, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("summary").is_none());
        assert_eq!(json["quality"]["flags"][1], "short_final_bin");
    }
}
