// harmonia-core/src/application/summary.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::dataset::FieldConflict;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Ok,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub id: String,
    pub status: StageStatus,
    pub rows: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditOutcome {
    pub audit: String,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
    /// One-line metric summary of the report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationOutcome {
    pub audit: String,
    pub strategy: String,
    pub status: StageStatus,
    /// `false` when the audit was not flagged.
    pub applied: bool,
    pub rows_out: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a run did, persisted as `run_results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub project: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub sources: Vec<SourceOutcome>,
    pub accepted_rows: usize,
    pub rejected_rows: usize,
    #[serde(default)]
    pub rejections: Vec<Rejection>,
    #[serde(default)]
    pub conflicts: Vec<FieldConflict>,
    #[serde(default)]
    pub audits: Vec<AuditOutcome>,
    #[serde(default)]
    pub representation: Vec<AuditOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<MitigationOutcome>,
}

impl RunSummary {
    pub fn new(project: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            project: project.to_string(),
            started_at,
            finished_at: started_at,
            success: false,
            sources: Vec::new(),
            accepted_rows: 0,
            rejected_rows: 0,
            rejections: Vec::new(),
            conflicts: Vec::new(),
            audits: Vec::new(),
            representation: Vec::new(),
            mitigation: None,
        }
    }

    pub fn all_sources_failed(&self) -> bool {
        !self.sources.is_empty() && self.sources.iter().all(|s| s.status == StageStatus::Failed)
    }

    pub fn any_flagged(&self) -> bool {
        self.audits
            .iter()
            .chain(&self.representation)
            .any(|a| a.flagged == Some(true))
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Closes the run: stamps the end time and derives `success`.
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
        let stage_failed = |status: StageStatus| status == StageStatus::Failed;
        self.success = !self.sources.iter().any(|s| stage_failed(s.status))
            && !self.audits.iter().chain(&self.representation).any(|a| stage_failed(a.status))
            && !self.mitigation.as_ref().is_some_and(|m| stage_failed(m.status));
    }
}
