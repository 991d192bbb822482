// harmonia-core/src/ports/sink.rs

use crate::error::HarmoniaError;

/// Audit artifacts produced by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    CanonicalTable,
    MitigatedTable,
    Rejected,
    BiasReports,
    RunResults,
}

impl Artifact {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::CanonicalTable => "canonical_table.json",
            Self::MitigatedTable => "mitigated_table.json",
            Self::Rejected => "rejected.json",
            Self::BiasReports => "bias_reports.json",
            Self::RunResults => "run_results.json",
        }
    }
}

/// Persistence for audit artifacts. Writes must be all-or-nothing per artifact.
pub trait AuditSink: Send + Sync {
    fn persist(&self, artifact: Artifact, payload: &serde_json::Value) -> Result<(), HarmoniaError>;

    /// Human-readable location, for terminal output.
    fn location(&self) -> String;
}
