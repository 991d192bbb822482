// harmonia-core/src/application/mod.rs

pub mod clean;
pub mod pipeline;
pub mod summary;

// --- RE-EXPORTS (FACADE PATTERN) ---
// `use harmonia_core::application::{run_pipeline, clean_project, RunSummary};`

pub use clean::clean_project;
pub use pipeline::{BiasReports, run_pipeline};
pub use summary::{AuditOutcome, MitigationOutcome, RunSummary, SourceOutcome, StageStatus};
