// harmonia-core/src/application/pipeline.rs

use chrono::Utc;
use futures::StreamExt;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::summary::{
    AuditOutcome, MitigationOutcome, Rejection, RunSummary, SourceOutcome, StageStatus,
};
use crate::domain::dataset::{CanonicalRecordBatch, CanonicalTable};
use crate::domain::fairness::{
    BiasAuditor, BiasReport, GroupLabeler, Mitigator, RepresentationReport, check_representation,
};
use crate::domain::harmonization::{Harmonizer, SchemaMapper};
use crate::domain::project::ProjectConfig;
use crate::error::HarmoniaError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::sink::{Artifact, AuditSink};
use crate::ports::source::SourceReader;

const MAX_CONCURRENT_SOURCES: usize = 8;

/// Payload of `bias_reports.json`.
#[derive(Debug, Serialize)]
pub struct BiasReports<'a> {
    pub audits: &'a [BiasReport],
    pub representation: &'a [RepresentationReport],
}

/// Read -> map -> harmonize -> label -> audit -> mitigate -> persist.
///
/// Per-source failures (unreadable file, unmapped value, type mismatch) are
/// isolated: the source is reported and left out, the others continue.
/// Configuration is assumed checked by the loader.
pub async fn run_pipeline(
    reader: &dyn SourceReader,
    sink: &dyn AuditSink,
    project_dir: &Path,
    config: &ProjectConfig,
) -> Result<RunSummary, HarmoniaError> {
    println!("🚀 Starting harmonization pipeline ({})...", config.name);
    let mut summary = RunSummary::new(&config.name, Utc::now());

    // 1. READ + MAP (parallel per source, joined in source order)
    println!(
        "🔌 Reading {} sources with {}...",
        config.sources.len(),
        reader.engine_name()
    );
    let batches = map_sources(reader, project_dir, config, &mut summary).await;

    if batches.is_empty() {
        eprintln!("   ❌ No source could be mapped, stopping before harmonization");
        summary.finish();
        persist(sink, Artifact::RunResults, &summary)?;
        return Ok(summary);
    }

    // 2. HARMONIZE (sequential barrier)
    println!("🧬 Harmonizing {} batches...", batches.len());
    let harmonized = Harmonizer::new(&config.schema, &config.key_fields)?.harmonize(&batches);
    summary.accepted_rows = harmonized.table.len();
    summary.rejected_rows = harmonized.rejected.len();
    summary.rejections = harmonized
        .rejected
        .iter()
        .map(|r| Rejection {
            key: r.key.clone(),
            reason: r.reason.clone(),
        })
        .collect();
    summary.conflicts = harmonized.conflicts.clone();
    println!(
        "   ✅ {} records accepted, {} rejected, {} conflicts",
        summary.accepted_rows,
        summary.rejected_rows,
        summary.conflicts.len()
    );

    // 3. LABEL + AUDIT
    let fairness = &config.fairness;
    let labelled = GroupLabeler::new(&fairness.groups).label(&harmonized.table)?;

    let mut reports: Vec<BiasReport> = Vec::new();
    if !fairness.audits.is_empty() {
        println!("⚖️  Running {} bias audits...", fairness.audits.len());
    }
    for spec in &fairness.audits {
        let result = spec
            .resolve_groups(&fairness.groups)
            .and_then(|groups| BiasAuditor::audit(&labelled, spec, &groups, &fairness.thresholds));
        match result {
            Ok(report) => {
                let marker = if report.flagged { "🚩" } else { "✅" };
                println!("   {} {}", marker, report.summary());
                summary.audits.push(AuditOutcome {
                    audit: spec.name.clone(),
                    status: StageStatus::Ok,
                    flagged: Some(report.flagged),
                    summary: Some(report.summary()),
                    error: None,
                });
                reports.push(report);
            }
            Err(e) => {
                warn!(audit = %spec.name, error = %e, "Audit failed");
                eprintln!("   ❌ Audit '{}': {}", spec.name, e);
                summary.audits.push(AuditOutcome {
                    audit: spec.name.clone(),
                    status: StageStatus::Failed,
                    flagged: None,
                    summary: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let mut representation: Vec<RepresentationReport> = Vec::new();
    for check in &fairness.representation {
        match check_representation(&labelled, check) {
            Ok(report) => {
                summary.representation.push(AuditOutcome {
                    audit: format!("representation:{}", check.attribute),
                    status: StageStatus::Ok,
                    flagged: Some(report.flagged),
                    summary: Some(report.summary()),
                    error: None,
                });
                representation.push(report);
            }
            Err(e) => {
                warn!(attribute = %check.attribute, error = %e, "Representation check failed");
                summary.representation.push(AuditOutcome {
                    audit: format!("representation:{}", check.attribute),
                    status: StageStatus::Failed,
                    flagged: None,
                    summary: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    // 4. MITIGATE
    if let Some(mitigation) = &fairness.mitigation {
        let (outcome, table) = mitigate(&labelled, &reports, mitigation)?;
        if let Some(table) = table {
            persist(sink, Artifact::MitigatedTable, &table)?;
        }
        summary.mitigation = Some(outcome);
    }

    // 5. PERSIST
    persist(sink, Artifact::CanonicalTable, &labelled)?;
    persist(sink, Artifact::Rejected, &harmonized.rejected)?;
    persist(
        sink,
        Artifact::BiasReports,
        &BiasReports {
            audits: &reports,
            representation: &representation,
        },
    )?;

    summary.finish();
    persist(sink, Artifact::RunResults, &summary)?;

    println!(
        "✨ Done in {:.2}s. Artifacts written to {}",
        summary.duration_secs(),
        sink.location()
    );
    info!(success = summary.success, "Pipeline finished");

    Ok(summary)
}

async fn map_sources(
    reader: &dyn SourceReader,
    project_dir: &Path,
    config: &ProjectConfig,
    summary: &mut RunSummary,
) -> Vec<CanonicalRecordBatch> {
    let schema = Arc::new(config.schema.clone());
    let mappings = Arc::new(config.mappings.clone());

    let tasks = config.sources.iter().map(|source| {
        let schema = schema.clone();
        let mappings = mappings.clone();
        async move {
            let raw = reader.read(source, project_dir).await?;
            let rows = raw.len();
            let batch = tokio::task::spawn_blocking(move || {
                SchemaMapper::new(&schema, &mappings).map(&raw)
            })
            .await
            .map_err(|e| HarmoniaError::InternalError(format!("Mapping task panicked: {}", e)))??;
            Ok::<_, HarmoniaError>((rows, batch))
        }
    });

    // `buffered` keeps source order, which is the harmonization precedence
    let results: Vec<_> = futures::stream::iter(tasks)
        .buffered(MAX_CONCURRENT_SOURCES)
        .collect()
        .await;

    let mut batches = Vec::new();
    for (source, result) in config.sources.iter().zip(results) {
        match result {
            Ok((rows, batch)) => {
                println!("   ✅ Mapped source: {} ({} rows)", source.id, rows);
                summary.sources.push(SourceOutcome {
                    id: source.id.clone(),
                    status: StageStatus::Ok,
                    rows,
                    dropped_columns: batch.dropped_columns.clone(),
                    error: None,
                });
                batches.push(batch);
            }
            Err(e) => {
                warn!(source = %source.id, error = %e, "Source failed");
                eprintln!("   ❌ Source '{}' failed: {}", source.id, e);
                summary.sources.push(SourceOutcome {
                    id: source.id.clone(),
                    status: StageStatus::Failed,
                    rows: 0,
                    dropped_columns: Vec::new(),
                    error: Some(e.to_string()),
                });
            }
        }
    }
    batches
}

fn mitigate(
    labelled: &CanonicalTable,
    reports: &[BiasReport],
    mitigation: &crate::domain::project::MitigationConfig,
) -> Result<(MitigationOutcome, Option<CanonicalTable>), HarmoniaError> {
    let strategy = mitigation.to_strategy()?;
    let mut outcome = MitigationOutcome {
        audit: mitigation.audit.clone(),
        strategy: strategy.to_string(),
        status: StageStatus::Skipped,
        applied: false,
        rows_out: labelled.len(),
        error: None,
    };

    let Some(report) = reports.iter().find(|r| r.audit == mitigation.audit) else {
        outcome.error = Some(format!("No report for audit '{}'", mitigation.audit));
        return Ok((outcome, None));
    };
    if !report.flagged {
        println!("🛡️  Audit '{}' within bands, no mitigation needed", report.audit);
        return Ok((outcome, None));
    }

    println!("🛡️  Mitigating '{}' with {}...", report.audit, strategy);
    match Mitigator::mitigate(labelled, report, strategy) {
        Ok(table) => {
            outcome.status = StageStatus::Ok;
            outcome.applied = true;
            outcome.rows_out = table.len();
            Ok((outcome, Some(table)))
        }
        Err(e) => {
            eprintln!("   ❌ Mitigation failed: {}", e);
            outcome.status = StageStatus::Failed;
            outcome.error = Some(e.to_string());
            Ok((outcome, None))
        }
    }
}

fn persist<T: Serialize + ?Sized>(
    sink: &dyn AuditSink,
    artifact: Artifact,
    data: &T,
) -> Result<(), HarmoniaError> {
    let payload = serde_json::to_value(data).map_err(InfrastructureError::Json)?;
    sink.persist(artifact, &payload)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::dataset::{RawDataset, Value};
    use crate::domain::project::SourceConfig;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryReader(HashMap<String, RawDataset>);

    #[async_trait]
    impl SourceReader for MemoryReader {
        async fn read(
            &self,
            source: &SourceConfig,
            _project_dir: &Path,
        ) -> Result<RawDataset, HarmoniaError> {
            self.0
                .get(&source.id)
                .cloned()
                .ok_or_else(|| InfrastructureError::SourceNotFound(source.path.clone()).into())
        }

        fn engine_name(&self) -> &str {
            "memory"
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<(Artifact, serde_json::Value)>>);

    impl RecordingSink {
        fn get(&self, artifact: Artifact) -> Option<serde_json::Value> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .find(|(a, _)| *a == artifact)
                .map(|(_, v)| v.clone())
        }
    }

    impl AuditSink for RecordingSink {
        fn persist(
            &self,
            artifact: Artifact,
            payload: &serde_json::Value,
        ) -> Result<(), HarmoniaError> {
            self.0.lock().unwrap().push((artifact, payload.clone()));
            Ok(())
        }

        fn location(&self) -> String {
            "memory".into()
        }
    }

    const PROJECT: &str = r#"
name: demo
version: "1.0"
key_fields: [id]
sources:
  - { id: registry, path: registry.csv }
  - { id: survey, path: survey.csv }
  - { id: broken, path: broken.csv }
schema:
  fields:
    - { name: id, type: text, required: true }
    - { name: gender, type: categorical, vocabulary: [female, male] }
    - { name: approved, type: boolean }
mappings:
  sources:
    registry: {}
    survey:
      column_rename: { sex: gender, loan: approved }
      value_rules: { gender: { F: female, M: male } }
    broken:
      column_rename: { sex: gender }
fairness:
  groups:
    - { name: men, attribute: gender, matching_values: [male], role: privileged }
    - { name: women, attribute: gender, matching_values: [female], role: unprivileged }
  audits:
    - { name: gender_approval, outcome_field: approved, privileged: men, unprivileged: women }
  thresholds:
    disparate_impact: { min: 0.8, max: 1.25 }
  mitigation: { audit: gender_approval, strategy: reweight }
"#;

    fn reader() -> MemoryReader {
        let registry = RawDataset::from_columns(
            "registry",
            &["id", "gender"],
            vec![
                vec!["1".into(), "male".into()],
                vec!["2".into(), "male".into()],
                vec!["3".into(), "female".into()],
                vec!["4".into(), "female".into()],
            ],
        );
        let survey = RawDataset::from_columns(
            "survey",
            &["id", "sex", "loan"],
            vec![
                vec!["1".into(), "M".into(), Value::Bool(true)],
                vec!["2".into(), "M".into(), Value::Bool(true)],
                vec!["3".into(), "F".into(), Value::Bool(true)],
                vec!["4".into(), "F".into(), Value::Bool(false)],
                vec![Value::Null, "F".into(), Value::Bool(false)],
            ],
        );
        // "X" has no value rule and is not in the vocabulary
        let broken = RawDataset::from_columns(
            "broken",
            &["id", "sex"],
            vec![vec!["9".into(), "X".into()]],
        );
        MemoryReader(HashMap::from([
            ("registry".to_string(), registry),
            ("survey".to_string(), survey),
            ("broken".to_string(), broken),
        ]))
    }

    #[tokio::test]
    async fn test_pipeline_isolates_failed_sources_and_audits() -> Result<()> {
        let config: ProjectConfig = serde_yaml::from_str(PROJECT)?;
        config.check_consistency()?;
        let sink = RecordingSink::default();

        let summary = run_pipeline(&reader(), &sink, Path::new("."), &config).await?;

        let statuses: Vec<_> = summary.sources.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![StageStatus::Ok, StageStatus::Ok, StageStatus::Failed]
        );
        assert!(summary.sources[2].error.as_ref().unwrap().contains("'X'"));
        assert!(!summary.success);
        assert!(!summary.all_sources_failed());

        assert_eq!(summary.accepted_rows, 4);
        assert_eq!(summary.rejected_rows, 1);
        assert!(summary.conflicts.is_empty());

        // men 2/2, women 1/2 -> DI 0.5
        assert_eq!(summary.audits.len(), 1);
        assert_eq!(summary.audits[0].flagged, Some(true));
        let mitigation = summary.mitigation.as_ref().unwrap();
        assert!(mitigation.applied);
        assert_eq!(mitigation.rows_out, 4);

        let reports = sink.get(Artifact::BiasReports).unwrap();
        assert_eq!(reports["audits"][0]["metrics"]["disparate_impact"]["value"], 0.5);
        let mitigated = sink.get(Artifact::MitigatedTable).unwrap();
        assert_eq!(mitigated["weighting"]["column"], "sample_weight");
        assert!(sink.get(Artifact::RunResults).is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_pipeline_stops_when_every_source_fails() -> Result<()> {
        let config: ProjectConfig = serde_yaml::from_str(PROJECT)?;
        let sink = RecordingSink::default();
        let empty = MemoryReader(HashMap::new());

        let summary = run_pipeline(&empty, &sink, Path::new("."), &config).await?;

        assert!(summary.all_sources_failed());
        assert!(!summary.success);
        assert!(summary.audits.is_empty());
        assert!(sink.get(Artifact::CanonicalTable).is_none());
        assert!(sink.get(Artifact::RunResults).is_some());
        Ok(())
    }
}
