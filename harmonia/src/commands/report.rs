// harmonia/src/commands/report.rs
//
// USE CASE: Show the results of the last run.

use std::path::PathBuf;

use anyhow::Context;
use comfy_table::{Table, presets::UTF8_FULL};
use harmonia_core::application::{RunSummary, StageStatus};
use harmonia_core::infrastructure::config::project::load_project_config;
use harmonia_core::ports::Artifact;

pub fn execute(project_dir: PathBuf) -> anyhow::Result<()> {
    let config = load_project_config(&project_dir)?;
    let path = project_dir
        .join(&config.target_path)
        .join(Artifact::RunResults.file_name());

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("No run results at {:?}. Have you run 'harmonia run'?", path))?;
    let summary: RunSummary = serde_json::from_str(&content)
        .with_context(|| format!("Corrupt run results at {:?}", path))?;

    println!(
        "📊 Run of {} at {} ({:.2}s)",
        summary.project,
        summary.finished_at.to_rfc3339(),
        summary.duration_secs()
    );
    print_summary(&summary);
    Ok(())
}

fn status_icon(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Ok => "✅",
        StageStatus::Failed => "❌",
        StageStatus::Skipped => "⏭️",
    }
}

pub fn print_summary(summary: &RunSummary) {
    let mut sources = Table::new();
    sources.load_preset(UTF8_FULL);
    sources.set_header(vec!["Source", "Status", "Rows", "Detail"]);
    for source in &summary.sources {
        let detail = match &source.error {
            Some(e) => e.clone(),
            None if !source.dropped_columns.is_empty() => {
                format!("dropped: {}", source.dropped_columns.join(", "))
            }
            None => String::new(),
        };
        sources.add_row(vec![
            source.id.clone(),
            status_icon(source.status).to_string(),
            source.rows.to_string(),
            detail,
        ]);
    }
    println!("\n{}", sources);
    println!(
        "   Accepted: {} | Rejected: {} | Conflicts: {}",
        summary.accepted_rows,
        summary.rejected_rows,
        summary.conflicts.len()
    );

    let checks: Vec<_> = summary.audits.iter().chain(&summary.representation).collect();
    if !checks.is_empty() {
        let mut audits = Table::new();
        audits.load_preset(UTF8_FULL);
        audits.set_header(vec!["Check", "Status", "Flagged", "Detail"]);
        for audit in checks {
            let flagged = match audit.flagged {
                Some(true) => "🚩 yes",
                Some(false) => "no",
                None => "-",
            };
            let detail = audit
                .summary
                .clone()
                .or_else(|| audit.error.clone())
                .unwrap_or_default();
            audits.add_row(vec![
                audit.audit.clone(),
                status_icon(audit.status).to_string(),
                flagged.to_string(),
                detail,
            ]);
        }
        println!("\n{}", audits);
    }

    if let Some(mitigation) = &summary.mitigation {
        let state = if mitigation.applied { "applied" } else { "not applied" };
        println!(
            "\n🛡️  Mitigation {} on '{}': {} ({} rows)",
            mitigation.strategy, mitigation.audit, state, mitigation.rows_out
        );
        if let Some(e) = &mitigation.error {
            println!("   {}", e);
        }
    }
}
