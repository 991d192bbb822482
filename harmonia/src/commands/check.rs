// harmonia/src/commands/check.rs
//
// USE CASE: Validate the configuration without touching the data.

use std::path::PathBuf;

use anyhow::Context;
use comfy_table::{Table, presets::UTF8_FULL};
use harmonia_core::infrastructure::config::project::load_project_config;

pub fn execute(project_dir: PathBuf) -> anyhow::Result<()> {
    let config = load_project_config(&project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })?;
    println!("✅ Configuration is valid: {} (v{})", config.name, config.version);

    let mut sources = Table::new();
    sources.load_preset(UTF8_FULL);
    sources.set_header(vec!["Priority", "Source", "Path", "Mapped"]);
    for (i, source) in config.sources.iter().enumerate() {
        let mapped = if config.mappings.source(&source.id).is_some() {
            "yes"
        } else {
            "no (will fail)"
        };
        sources.add_row(vec![
            (i + 1).to_string(),
            source.id.clone(),
            source.path.clone(),
            mapped.to_string(),
        ]);
    }
    println!("\n🔌 Sources\n{}", sources);

    let mut fields = Table::new();
    fields.load_preset(UTF8_FULL);
    fields.set_header(vec!["Field", "Type", "Required", "Vocabulary"]);
    for field in &config.schema.fields {
        let required = if field.required || config.key_fields.contains(&field.name) {
            "yes"
        } else {
            ""
        };
        fields.add_row(vec![
            field.name.clone(),
            field.kind.to_string(),
            required.to_string(),
            field.vocabulary.join(", "),
        ]);
    }
    println!("\n📐 Canonical schema (key: {})\n{}", config.key_fields.join(", "), fields);

    if !config.fairness.audits.is_empty() {
        let mut audits = Table::new();
        audits.load_preset(UTF8_FULL);
        audits.set_header(vec!["Audit", "Outcome", "Privileged", "Unprivileged"]);
        for audit in &config.fairness.audits {
            audits.add_row(vec![
                audit.name.clone(),
                audit.outcome_field.clone(),
                audit.privileged.clone(),
                audit.unprivileged.clone(),
            ]);
        }
        println!("\n⚖️  Audits\n{}", audits);
    }

    Ok(())
}
