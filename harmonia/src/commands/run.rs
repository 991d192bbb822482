// harmonia/src/commands/run.rs
//
// USE CASE: Run the harmonization + fairness pipeline.

use std::path::PathBuf;

use anyhow::Context;
use harmonia_core::application::run_pipeline;
use harmonia_core::infrastructure::adapters::{DuckDbSourceReader, JsonFileSink};
use harmonia_core::infrastructure::config::project::load_project_config;

use crate::commands::report::print_summary;

/// Exit code when `--fail-on-bias` is set and a check is flagged.
const EXIT_BIAS_FLAGGED: i32 = 2;

pub async fn execute(project_dir: PathBuf, fail_on_bias: bool) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    // A. Load the Config (Infra). Fatal before any data is read.
    println!("⚙️  Loading configuration...");
    let config = load_project_config(&project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })?;
    println!("   Project: {} (v{})", config.name, config.version);
    tracing::debug!(sources = config.sources.len(), target = %config.target_path, "Configuration loaded");

    // B. Adapters
    let reader = DuckDbSourceReader::in_memory().context("Failed to initialize DuckDB")?;
    let sink = JsonFileSink::new(project_dir.join(&config.target_path));

    // C. Run the Pipeline (Application Layer)
    let summary = match run_pipeline(&reader, &sink, &project_dir, &config).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("\n💥 CRITICAL PIPELINE ERROR: {}", e);
            std::process::exit(1);
        }
    };

    print_summary(&summary);

    if summary.all_sources_failed() {
        eprintln!("\n❌ FAILURE. Every source failed, nothing was harmonized.");
        std::process::exit(1);
    }
    if !summary.success {
        eprintln!("\n⚠️  Completed with isolated failures (see run_results.json)");
    } else {
        println!("\n✨ SUCCESS! Pipeline finished in {:.2?}", start.elapsed());
    }
    if fail_on_bias && summary.any_flagged() {
        eprintln!("\n🚩 Bias flagged and --fail-on-bias is set");
        std::process::exit(EXIT_BIAS_FLAGGED);
    }

    Ok(())
}
