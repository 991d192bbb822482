// harmonia/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug harmonia run ... to see the details
    // Logs go to stderr, stdout stays for the progress lines
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            project_dir,
            fail_on_bias,
        } => commands::run::execute(project_dir, fail_on_bias).await?,
        Commands::Check { project_dir } => commands::check::execute(project_dir)?,
        Commands::Report { project_dir } => commands::report::execute(project_dir)?,
        Commands::Clean { project_dir } => commands::clean::execute(project_dir)?,
    }

    Ok(())
}
