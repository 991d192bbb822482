// harmonia/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "harmonia")]
#[command(about = "Survey harmonization and group-fairness screening", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Runs the pipeline (Read -> Map -> Harmonize -> Audit -> Mitigate)
    Run {
        /// Project directory
        #[arg(long, default_value = ".", env = "HARMONIA_PROJECT_DIR")]
        project_dir: PathBuf,

        /// Exit with code 2 when any audit or representation check is flagged
        #[arg(long)]
        fail_on_bias: bool,
    },

    /// 🔎 Loads and validates the configuration without reading data
    Check {
        #[arg(long, default_value = ".", env = "HARMONIA_PROJECT_DIR")]
        project_dir: PathBuf,
    },

    /// 📊 Prints the results of the last run
    Report {
        #[arg(long, default_value = ".", env = "HARMONIA_PROJECT_DIR")]
        project_dir: PathBuf,
    },

    /// 🧹 Cleans build artifacts (target/ folder)
    Clean {
        #[arg(long, default_value = ".", env = "HARMONIA_PROJECT_DIR")]
        project_dir: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use clap::Parser;

    #[test]
    fn test_cli_parse_run_defaults() -> Result<()> {
        let args = Cli::parse_from(["harmonia", "run"]);
        match args.command {
            Commands::Run {
                project_dir,
                fail_on_bias,
            } => {
                assert_eq!(project_dir.to_string_lossy(), ".");
                assert!(!fail_on_bias);
                Ok(())
            }
            _ => bail!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_fail_on_bias() -> Result<()> {
        let args = Cli::parse_from([
            "harmonia",
            "run",
            "--fail-on-bias",
            "--project-dir",
            "/tmp",
        ]);
        match args.command {
            Commands::Run {
                project_dir,
                fail_on_bias,
            } => {
                assert_eq!(project_dir.to_string_lossy(), "/tmp");
                assert!(fail_on_bias);
                Ok(())
            }
            _ => bail!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_check() -> Result<()> {
        let args = Cli::parse_from(["harmonia", "check", "--project-dir", "demo"]);
        match args.command {
            Commands::Check { project_dir } => {
                assert_eq!(project_dir.to_string_lossy(), "demo");
                Ok(())
            }
            _ => bail!("Expected Check command"),
        }
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["harmonia", "lineage"]).is_err());
    }
}
