// harmonia-core/src/infrastructure/config/project.rs

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::dataset::CanonicalSchema;
use crate::domain::harmonization::SchemaMap;
use crate::domain::project::{FairnessConfig, ProjectConfig};
use crate::error::HarmoniaError;
use crate::infrastructure::error::InfrastructureError;

const MAIN_CONFIG_CANDIDATES: [&str; 2] = ["harmonia.yaml", "harmonia_project.yaml"];

/// Loads, layers and checks the project configuration.
///
/// Order: main file, satellite files of the first `config-paths` entry,
/// environment overrides, then shape validation and cross-reference checks.
/// Any failure here is fatal: no data is read with a broken configuration.
#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, HarmoniaError> {
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading project manifest");

    let mut config: ProjectConfig = load_fragment(&config_path)?;

    if let Some(config_folder) = config.config_paths.first() {
        let config_dir = project_dir.join(config_folder);
        if config_dir.exists() {
            load_satellite_configs(&mut config, &config_dir)?;
        }
    }

    apply_env_overrides(&mut config)?;

    config.validate().map_err(InfrastructureError::Validation)?;
    config.check_consistency()?;

    Ok(config)
}

pub fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in MAIN_CONFIG_CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "{} (checked: {})",
        root.display(),
        MAIN_CONFIG_CANDIDATES.join(", ")
    )))
}

/// Typed configuration fragment from a YAML file.
fn load_fragment<T: DeserializeOwned>(path: &Path) -> Result<T, InfrastructureError> {
    let content = fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|e| {
        InfrastructureError::ConfigError(format!("{}: {}", path.display(), e))
    })
}

fn load_satellite_configs(
    config: &mut ProjectConfig,
    config_dir: &Path,
) -> Result<(), InfrastructureError> {
    let schema_path = config_dir.join("schema.yml");
    if schema_path.exists() {
        // A corrupt satellite stops everything
        config.schema = load_fragment::<CanonicalSchema>(&schema_path)?;
        info!(fields = config.schema.fields.len(), "  📐 Canonical schema loaded");
    }

    let mappings_path = config_dir.join("mappings.yml");
    if mappings_path.exists() {
        config.mappings = load_fragment::<SchemaMap>(&mappings_path)?;
        info!(sources = config.mappings.sources.len(), "  🔀 Source mappings loaded");
    }

    let fairness_path = config_dir.join("fairness.yml");
    if fairness_path.exists() {
        config.fairness = load_fragment::<FairnessConfig>(&fairness_path)?;
        info!(audits = config.fairness.audits.len(), "  ⚖️  Fairness audits loaded");
    }

    Ok(())
}

fn apply_env_overrides(config: &mut ProjectConfig) -> Result<(), InfrastructureError> {
    apply_overrides(
        config,
        std::env::var("HARMONIA_TARGET_PATH").ok(),
        std::env::var("HARMONIA_RESAMPLE_SEED").ok(),
    )
}

fn apply_overrides(
    config: &mut ProjectConfig,
    target_path: Option<String>,
    resample_seed: Option<String>,
) -> Result<(), InfrastructureError> {
    if let Some(val) = target_path {
        info!(old = ?config.target_path, new = ?val, "Overriding target path via ENV");
        config.target_path = val;
    }
    if let Some(val) = resample_seed {
        let seed: u64 = val.trim().parse().map_err(|_| {
            InfrastructureError::ConfigError(format!(
                "HARMONIA_RESAMPLE_SEED must be an unsigned integer, got '{}'",
                val
            ))
        })?;
        if let Some(mitigation) = config.fairness.mitigation.as_mut() {
            info!(old = ?mitigation.seed, new = seed, "Overriding resample seed via ENV");
            mitigation.seed = Some(seed);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::project::StrategyKind;
    use anyhow::Result;
    use tempfile::tempdir;

    const MAIN: &str = r#"
name: survey
version: "1.0"
config-paths: [config]
key_fields: [household_id]
sources:
  - { id: census, path: data/census.csv }
"#;

    const SCHEMA: &str = r#"
fields:
  - { name: household_id, type: text, required: true }
  - { name: gender, type: categorical, vocabulary: [female, male] }
  - { name: credit_access, type: boolean }
"#;

    const FAIRNESS: &str = r#"
groups:
  - { name: men, attribute: gender, matching_values: [male], role: privileged }
  - { name: women, attribute: gender, matching_values: [female], role: unprivileged }
audits:
  - { name: gender_credit, outcome_field: credit_access, privileged: men, unprivileged: women }
thresholds:
  disparate_impact: { min: 0.8, max: 1.25 }
mitigation: { audit: gender_credit, strategy: resample, seed: 1 }
"#;

    fn project(files: &[(&str, &str)]) -> Result<tempfile::TempDir> {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("config"))?;
        for (name, content) in files {
            fs::write(dir.path().join(name), content)?;
        }
        Ok(dir)
    }

    #[test]
    fn test_satellites_are_layered_over_main_file() -> Result<()> {
        let dir = project(&[
            ("harmonia.yaml", MAIN),
            ("config/schema.yml", SCHEMA),
            ("config/mappings.yml", "sources:\n  census: {}\n"),
            ("config/fairness.yml", FAIRNESS),
        ])?;
        let config = load_project_config(dir.path())?;

        assert_eq!(config.schema.fields.len(), 3);
        assert!(config.mappings.source("census").is_some());
        assert_eq!(config.fairness.audits.len(), 1);
        Ok(())
    }

    #[test]
    fn test_missing_project_file() -> Result<()> {
        let dir = tempdir()?;
        let err = load_project_config(dir.path()).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(
            err,
            HarmoniaError::Infrastructure(InfrastructureError::ConfigNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_corrupt_satellite_is_fatal() -> Result<()> {
        let dir = project(&[
            ("harmonia.yaml", MAIN),
            ("config/schema.yml", SCHEMA),
            ("config/fairness.yml", "audits: [ {name: broken"),
        ])?;
        let err = load_project_config(dir.path()).unwrap_err();
        assert!(err.is_configuration());
        Ok(())
    }

    #[test]
    fn test_inconsistent_config_is_rejected() -> Result<()> {
        let dir = project(&[
            ("harmonia.yaml", MAIN),
            ("config/schema.yml", SCHEMA),
            ("config/fairness.yml", &FAIRNESS.replace("outcome_field: credit_access", "outcome_field: approved")),
        ])?;
        let err = load_project_config(dir.path()).unwrap_err();
        assert!(err.is_configuration());
        Ok(())
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let mut config: ProjectConfig = serde_yaml::from_str(MAIN)?;
        config.fairness = serde_yaml::from_str(FAIRNESS)?;

        apply_overrides(&mut config, Some("/tmp/out".into()), Some("99".into()))?;
        assert_eq!(config.target_path, "/tmp/out");
        let mitigation = config.fairness.mitigation.as_ref().unwrap();
        assert_eq!(mitigation.strategy, StrategyKind::Resample);
        assert_eq!(mitigation.seed, Some(99));

        assert!(apply_overrides(&mut config, None, Some("abc".into())).is_err());
        Ok(())
    }
}
