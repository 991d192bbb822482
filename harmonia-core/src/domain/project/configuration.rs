// harmonia-core/src/domain/project/configuration.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use validator::Validate;

use crate::domain::dataset::CanonicalSchema;
use crate::domain::error::DomainError;
use crate::domain::fairness::{
    AuditSpec, GroupDefinition, MitigationStrategy, RepresentationSpec, Thresholds,
    check_definitions,
};
use crate::domain::harmonization::{Harmonizer, SchemaMap};

/// File format of a raw source.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Parquet,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    #[validate(length(min = 1, message = "Source id cannot be empty"))]
    pub id: String,
    #[validate(length(min = 1))]
    pub path: String,
    /// Inferred from the file extension when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<SourceFormat>,
}

impl SourceConfig {
    pub fn resolved_format(&self) -> SourceFormat {
        self.format.unwrap_or_else(|| {
            match Path::new(&self.path).extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("parquet") => SourceFormat::Parquet,
                _ => SourceFormat::Csv,
            }
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Reweight,
    Resample,
}

/// Which audit's table to mitigate, and how.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct MitigationConfig {
    #[validate(length(min = 1))]
    pub audit: String,
    pub strategy: StrategyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl MitigationConfig {
    pub fn to_strategy(&self) -> Result<MitigationStrategy, DomainError> {
        match (self.strategy, self.seed) {
            (StrategyKind::Reweight, _) => Ok(MitigationStrategy::Reweight),
            (StrategyKind::Resample, Some(seed)) => Ok(MitigationStrategy::Resample { seed }),
            (StrategyKind::Resample, None) => Err(DomainError::InvalidConfiguration(
                "Resampling requires an explicit seed (mitigation.seed or HARMONIA_RESAMPLE_SEED)"
                    .into(),
            )),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default, Validate)]
#[serde(deny_unknown_fields)]
pub struct FairnessConfig {
    #[serde(default)]
    #[validate(nested)]
    pub groups: Vec<GroupDefinition>,

    #[serde(default)]
    #[validate(nested)]
    pub audits: Vec<AuditSpec>,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    #[validate(nested)]
    pub representation: Vec<RepresentationSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub mitigation: Option<MitigationConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[validate(length(min = 1, message = "Project name cannot be empty"))]
    pub name: String,
    pub version: String,

    #[serde(rename = "config-paths", default)]
    pub config_paths: Vec<String>,

    #[serde(rename = "target-path", default = "default_target_path")]
    pub target_path: String,

    #[serde(rename = "clean-targets", default = "default_clean_targets")]
    pub clean_targets: Vec<String>,

    #[validate(length(min = 1, message = "At least one key field is required"))]
    pub key_fields: Vec<String>,

    /// List order is source priority: the first source wins conflicts.
    #[validate(length(min = 1, message = "At least one source is required"), nested)]
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    #[validate(nested)]
    pub schema: CanonicalSchema,

    #[serde(default)]
    pub mappings: SchemaMap,

    #[serde(default)]
    #[validate(nested)]
    pub fairness: FairnessConfig,
}

fn default_clean_targets() -> Vec<String> {
    vec!["target".to_string()]
}
fn default_target_path() -> String {
    "target".to_string()
}

impl ProjectConfig {
    /// Cross-reference checks between schema, mappings, groups and audits.
    pub fn check_consistency(&self) -> Result<(), DomainError> {
        self.schema.check_consistency()?;
        Harmonizer::new(&self.schema, &self.key_fields)?;

        let mut ids = HashSet::new();
        for source in &self.sources {
            if !ids.insert(source.id.as_str()) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Duplicate source id '{}'",
                    source.id
                )));
            }
        }
        self.mappings.check_against(&self.schema)?;

        let fairness = &self.fairness;
        check_definitions(&fairness.groups, &self.schema)?;

        let mut audit_names = HashSet::new();
        for audit in &fairness.audits {
            if !audit_names.insert(audit.name.as_str()) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Duplicate audit '{}'",
                    audit.name
                )));
            }
            audit.check_against(&self.schema, &fairness.groups)?;
        }
        if !fairness.audits.is_empty() || !fairness.thresholds.is_empty() {
            fairness.thresholds.check()?;
        }
        for check in &fairness.representation {
            check.check_against(&self.schema)?;
        }
        if let Some(mitigation) = &fairness.mitigation {
            if !audit_names.contains(mitigation.audit.as_str()) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Mitigation targets unknown audit '{}'",
                    mitigation.audit
                )));
            }
            mitigation.to_strategy()?;
        }
        Ok(())
    }

    pub fn audit(&self, name: &str) -> Option<&AuditSpec> {
        self.fairness.audits.iter().find(|a| a.name == name)
    }
}
