// harmonia-core/src/domain/harmonization/schema_map.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::dataset::{CanonicalSchema, FieldKind};
use crate::domain::error::DomainError;

fn default_scale() -> f64 {
    1.0
}

/// `value * scale + offset`, applied to a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConversion {
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

impl Default for UnitConversion {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }
}

impl UnitConversion {
    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }
}

/// Mapping rules for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SourceMapping {
    /// raw column -> canonical field
    #[serde(default)]
    pub column_rename: BTreeMap<String, String>,

    /// canonical field -> (raw value -> canonical value)
    #[serde(default)]
    pub value_rules: BTreeMap<String, BTreeMap<String, String>>,

    /// canonical field -> conversion
    #[serde(default)]
    pub unit_conversion: BTreeMap<String, UnitConversion>,
}

impl SourceMapping {
    /// Canonical name of a raw column: explicit rename first, then identity.
    /// An identity column whose field is also a rename target yields `None`.
    pub fn target_of<'a>(&'a self, raw_column: &'a str, schema: &CanonicalSchema) -> Option<&'a str> {
        match self.column_rename.get(raw_column) {
            Some(target) => Some(target.as_str()),
            None if self.is_shadowed(raw_column, schema) => None,
            None if schema.contains(raw_column) => Some(raw_column),
            None => None,
        }
    }

    /// True when `raw_column` would pass through as a canonical field that an
    /// explicit rename already fills.
    pub fn is_shadowed(&self, raw_column: &str, schema: &CanonicalSchema) -> bool {
        !self.column_rename.contains_key(raw_column)
            && schema.contains(raw_column)
            && self.column_rename.values().any(|target| target == raw_column)
    }

    fn check_against(&self, source_id: &str, schema: &CanonicalSchema) -> Result<(), DomainError> {
        let invalid = |msg: String| DomainError::InvalidConfiguration(format!("[{}] {}", source_id, msg));

        let mut renamed_to: BTreeMap<&str, &str> = BTreeMap::new();
        for (raw, target) in &self.column_rename {
            if !schema.contains(target) {
                return Err(invalid(format!(
                    "column '{}' is renamed to unknown canonical field '{}'",
                    raw, target
                )));
            }
            if let Some(previous) = renamed_to.insert(target.as_str(), raw.as_str()) {
                return Err(invalid(format!(
                    "columns '{}' and '{}' are both renamed to '{}'",
                    previous, raw, target
                )));
            }
        }

        for (field, rules) in &self.value_rules {
            let spec = schema
                .field(field)
                .ok_or_else(|| invalid(format!("value rules target unknown field '{}'", field)))?;
            if spec.kind != FieldKind::Categorical {
                return Err(invalid(format!(
                    "value rules only apply to categorical fields, '{}' is {}",
                    field, spec.kind
                )));
            }
            for (raw, canonical) in rules {
                if !spec.in_vocabulary(canonical) {
                    return Err(invalid(format!(
                        "rule '{}' -> '{}' on '{}' leaves the canonical vocabulary",
                        raw, canonical, field
                    )));
                }
            }
        }

        for (field, conversion) in &self.unit_conversion {
            let spec = schema
                .field(field)
                .ok_or_else(|| invalid(format!("unit conversion targets unknown field '{}'", field)))?;
            if spec.kind != FieldKind::Numeric {
                return Err(invalid(format!(
                    "unit conversion on non-numeric field '{}'",
                    field
                )));
            }
            if !conversion.scale.is_finite() || conversion.scale == 0.0 || !conversion.offset.is_finite() {
                return Err(invalid(format!(
                    "unit conversion on '{}' needs a finite non-zero scale and a finite offset",
                    field
                )));
            }
        }

        Ok(())
    }
}

/// Per-source mapping rules. Loaded once per run, shared read-only by every mapping task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SchemaMap {
    #[serde(default)]
    pub sources: BTreeMap<String, SourceMapping>,
}

impl SchemaMap {
    pub fn source(&self, source_id: &str) -> Option<&SourceMapping> {
        self.sources.get(source_id)
    }

    pub fn check_against(&self, schema: &CanonicalSchema) -> Result<(), DomainError> {
        for (source_id, mapping) in &self.sources {
            mapping.check_against(source_id, schema)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::FieldSpec;
    use anyhow::Result;

    fn schema() -> CanonicalSchema {
        CanonicalSchema::new(vec![
            FieldSpec::new("household_id", FieldKind::Text).required(),
            FieldSpec::new("gender", FieldKind::Categorical).with_vocabulary(&["female", "male"]),
            FieldSpec::new("loan_amount", FieldKind::Numeric),
        ])
    }

    #[test]
    fn test_schema_map_from_yaml() -> Result<()> {
        let yaml = r#"
sources:
  bureau:
    column_rename: { hh: household_id, sex: gender, loan_kes: loan_amount }
    value_rules:
      gender: { F: female, M: male }
    unit_conversion:
      loan_amount: { scale: 0.0077 }
"#;
        let map: SchemaMap = serde_yaml::from_str(yaml)?;
        map.check_against(&schema())?;
        let bureau = map.source("bureau").ok_or_else(|| anyhow::anyhow!("missing source"))?;
        assert_eq!(bureau.unit_conversion["loan_amount"].offset, 0.0);
        assert_eq!(bureau.target_of("sex", &schema()), Some("gender"));
        assert_eq!(bureau.target_of("household_id", &schema()), Some("household_id"));
        assert_eq!(bureau.target_of("district", &schema()), None);
        Ok(())
    }

    #[test]
    fn test_rule_outside_vocabulary_is_rejected() -> Result<()> {
        let yaml = "sources:\n  s:\n    value_rules:\n      gender: { X: other }\n";
        let map: SchemaMap = serde_yaml::from_str(yaml)?;
        assert!(matches!(
            map.check_against(&schema()),
            Err(DomainError::InvalidConfiguration(_))
        ));
        Ok(())
    }

    #[test]
    fn test_unknown_mapping_key_is_rejected() {
        let yaml = "sources:\n  s:\n    renames: { a: b }\n";
        assert!(serde_yaml::from_str::<SchemaMap>(yaml).is_err());
    }

    #[test]
    fn test_two_renames_to_one_field_are_rejected() -> Result<()> {
        let yaml = "sources:\n  s:\n    column_rename: { sex: gender, gndr: gender }\n";
        let map: SchemaMap = serde_yaml::from_str(yaml)?;
        match map.check_against(&schema()) {
            Err(DomainError::InvalidConfiguration(msg)) => {
                assert!(msg.contains("'gndr' and 'sex' are both renamed to 'gender'"));
            }
            other => panic!("expected InvalidConfiguration, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_identity_column_is_shadowed_by_rename() -> Result<()> {
        let yaml = "sources:\n  s:\n    column_rename: { sex: gender }\n";
        let map: SchemaMap = serde_yaml::from_str(yaml)?;
        let s = map.source("s").ok_or_else(|| anyhow::anyhow!("missing source"))?;
        assert!(s.is_shadowed("gender", &schema()));
        assert_eq!(s.target_of("gender", &schema()), None);
        assert_eq!(s.target_of("sex", &schema()), Some("gender"));
        assert!(!s.is_shadowed("loan_amount", &schema()));
        Ok(())
    }

    #[test]
    fn test_zero_scale_is_rejected() -> Result<()> {
        let yaml = "sources:\n  s:\n    unit_conversion:\n      loan_amount: { scale: 0 }\n";
        let map: SchemaMap = serde_yaml::from_str(yaml)?;
        assert!(map.check_against(&schema()).is_err());
        Ok(())
    }
}
