// harmonia-core/src/domain/dataset/schema.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use validator::Validate;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Numeric,
    Categorical,
    Text,
    Boolean,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Text => "text",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    #[validate(length(min = 1, message = "Field name cannot be empty"))]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: FieldKind,

    #[serde(default)]
    pub required: bool,

    /// Canonical vocabulary. Mandatory for categorical fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vocabulary: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            vocabulary: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_vocabulary(mut self, values: &[&str]) -> Self {
        self.vocabulary = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn in_vocabulary(&self, value: &str) -> bool {
        self.vocabulary.iter().any(|v| v == value)
    }
}

/// The single agreed-upon set of fields every harmonized record conforms to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, Default)]
#[serde(deny_unknown_fields)]
pub struct CanonicalSchema {
    #[validate(
        length(min = 1, message = "The canonical schema needs at least one field"),
        nested
    )]
    pub fields: Vec<FieldSpec>,
}

impl CanonicalSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Structural checks that `validator` cannot express.
    pub fn check_consistency(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Duplicate canonical field '{}'",
                    field.name
                )));
            }
            match field.kind {
                FieldKind::Categorical if field.vocabulary.is_empty() => {
                    return Err(DomainError::InvalidConfiguration(format!(
                        "Categorical field '{}' must declare a vocabulary",
                        field.name
                    )));
                }
                FieldKind::Categorical => {}
                _ if !field.vocabulary.is_empty() => {
                    return Err(DomainError::InvalidConfiguration(format!(
                        "Field '{}' is {} and cannot declare a vocabulary",
                        field.name, field.kind
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_schema_from_yaml() -> Result<()> {
        let yaml = r#"
fields:
  - name: household_id
    type: text
    required: true
  - name: gender
    type: categorical
    vocabulary: [female, male]
  - name: loan_amount
    type: numeric
"#;
        let schema: CanonicalSchema = serde_yaml::from_str(yaml)?;
        schema.validate()?;
        schema.check_consistency()?;
        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.required_fields().count(), 1);
        assert!(schema.field("gender").is_some_and(|f| f.in_vocabulary("male")));
        Ok(())
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let yaml = "fields:\n  - name: id\n    type: text\n    nullable: true\n";
        let parsed: Result<CanonicalSchema, _> = serde_yaml::from_str(yaml);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_categorical_without_vocabulary_is_invalid() {
        let schema = CanonicalSchema::new(vec![FieldSpec::new("region", FieldKind::Categorical)]);
        assert!(matches!(
            schema.check_consistency(),
            Err(DomainError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_duplicate_field_is_invalid() {
        let schema = CanonicalSchema::new(vec![
            FieldSpec::new("id", FieldKind::Text),
            FieldSpec::new("id", FieldKind::Numeric),
        ]);
        assert!(schema.check_consistency().is_err());
    }
}
