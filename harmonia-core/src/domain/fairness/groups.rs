// harmonia-core/src/domain/fairness/groups.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;
use validator::Validate;

use crate::domain::dataset::{CanonicalSchema, CanonicalTable, GroupRole};
use crate::domain::error::DomainError;

/// A protected-attribute group: records whose `attribute` is one of
/// `matching_values` get the definition's role under its `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GroupDefinition {
    #[validate(length(min = 1, message = "Group name cannot be empty"))]
    pub name: String,
    pub attribute: String,
    #[validate(length(min = 1, message = "A group needs at least one matching value"))]
    pub matching_values: Vec<String>,
    pub role: GroupRole,
}

impl GroupDefinition {
    pub fn new(name: &str, attribute: &str, values: &[&str], role: GroupRole) -> Self {
        Self {
            name: name.to_string(),
            attribute: attribute.to_string(),
            matching_values: values.iter().map(|v| v.to_string()).collect(),
            role,
        }
    }
}

/// Checks names and attributes of a definition list against the schema.
pub fn check_definitions(
    definitions: &[GroupDefinition],
    schema: &CanonicalSchema,
) -> Result<(), DomainError> {
    let mut names = HashSet::new();
    for def in definitions {
        if !names.insert(def.name.as_str()) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Duplicate group definition '{}'",
                def.name
            )));
        }
        if schema.contains(&def.name) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Group name '{}' collides with a canonical field",
                def.name
            )));
        }
        if !schema.contains(&def.attribute) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Group '{}' uses unknown attribute '{}'",
                def.name, def.attribute
            )));
        }
        if def.matching_values.is_empty() {
            return Err(DomainError::InvalidConfiguration(format!(
                "Group '{}' has no matching values",
                def.name
            )));
        }
    }
    Ok(())
}

/// Derives per-record group labels.
///
/// Labels are independent per definition: a record can be privileged under
/// several names at once. Composing attributes is left to the caller.
pub struct GroupLabeler<'a> {
    definitions: &'a [GroupDefinition],
}

impl<'a> GroupLabeler<'a> {
    pub fn new(definitions: &'a [GroupDefinition]) -> Self {
        Self { definitions }
    }

    /// Returns a new table whose label columns are exactly `definitions`, in order.
    /// Labels from an earlier run are discarded and recomputed.
    pub fn label(&self, table: &CanonicalTable) -> Result<CanonicalTable, DomainError> {
        check_definitions(self.definitions, &table.schema)?;

        let matchers: Vec<(&GroupDefinition, HashSet<&str>)> = self
            .definitions
            .iter()
            .map(|d| (d, d.matching_values.iter().map(String::as_str).collect()))
            .collect();

        let mut labelled = table.clone();
        labelled.label_columns = self.definitions.iter().map(|d| d.name.clone()).collect();

        for record in &mut labelled.records {
            let mut labels = BTreeMap::new();
            for (def, values) in &matchers {
                let matched = record
                    .get(&def.attribute)
                    .key_repr()
                    .is_some_and(|v| values.contains(v.as_str()));
                labels.insert(def.name.clone(), matched.then_some(def.role));
            }
            record.labels = labels;
        }

        for (def, _) in &matchers {
            let hits = labelled
                .records
                .iter()
                .filter(|r| r.label(&def.name).is_some())
                .count();
            debug!(group = %def.name, role = %def.role, records = hits, "Group labelled");
        }

        Ok(labelled)
    }
}
