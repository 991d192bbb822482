// harmonia-core/src/domain/dataset/table.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::schema::CanonicalSchema;
use super::value::Value;

pub const WEIGHT_COLUMN: &str = "sample_weight";

/// Role a group definition assigns to the records it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    Privileged,
    Unprivileged,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Privileged => "privileged",
            Self::Unprivileged => "unprivileged",
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One harmonized row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CanonicalRecord {
    /// Every schema field is present; missing data is an explicit null.
    pub values: BTreeMap<String, Value>,

    /// Contributing sources, in priority order, without duplicates.
    pub provenance: Vec<String>,

    /// Label name -> role, or null when the record matched none of the definition's values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, Option<GroupRole>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl CanonicalRecord {
    /// A record with every schema field set to null.
    pub fn empty(schema: &CanonicalSchema) -> Self {
        Self {
            values: schema
                .names()
                .map(|n| (n.to_string(), Value::Null))
                .collect(),
            ..Default::default()
        }
    }

    pub fn get(&self, field: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(field).unwrap_or(&NULL)
    }

    pub fn label(&self, name: &str) -> Option<GroupRole> {
        self.labels.get(name).copied().flatten()
    }

    pub fn add_provenance(&mut self, source_id: &str) {
        if !self.provenance.iter().any(|s| s == source_id) {
            self.provenance.push(source_id.to_string());
        }
    }

    /// Join key built from the canonical representation of `key_fields`.
    /// `None` if any key component is null.
    pub fn key(&self, key_fields: &[String]) -> Option<Vec<String>> {
        key_fields.iter().map(|f| self.get(f).key_repr()).collect()
    }
}

/// Output of the schema mapper for one source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalRecordBatch {
    pub source_id: String,
    pub records: Vec<CanonicalRecord>,
    /// Raw columns that had no mapping and were dropped.
    pub dropped_columns: Vec<String>,
}

impl CanonicalRecordBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Weighting contract attached by reweighing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weighting {
    pub column: String,
    pub contract: String,
}

impl Weighting {
    pub fn sample_weights() -> Self {
        Self {
            column: WEIGHT_COLUMN.to_string(),
            contract: "Rows carry a per-record weight; consumers MUST apply it when aggregating \
                       (weighted sums and rates), otherwise the fairness adjustment is lost."
                .to_string(),
        }
    }
}

/// Ordered sequence of records sharing one schema.
///
/// Stages never mutate a table in place: labelling and mitigation return new tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CanonicalTable {
    pub schema: CanonicalSchema,
    pub records: Vec<CanonicalRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighting: Option<Weighting>,
}

impl CanonicalTable {
    pub fn new(schema: CanonicalSchema, records: Vec<CanonicalRecord>) -> Self {
        Self {
            schema,
            records,
            label_columns: Vec::new(),
            weighting: None,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_weighted(&self) -> bool {
        self.weighting.is_some()
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.label_columns.iter().any(|l| l == name)
    }
}

/// A harmonized row that failed the required-field invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub key: String,
    pub provenance: Vec<String>,
    pub missing_fields: Vec<String>,
    pub reason: String,
    pub values: BTreeMap<String, Value>,
}

/// Two sources disagreed on a field for the same key; the first-listed source won.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConflict {
    pub key: String,
    pub field: String,
    pub kept_source: String,
    pub kept_value: Value,
    pub discarded_source: String,
    pub discarded_value: Value,
}
