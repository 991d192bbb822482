// harmonia-core/src/domain/harmonization/harmonizer.rs

use std::collections::HashMap;
use tracing::{info, instrument};

use crate::domain::dataset::{
    CanonicalRecord, CanonicalRecordBatch, CanonicalSchema, CanonicalTable, FieldConflict,
    RejectedRecord,
};
use crate::domain::error::DomainError;

/// Result of merging all mapped batches.
#[derive(Debug, Clone, PartialEq)]
pub struct Harmonized {
    pub table: CanonicalTable,
    pub rejected: Vec<RejectedRecord>,
    pub conflicts: Vec<FieldConflict>,
}

/// Merges mapped batches into one canonical table keyed by `key_fields`.
///
/// Precedence is the order of the batches: for every field the first non-null
/// value wins, no matter how many sources hold the key. Callers that want a
/// different precedence must reorder their inputs.
pub struct Harmonizer<'a> {
    schema: &'a CanonicalSchema,
    key_fields: &'a [String],
}

impl<'a> Harmonizer<'a> {
    pub fn new(schema: &'a CanonicalSchema, key_fields: &'a [String]) -> Result<Self, DomainError> {
        if key_fields.is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "At least one key field is required".into(),
            ));
        }
        if let Some(unknown) = key_fields.iter().find(|k| !schema.contains(k)) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Key field '{}' is not part of the canonical schema",
                unknown
            )));
        }
        Ok(Self { schema, key_fields })
    }

    #[instrument(skip_all, fields(batches = batches.len()))]
    pub fn harmonize(&self, batches: &[CanonicalRecordBatch]) -> Harmonized {
        let mut merged: Vec<Pending> = Vec::new();
        let mut index: HashMap<Vec<String>, usize> = HashMap::new();
        let mut rejected = Vec::new();
        let mut conflicts = Vec::new();

        for batch in batches {
            for record in &batch.records {
                let Some(key) = record.key(self.key_fields) else {
                    rejected.push(self.reject(record, self.missing_key_fields(record)));
                    continue;
                };

                match index.get(&key) {
                    Some(&pos) => {
                        merged[pos].absorb(record, &batch.source_id, &mut conflicts);
                    }
                    None => {
                        let mut pending = Pending {
                            key: key.clone(),
                            record: CanonicalRecord::empty(self.schema),
                            field_sources: HashMap::new(),
                        };
                        pending.absorb(record, &batch.source_id, &mut conflicts);
                        index.insert(key, merged.len());
                        merged.push(pending);
                    }
                }
            }
        }

        // Required-field invariant is checked once every contribution is in.
        let mut accepted = Vec::with_capacity(merged.len());
        for Pending { record, .. } in merged {
            let missing: Vec<String> = self
                .schema
                .required_fields()
                .filter(|f| record.get(&f.name).is_null())
                .map(|f| f.name.clone())
                .collect();
            if missing.is_empty() {
                accepted.push(record);
            } else {
                rejected.push(self.reject(&record, missing));
            }
        }

        info!(
            accepted = accepted.len(),
            rejected = rejected.len(),
            conflicts = conflicts.len(),
            "Harmonization complete"
        );

        Harmonized {
            table: CanonicalTable::new(self.schema.clone(), accepted),
            rejected,
            conflicts,
        }
    }

    fn missing_key_fields(&self, record: &CanonicalRecord) -> Vec<String> {
        self.key_fields
            .iter()
            .filter(|k| record.get(k).is_null())
            .cloned()
            .collect()
    }

    fn reject(&self, record: &CanonicalRecord, missing_fields: Vec<String>) -> RejectedRecord {
        let key = self
            .key_fields
            .iter()
            .map(|k| record.get(k).to_string())
            .collect::<Vec<_>>()
            .join("|");
        let reason = DomainError::RequiredFieldMissing {
            key: key.clone(),
            fields: missing_fields.clone(),
        }
        .to_string();
        RejectedRecord {
            key,
            provenance: record.provenance.clone(),
            missing_fields,
            reason,
            values: record.values.clone(),
        }
    }
}

/// A merged record under construction, with the source that supplied each field.
struct Pending {
    key: Vec<String>,
    record: CanonicalRecord,
    field_sources: HashMap<String, String>,
}

impl Pending {
    fn absorb(
        &mut self,
        incoming: &CanonicalRecord,
        source_id: &str,
        conflicts: &mut Vec<FieldConflict>,
    ) {
        for (field, value) in &incoming.values {
            if value.is_null() {
                continue;
            }
            let current = self.record.values.entry(field.clone()).or_default();
            if current.is_null() {
                *current = value.clone();
                self.field_sources
                    .insert(field.clone(), source_id.to_string());
            } else if current != value {
                conflicts.push(FieldConflict {
                    key: self.key.join("|"),
                    field: field.clone(),
                    kept_source: self.field_sources.get(field).cloned().unwrap_or_default(),
                    kept_value: current.clone(),
                    discarded_source: source_id.to_string(),
                    discarded_value: value.clone(),
                });
            }
        }
        self.record.add_provenance(source_id);
    }
}
