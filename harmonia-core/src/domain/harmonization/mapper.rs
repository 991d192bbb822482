// harmonia-core/src/domain/harmonization/mapper.rs

use std::collections::BTreeSet;
use tracing::{debug, instrument, warn};

use crate::domain::dataset::{
    CanonicalRecord, CanonicalRecordBatch, CanonicalSchema, FieldKind, FieldSpec, RawDataset,
    Value,
};
use crate::domain::error::DomainError;
use crate::domain::harmonization::schema_map::{SchemaMap, SourceMapping};

/// Renames columns, canonicalizes categories and converts units for one source.
///
/// Pure function of its inputs: neither the raw dataset nor the configuration is
/// mutated, so independent sources can be mapped concurrently.
pub struct SchemaMapper<'a> {
    schema: &'a CanonicalSchema,
    schema_map: &'a SchemaMap,
}

impl<'a> SchemaMapper<'a> {
    pub fn new(schema: &'a CanonicalSchema, schema_map: &'a SchemaMap) -> Self {
        Self { schema, schema_map }
    }

    /// Maps a whole batch. All-or-nothing: the first bad cell aborts the source.
    #[instrument(skip(self, raw), fields(source = %raw.source_id, rows = raw.rows.len()))]
    pub fn map(&self, raw: &RawDataset) -> Result<CanonicalRecordBatch, DomainError> {
        let mapping = self
            .schema_map
            .source(&raw.source_id)
            .ok_or_else(|| DomainError::UnknownSource(raw.source_id.clone()))?;

        let mut dropped: BTreeSet<String> = BTreeSet::new();
        let mut shadowed: BTreeSet<String> = BTreeSet::new();
        let mut records = Vec::with_capacity(raw.rows.len());

        for row in &raw.rows {
            let mut record = CanonicalRecord::empty(self.schema);
            record.add_provenance(&raw.source_id);

            for (column, value) in row {
                let Some(target) = mapping.target_of(column, self.schema) else {
                    if mapping.is_shadowed(column, self.schema) {
                        shadowed.insert(column.clone());
                    }
                    dropped.insert(column.clone());
                    continue;
                };
                // Guaranteed by the mapping consistency check
                let Some(spec) = self.schema.field(target) else {
                    continue;
                };
                let mapped = map_value(&raw.source_id, mapping, spec, value)?;
                if !mapped.is_null() {
                    record.values.insert(target.to_string(), mapped);
                }
            }

            records.push(record);
        }

        if !shadowed.is_empty() {
            warn!(
                source = %raw.source_id,
                columns = ?shadowed,
                "Ignoring columns already filled by an explicit rename"
            );
        }
        if !dropped.is_empty() {
            warn!(
                source = %raw.source_id,
                columns = ?dropped,
                "Dropping unmapped columns"
            );
        }
        debug!(records = records.len(), "Source mapped");

        Ok(CanonicalRecordBatch {
            source_id: raw.source_id.clone(),
            records,
            dropped_columns: dropped.into_iter().collect(),
        })
    }
}

fn map_value(
    source_id: &str,
    mapping: &SourceMapping,
    spec: &FieldSpec,
    value: &Value,
) -> Result<Value, DomainError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let mismatch = || DomainError::TypeMismatch {
        source_id: source_id.to_string(),
        field: spec.name.clone(),
        expected: spec.kind.to_string(),
        found: value.type_name().to_string(),
    };

    match spec.kind {
        FieldKind::Categorical => {
            // Text, booleans and integer codes are all matched by their canonical form
            let raw = value.key_repr().unwrap_or_default();
            let rule = mapping
                .value_rules
                .get(&spec.name)
                .and_then(|rules| rules.get(&raw));
            match rule {
                Some(canonical) => Ok(Value::Text(canonical.clone())),
                None if spec.in_vocabulary(&raw) => Ok(Value::Text(raw)),
                None => Err(DomainError::UnmappedValue {
                    source_id: source_id.to_string(),
                    field: spec.name.clone(),
                    value: raw,
                }),
            }
        }
        FieldKind::Numeric => {
            let n = value.as_f64().ok_or_else(mismatch)?;
            let converted = match mapping.unit_conversion.get(&spec.name) {
                Some(conversion) => conversion.apply(n),
                None => n,
            };
            if !converted.is_finite() {
                return Err(DomainError::TypeMismatch {
                    source_id: source_id.to_string(),
                    field: spec.name.clone(),
                    expected: "finite number".to_string(),
                    found: converted.to_string(),
                });
            }
            Ok(Value::Number(converted))
        }
        FieldKind::Boolean => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Number(n) if *n == 0.0 => Ok(Value::Bool(false)),
            Value::Number(n) if *n == 1.0 => Ok(Value::Bool(true)),
            _ => Err(mismatch()),
        },
        FieldKind::Text => Ok(Value::Text(value.key_repr().unwrap_or_default())),
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
            FieldSpec::new("credit_approved", FieldKind::Boolean),
        ])
    }

    fn schema_map() -> Result<SchemaMap> {
        let yaml = r#"
sources:
  bureau:
    column_rename: { hh: household_id, sex: gender, loan_kes: loan_amount, approved: credit_approved }
    value_rules:
      gender: { F: female, M: male, "2": female, "1": male }
    unit_conversion:
      loan_amount: { scale: 0.01, offset: 5 }
"#;
        Ok(serde_yaml::from_str(yaml)?)
    }

    fn raw(rows: Vec<Vec<Value>>) -> RawDataset {
        RawDataset::from_columns(
            "bureau",
            &["hh", "sex", "loan_kes", "approved", "enumerator"],
            rows,
        )
    }

    #[test]
    fn test_mapping_renames_converts_and_canonicalizes() -> Result<()> {
        let schema = schema();
        let map = schema_map()?;
        let mapper = SchemaMapper::new(&schema, &map);

        let batch = mapper.map(&raw(vec![
            vec!["H1".into(), "F".into(), 1000.0.into(), 1.0.into(), "amina".into()],
            vec!["H2".into(), 1.0.into(), Value::Null, false.into(), "amina".into()],
            vec!["H3".into(), "male".into(), 200.0.into(), true.into(), Value::Null],
        ]))?;

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.dropped_columns, vec!["enumerator".to_string()]);

        let first = &batch.records[0];
        assert_eq!(first.get("household_id"), &Value::from("H1"));
        assert_eq!(first.get("gender"), &Value::from("female"));
        assert_eq!(first.get("loan_amount"), &Value::Number(15.0));
        assert_eq!(first.get("credit_approved"), &Value::Bool(true));
        assert_eq!(first.provenance, vec!["bureau".to_string()]);

        // Integer code, explicit null and identity match
        assert_eq!(batch.records[1].get("gender"), &Value::from("male"));
        assert!(batch.records[1].get("loan_amount").is_null());
        assert_eq!(batch.records[2].get("gender"), &Value::from("male"));
        Ok(())
    }

    #[test]
    fn test_every_record_has_every_field() -> Result<()> {
        let schema = schema();
        let map = schema_map()?;
        let batch = SchemaMapper::new(&schema, &map).map(&RawDataset::from_columns(
            "bureau",
            &["hh"],
            vec![vec!["H9".into()]],
        ))?;
        let names: Vec<&str> = batch.records[0].values.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["credit_approved", "gender", "household_id", "loan_amount"]
        );
        Ok(())
    }

    #[test]
    fn test_mapped_categories_stay_in_vocabulary() -> Result<()> {
        let schema = schema();
        let map = schema_map()?;
        let batch = SchemaMapper::new(&schema, &map).map(&raw(vec![
            vec!["H1".into(), "F".into(), Value::Null, Value::Null, Value::Null],
            vec!["H2".into(), "M".into(), Value::Null, Value::Null, Value::Null],
            vec!["H3".into(), 2.0.into(), Value::Null, Value::Null, Value::Null],
            vec!["H4".into(), "female".into(), Value::Null, Value::Null, Value::Null],
        ]))?;
        let spec = schema.field("gender").ok_or_else(|| anyhow::anyhow!("gender"))?;
        for record in &batch.records {
            let value = record.get("gender").as_str().unwrap_or_default();
            assert!(spec.in_vocabulary(value), "raw category leaked: {value}");
        }
        Ok(())
    }

    #[test]
    fn test_unknown_category_aborts_the_batch() -> Result<()> {
        let schema = schema();
        let map = schema_map()?;
        let result = SchemaMapper::new(&schema, &map).map(&raw(vec![
            vec!["H1".into(), "F".into(), Value::Null, Value::Null, Value::Null],
            vec!["H2".into(), "X".into(), Value::Null, Value::Null, Value::Null],
        ]));
        assert_eq!(
            result,
            Err(DomainError::UnmappedValue {
                source_id: "bureau".into(),
                field: "gender".into(),
                value: "X".into(),
            })
        );
        Ok(())
    }

    #[test]
    fn test_text_in_numeric_field_is_a_type_mismatch() -> Result<()> {
        let schema = schema();
        let map = schema_map()?;
        let result = SchemaMapper::new(&schema, &map).map(&raw(vec![vec![
            "H1".into(),
            "F".into(),
            "a lot".into(),
            Value::Null,
            Value::Null,
        ]]));
        assert!(matches!(
            result,
            Err(DomainError::TypeMismatch { ref field, .. }) if field == "loan_amount"
        ));
        Ok(())
    }

    #[test]
    fn test_non_binary_number_in_boolean_field_is_rejected() -> Result<()> {
        let schema = schema();
        let map = schema_map()?;
        let result = SchemaMapper::new(&schema, &map).map(&raw(vec![vec![
            "H1".into(),
            Value::Null,
            Value::Null,
            2.0.into(),
            Value::Null,
        ]]));
        assert!(matches!(result, Err(DomainError::TypeMismatch { .. })));
        Ok(())
    }

    #[test]
    fn test_explicit_rename_wins_over_identity_column() -> Result<()> {
        let schema = CanonicalSchema::new(vec![
            FieldSpec::new("id", FieldKind::Text).required(),
            FieldSpec::new("gender", FieldKind::Categorical).with_vocabulary(&["female", "male"]),
        ]);
        let map: SchemaMap =
            serde_yaml::from_str("sources:\n  bureau:\n    column_rename: { code: gender }\n")?;
        map.check_against(&schema)?;

        let batch = SchemaMapper::new(&schema, &map).map(&RawDataset::from_columns(
            "bureau",
            &["id", "gender", "code"],
            vec![vec!["1".into(), "female".into(), "male".into()]],
        ))?;

        assert_eq!(batch.records[0].get("gender"), &Value::from("male"));
        assert_eq!(batch.dropped_columns, vec!["gender".to_string()]);
        Ok(())
    }

    #[test]
    fn test_unknown_source_is_reported() -> Result<()> {
        let schema = schema();
        let map = schema_map()?;
        let raw = RawDataset::new("mystery", vec![]);
        assert_eq!(
            SchemaMapper::new(&schema, &map).map(&raw),
            Err(DomainError::UnknownSource("mystery".into()))
        );
        Ok(())
    }
}
