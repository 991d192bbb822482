// harmonia-core/src/domain/fairness/representation.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::dataset::{CanonicalSchema, CanonicalTable};
use crate::domain::error::DomainError;

fn default_max_gap() -> f64 {
    0.2
}

/// Demographic balance check on one categorical attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RepresentationSpec {
    pub attribute: String,

    /// Largest tolerated difference between the most and least represented category shares.
    #[serde(default = "default_max_gap")]
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub max_gap: f64,
}

impl RepresentationSpec {
    pub fn check_against(&self, schema: &CanonicalSchema) -> Result<(), DomainError> {
        if !schema.contains(&self.attribute) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Representation check uses unknown attribute '{}'",
                self.attribute
            )));
        }
        if !(self.max_gap > 0.0 && self.max_gap <= 1.0) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Representation max_gap must be in (0, 1], got {}",
                self.max_gap
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepresentationReport {
    pub attribute: String,
    pub counts: BTreeMap<String, usize>,
    pub shares: BTreeMap<String, f64>,
    /// Rows with a null attribute; not part of any share.
    pub missing_rows: usize,
    pub observed_gap: f64,
    pub max_gap: f64,
    pub flagged: bool,
}

impl RepresentationReport {
    pub fn summary(&self) -> String {
        format!(
            "{} flagged={} gap={:.4} max_gap={}",
            self.attribute, self.flagged, self.observed_gap, self.max_gap
        )
    }
}

/// Shares of each observed category of `spec.attribute`.
#[instrument(skip_all, fields(attribute = %spec.attribute))]
pub fn check_representation(
    table: &CanonicalTable,
    spec: &RepresentationSpec,
) -> Result<RepresentationReport, DomainError> {
    spec.check_against(&table.schema)?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut missing_rows = 0;
    for record in &table.records {
        match record.get(&spec.attribute).key_repr() {
            Some(v) => *counts.entry(v).or_default() += 1,
            None => missing_rows += 1,
        }
    }

    if counts.len() < 2 {
        return Err(DomainError::InsufficientData {
            audit: format!("representation of {}", spec.attribute),
            group: format!("{} observed categories, at least 2 needed", counts.len()),
        });
    }

    let total: usize = counts.values().sum();
    let shares: BTreeMap<String, f64> = counts
        .iter()
        .map(|(k, n)| (k.clone(), *n as f64 / total as f64))
        .collect();
    let max = shares.values().copied().fold(f64::MIN, f64::max);
    let min = shares.values().copied().fold(f64::MAX, f64::min);
    let observed_gap = max - min;

    let report = RepresentationReport {
        attribute: spec.attribute.clone(),
        counts,
        shares,
        missing_rows,
        observed_gap,
        max_gap: spec.max_gap,
        flagged: observed_gap > spec.max_gap,
    };
    info!(summary = %report.summary(), "Representation check complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{CanonicalRecord, FieldKind, FieldSpec, Value};
    use anyhow::Result;

    fn table(values: &[Option<&str>]) -> CanonicalTable {
        let schema = CanonicalSchema::new(vec![
            FieldSpec::new("location", FieldKind::Categorical).with_vocabulary(&["urban", "rural"]),
        ]);
        let records = values
            .iter()
            .map(|v| {
                let mut r = CanonicalRecord::empty(&schema);
                if let Some(v) = v {
                    r.values.insert("location".into(), Value::from(*v));
                }
                r
            })
            .collect();
        CanonicalTable::new(schema, records)
    }

    fn spec(max_gap: f64) -> RepresentationSpec {
        RepresentationSpec {
            attribute: "location".into(),
            max_gap,
        }
    }

    #[test]
    fn test_imbalance_is_flagged() -> Result<()> {
        let mut values = vec![Some("urban"); 8];
        values.extend([Some("rural"), Some("rural"), None]);
        let report = check_representation(&table(&values), &spec(0.2))?;

        assert_eq!(report.counts["urban"], 8);
        assert_eq!(report.missing_rows, 1);
        assert!((report.shares["urban"] - 0.8).abs() < 1e-12);
        assert!((report.observed_gap - 0.6).abs() < 1e-12);
        assert!(report.flagged);
        Ok(())
    }

    #[test]
    fn test_balanced_population_passes() -> Result<()> {
        let values = [Some("urban"), Some("rural"), Some("urban"), Some("rural")];
        let report = check_representation(&table(&values), &spec(0.2))?;
        assert_eq!(report.observed_gap, 0.0);
        assert!(!report.flagged);
        Ok(())
    }

    #[test]
    fn test_single_category_is_insufficient() {
        let values = [Some("urban"), Some("urban"), None];
        assert!(matches!(
            check_representation(&table(&values), &spec(0.2)),
            Err(DomainError::InsufficientData { .. })
        ));
    }
}
