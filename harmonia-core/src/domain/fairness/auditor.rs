// harmonia-core/src/domain/fairness/auditor.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::domain::dataset::{CanonicalRecord, CanonicalSchema, CanonicalTable, GroupRole, Value};
use crate::domain::error::DomainError;
use crate::domain::fairness::groups::GroupDefinition;
use crate::domain::fairness::metrics::{FairnessMetric, MetricBand, Thresholds};

fn default_positive_values() -> Vec<String> {
    vec!["true".to_string(), "1".to_string()]
}

/// One fairness comparison: an outcome and a privileged/unprivileged pair of groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AuditSpec {
    #[validate(length(min = 1, message = "Audit name cannot be empty"))]
    pub name: String,

    pub outcome_field: String,

    /// Outcome values (canonical form) that count as favorable.
    #[serde(default = "default_positive_values")]
    #[validate(length(min = 1))]
    pub favorable_values: Vec<String>,

    /// Group definition providing the privileged mask.
    pub privileged: String,

    /// Group definition providing the unprivileged mask.
    pub unprivileged: String,

    /// Enables equal opportunity difference when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth_field: Option<String>,

    #[serde(default = "default_positive_values")]
    pub positive_values: Vec<String>,
}

/// The two group definitions an audit compares.
#[derive(Debug, Clone, Copy)]
pub struct AuditGroups<'a> {
    pub privileged: &'a GroupDefinition,
    pub unprivileged: &'a GroupDefinition,
}

impl AuditSpec {
    /// Looks up and type-checks the audit's group definitions.
    pub fn resolve_groups<'a>(
        &self,
        definitions: &'a [GroupDefinition],
    ) -> Result<AuditGroups<'a>, DomainError> {
        let find = |name: &str, role: GroupRole| {
            let def = definitions.iter().find(|d| d.name == name).ok_or_else(|| {
                DomainError::InvalidConfiguration(format!(
                    "Audit '{}' references unknown group '{}'",
                    self.name, name
                ))
            })?;
            if def.role != role {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Audit '{}' expects group '{}' to be {}, it is {}",
                    self.name, name, role, def.role
                )));
            }
            Ok(def)
        };
        Ok(AuditGroups {
            privileged: find(&self.privileged, GroupRole::Privileged)?,
            unprivileged: find(&self.unprivileged, GroupRole::Unprivileged)?,
        })
    }

    pub fn check_against(
        &self,
        schema: &CanonicalSchema,
        definitions: &[GroupDefinition],
    ) -> Result<(), DomainError> {
        if !schema.contains(&self.outcome_field) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Audit '{}' uses unknown outcome field '{}'",
                self.name, self.outcome_field
            )));
        }
        if let Some(gt) = &self.ground_truth_field
            && !schema.contains(gt)
        {
            return Err(DomainError::InvalidConfiguration(format!(
                "Audit '{}' uses unknown ground truth field '{}'",
                self.name, gt
            )));
        }
        self.resolve_groups(definitions).map(|_| ())
    }
}

/// Favorable-outcome statistics of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupOutcome {
    pub definition: GroupDefinition,
    pub rows: usize,
    pub favorable: usize,
    pub favorable_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_positive_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// `None` when the metric is undefined (e.g. division by a zero rate).
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<MetricBand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within_band: Option<bool>,
}

/// Immutable outcome of one audit. Contains no timestamps: identical inputs
/// produce identical reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    pub audit: String,
    pub outcome_field: String,
    pub favorable_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth_field: Option<String>,
    pub privileged: GroupOutcome,
    pub unprivileged: GroupOutcome,
    pub metrics: BTreeMap<FairnessMetric, MetricResult>,
    /// Rows outside both groups or without a known outcome.
    pub excluded_rows: usize,
    /// Rows matched by both groups; counted in neither.
    pub ambiguous_rows: usize,
    pub flagged: bool,
}

impl BiasReport {
    pub fn metric(&self, metric: FairnessMetric) -> Option<f64> {
        self.metrics.get(&metric).and_then(|m| m.value)
    }

    /// One-line rendering for logs and terminal output.
    pub fn summary(&self) -> String {
        let metrics: Vec<String> = self
            .metrics
            .iter()
            .map(|(metric, result)| match result.value {
                Some(v) => format!("{}={:.4}", metric, v),
                None => format!("{}=null", metric),
            })
            .collect();
        format!(
            "{} flagged={} {}",
            self.audit,
            self.flagged,
            metrics.join(" ")
        )
    }
}

#[derive(Debug, Default)]
struct Tally {
    rows: usize,
    favorable: usize,
    eligible: usize,
    true_positive: usize,
}

impl Tally {
    fn rate(&self) -> f64 {
        self.favorable as f64 / self.rows as f64
    }

    fn true_positive_rate(&self) -> Option<f64> {
        (self.eligible > 0).then(|| self.true_positive as f64 / self.eligible as f64)
    }
}

pub(crate) fn is_positive(value: &Value, accepted: &[String]) -> bool {
    value
        .key_repr()
        .is_some_and(|v| accepted.iter().any(|a| *a == v))
}

/// Group membership of a record for a privileged/unprivileged pair.
pub(crate) fn membership(
    record: &CanonicalRecord,
    privileged: &str,
    unprivileged: &str,
) -> Option<GroupRole> {
    match (
        record.label(privileged).is_some(),
        record.label(unprivileged).is_some(),
    ) {
        (true, false) => Some(GroupRole::Privileged),
        (false, true) => Some(GroupRole::Unprivileged),
        _ => None,
    }
}

/// Group-fairness diagnostics. Stateless: thresholds and groups are passed to every call.
pub struct BiasAuditor;

impl BiasAuditor {
    #[instrument(skip_all, fields(audit = %spec.name))]
    pub fn audit(
        table: &CanonicalTable,
        spec: &AuditSpec,
        groups: &AuditGroups<'_>,
        thresholds: &Thresholds,
    ) -> Result<BiasReport, DomainError> {
        for label in [&groups.privileged.name, &groups.unprivileged.name] {
            if !table.has_label(label) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Table carries no label column '{}'; run the group labeler first",
                    label
                )));
            }
        }

        let mut privileged = Tally::default();
        let mut unprivileged = Tally::default();
        let mut excluded_rows = 0;
        let mut ambiguous_rows = 0;

        for record in &table.records {
            let in_privileged = record.label(&groups.privileged.name).is_some();
            let in_unprivileged = record.label(&groups.unprivileged.name).is_some();
            let tally = match membership(record, &groups.privileged.name, &groups.unprivileged.name) {
                Some(GroupRole::Privileged) => &mut privileged,
                Some(GroupRole::Unprivileged) => &mut unprivileged,
                None => {
                    if in_privileged && in_unprivileged {
                        ambiguous_rows += 1;
                    } else {
                        excluded_rows += 1;
                    }
                    continue;
                }
            };

            let outcome = record.get(&spec.outcome_field);
            if outcome.is_null() {
                excluded_rows += 1;
                continue;
            }
            let favorable = is_positive(outcome, &spec.favorable_values);
            tally.rows += 1;
            if favorable {
                tally.favorable += 1;
            }

            if let Some(gt) = &spec.ground_truth_field
                && is_positive(record.get(gt), &spec.positive_values)
            {
                tally.eligible += 1;
                if favorable {
                    tally.true_positive += 1;
                }
            }
        }

        if ambiguous_rows > 0 {
            warn!(rows = ambiguous_rows, "Rows belong to both groups and were left out");
        }
        for (tally, def) in [(&privileged, groups.privileged), (&unprivileged, groups.unprivileged)] {
            if tally.rows == 0 {
                return Err(DomainError::InsufficientData {
                    audit: spec.name.clone(),
                    group: format!(
                        "{} group '{}' selects no rows with a known outcome",
                        def.role, def.name
                    ),
                });
            }
        }

        let p_rate = privileged.rate();
        let u_rate = unprivileged.rate();

        let mut values: Vec<(FairnessMetric, Option<f64>)> = vec![
            (
                FairnessMetric::DisparateImpact,
                (p_rate != 0.0).then(|| u_rate / p_rate),
            ),
            (FairnessMetric::StatisticalParityDifference, Some(u_rate - p_rate)),
        ];
        if spec.ground_truth_field.is_some() {
            let eod = match (
                unprivileged.true_positive_rate(),
                privileged.true_positive_rate(),
            ) {
                (Some(u), Some(p)) => Some(u - p),
                _ => None,
            };
            values.push((FairnessMetric::EqualOpportunityDifference, eod));
        }

        let metrics: BTreeMap<FairnessMetric, MetricResult> = values
            .into_iter()
            .map(|(metric, value)| {
                let band = thresholds.band(metric);
                let within_band = match (value, band) {
                    (Some(v), Some(b)) => Some(b.contains(v)),
                    _ => None,
                };
                (
                    metric,
                    MetricResult {
                        value,
                        band,
                        within_band,
                    },
                )
            })
            .collect();

        let flagged = metrics.values().any(|m| m.within_band == Some(false));

        let report = BiasReport {
            audit: spec.name.clone(),
            outcome_field: spec.outcome_field.clone(),
            favorable_values: spec.favorable_values.clone(),
            ground_truth_field: spec.ground_truth_field.clone(),
            privileged: GroupOutcome {
                definition: groups.privileged.clone(),
                rows: privileged.rows,
                favorable: privileged.favorable,
                favorable_rate: p_rate,
                true_positive_rate: privileged.true_positive_rate(),
            },
            unprivileged: GroupOutcome {
                definition: groups.unprivileged.clone(),
                rows: unprivileged.rows,
                favorable: unprivileged.favorable,
                favorable_rate: u_rate,
                true_positive_rate: unprivileged.true_positive_rate(),
            },
            metrics,
            excluded_rows,
            ambiguous_rows,
            flagged,
        };

        info!(summary = %report.summary(), "Bias audit complete");
        Ok(report)
    }
}
