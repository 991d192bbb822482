// harmonia-core/src/domain/fairness/mitigation.rs

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument};

use crate::domain::dataset::{CanonicalTable, GroupRole, Weighting};
use crate::domain::error::DomainError;
use crate::domain::fairness::auditor::{BiasReport, is_positive, membership};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MitigationStrategy {
    /// Kamiran-Calders reweighing; row count unchanged.
    Reweight,
    /// Group-preserving resampling towards the overall favorable rate.
    Resample { seed: u64 },
}

impl fmt::Display for MitigationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reweight => write!(f, "reweight"),
            Self::Resample { seed } => write!(f, "resample(seed={})", seed),
        }
    }
}

/// Cell index: `[group][outcome]`, privileged = 0, favorable = 0.
type Cells<T> = [[T; 2]; 2];

fn group_index(role: GroupRole) -> usize {
    match role {
        GroupRole::Privileged => 0,
        GroupRole::Unprivileged => 1,
    }
}

fn outcome_index(favorable: bool) -> usize {
    if favorable { 0 } else { 1 }
}

pub struct Mitigator;

impl Mitigator {
    /// Returns a new table adjusted for the disparity `report` describes.
    /// An unflagged report leaves the table as is.
    #[instrument(skip_all, fields(audit = %report.audit, strategy = %strategy))]
    pub fn mitigate(
        table: &CanonicalTable,
        report: &BiasReport,
        strategy: MitigationStrategy,
    ) -> Result<CanonicalTable, DomainError> {
        if !report.flagged {
            debug!("Report not flagged, nothing to mitigate");
            return Ok(table.clone());
        }

        let cells = Self::assign_cells(table, report)?;
        let mitigated = match strategy {
            MitigationStrategy::Reweight => Self::reweight(table, &cells),
            MitigationStrategy::Resample { seed } => Self::resample(table, report, &cells, seed)?,
        };
        info!(rows_in = table.len(), rows_out = mitigated.len(), "Mitigation applied");
        Ok(mitigated)
    }

    /// Per record: `(group, outcome)` cell, or `None` when the record takes no part.
    fn assign_cells(
        table: &CanonicalTable,
        report: &BiasReport,
    ) -> Result<Vec<Option<(usize, usize)>>, DomainError> {
        let privileged = &report.privileged.definition.name;
        let unprivileged = &report.unprivileged.definition.name;
        for label in [privileged, unprivileged] {
            if !table.has_label(label) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Report '{}' refers to label '{}' absent from the table",
                    report.audit, label
                )));
            }
        }

        Ok(table
            .records
            .iter()
            .map(|record| {
                let role = membership(record, privileged, unprivileged)?;
                let outcome = record.get(&report.outcome_field);
                if outcome.is_null() {
                    return None;
                }
                Some((
                    group_index(role),
                    outcome_index(is_positive(outcome, &report.favorable_values)),
                ))
            })
            .collect())
    }

    fn reweight(table: &CanonicalTable, cells: &[Option<(usize, usize)>]) -> CanonicalTable {
        let mut counts: Cells<usize> = [[0; 2]; 2];
        for (g, y) in cells.iter().flatten() {
            counts[*g][*y] += 1;
        }
        let n: usize = counts.iter().flatten().sum();
        let n_group = |g: usize| counts[g][0] + counts[g][1];
        let n_outcome = |y: usize| counts[0][y] + counts[1][y];

        let mut weights: Cells<f64> = [[1.0; 2]; 2];
        for g in 0..2 {
            for y in 0..2 {
                if counts[g][y] > 0 {
                    weights[g][y] = (n_group(g) * n_outcome(y)) as f64 / (n * counts[g][y]) as f64;
                }
            }
        }
        debug!(?weights, "Reweighing factors");

        let mut weighted = table.clone();
        for (record, cell) in weighted.records.iter_mut().zip(cells) {
            record.weight = Some(match cell {
                Some((g, y)) => weights[*g][*y],
                None => 1.0,
            });
        }
        weighted.weighting = Some(Weighting::sample_weights());
        weighted
    }

    fn resample(
        table: &CanonicalTable,
        report: &BiasReport,
        cells: &[Option<(usize, usize)>],
        seed: u64,
    ) -> Result<CanonicalTable, DomainError> {
        let mut pools: Cells<Vec<usize>> = Default::default();
        for (i, cell) in cells.iter().enumerate() {
            if let Some((g, y)) = cell {
                pools[*g][*y].push(i);
            }
        }

        let n: usize = pools.iter().flatten().map(Vec::len).sum();
        let favorable: usize = pools.iter().map(|g| g[0].len()).sum();
        let overall_rate = favorable as f64 / n as f64;

        // rows outside both groups are kept once
        let mut multiplicity: Vec<usize> = cells.iter().map(|c| usize::from(c.is_none())).collect();
        let mut rng = StdRng::seed_from_u64(seed);

        for (g, pool) in pools.iter().enumerate() {
            let size = pool[0].len() + pool[1].len();
            let target_favorable = (size as f64 * overall_rate).round() as usize;
            let targets = [target_favorable, size - target_favorable];

            for y in 0..2 {
                let members = &pool[y];
                let target = targets[y];
                if target > 0 && members.is_empty() {
                    let group = if g == 0 { &report.privileged } else { &report.unprivileged };
                    return Err(DomainError::InsufficientData {
                        audit: report.audit.clone(),
                        group: format!(
                            "{} '{}' has no {} rows to resample",
                            group.definition.role,
                            group.definition.name,
                            if y == 0 { "favorable" } else { "unfavorable" }
                        ),
                    });
                }
                if target <= members.len() {
                    for i in index::sample(&mut rng, members.len(), target).into_iter() {
                        multiplicity[members[i]] += 1;
                    }
                } else {
                    for &i in members {
                        multiplicity[i] += 1;
                    }
                    for _ in members.len()..target {
                        multiplicity[members[rng.gen_range(0..members.len())]] += 1;
                    }
                }
            }
        }

        let mut resampled = table.clone();
        resampled.weighting = None;
        resampled.records = table
            .records
            .iter()
            .zip(&multiplicity)
            .flat_map(|(record, &times)| std::iter::repeat_n(record, times))
            .map(|record| {
                let mut record = record.clone();
                record.weight = None;
                record
            })
            .collect();
        Ok(resampled)
    }
}
