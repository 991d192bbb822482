// harmonia-core/src/domain/fairness/metrics.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FairnessMetric {
    DisparateImpact,
    StatisticalParityDifference,
    EqualOpportunityDifference,
}

impl FairnessMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DisparateImpact => "disparate_impact",
            Self::StatisticalParityDifference => "statistical_parity_difference",
            Self::EqualOpportunityDifference => "equal_opportunity_difference",
        }
    }
}

impl fmt::Display for FairnessMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closed acceptable interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricBand {
    pub min: f64,
    pub max: f64,
}

impl MetricBand {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl fmt::Display for MetricBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Caller-configured acceptable band per metric. Nothing is hard-coded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Thresholds(pub BTreeMap<FairnessMetric, MetricBand>);

impl Thresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metric: FairnessMetric, band: MetricBand) -> Self {
        self.0.insert(metric, band);
        self
    }

    pub fn band(&self, metric: FairnessMetric) -> Option<MetricBand> {
        self.0.get(&metric).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rejects empty, inverted, zero-width and non-finite bands.
    pub fn check(&self) -> Result<(), DomainError> {
        if self.0.is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "At least one fairness threshold must be configured".into(),
            ));
        }
        for (metric, band) in &self.0 {
            if !band.min.is_finite() || !band.max.is_finite() {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Threshold for {} must be finite",
                    metric
                )));
            }
            if band.min >= band.max {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Threshold for {} is empty or inverted: {}",
                    metric, band
                )));
            }
            if *metric == FairnessMetric::DisparateImpact && band.max <= 0.0 {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Disparate impact band {} can never be met by a ratio",
                    band
                )));
            }
        }
        Ok(())
    }
}
