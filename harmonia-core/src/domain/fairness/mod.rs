// harmonia-core/src/domain/fairness/mod.rs

pub mod auditor;
pub mod groups;
pub mod metrics;
pub mod mitigation;
pub mod representation;

pub use auditor::{AuditGroups, AuditSpec, BiasAuditor, BiasReport, GroupOutcome, MetricResult};
pub use groups::{GroupDefinition, GroupLabeler, check_definitions};
pub use metrics::{FairnessMetric, MetricBand, Thresholds};
pub use mitigation::{MitigationStrategy, Mitigator};
pub use representation::{RepresentationReport, RepresentationSpec, check_representation};
