// harmonia-core/src/domain/project/mod.rs

pub mod configuration;
pub use configuration::{
    FairnessConfig, MitigationConfig, ProjectConfig, SourceConfig, SourceFormat, StrategyKind,
};
