// harmonia-core/src/domain/harmonization/mod.rs

pub mod harmonizer;
pub mod mapper;
pub mod schema_map;

pub use harmonizer::{Harmonized, Harmonizer};
pub use mapper::SchemaMapper;
pub use schema_map::{SchemaMap, SourceMapping, UnitConversion};
