pub mod dataset;
pub mod error;
pub mod fairness;
pub mod harmonization;
pub mod project;

// Shortcuts for the most used types
pub use dataset::{CanonicalRecord, CanonicalSchema, CanonicalTable, RawDataset, Value};
pub use error::DomainError;
