// harmonia-core/src/domain/dataset/mod.rs

pub mod raw;
pub mod schema;
pub mod table;
pub mod value;

pub use raw::{RawDataset, Row};
pub use schema::{CanonicalSchema, FieldKind, FieldSpec};
pub use table::{
    CanonicalRecord, CanonicalRecordBatch, CanonicalTable, FieldConflict, GroupRole,
    RejectedRecord, WEIGHT_COLUMN, Weighting,
};
pub use value::Value;
