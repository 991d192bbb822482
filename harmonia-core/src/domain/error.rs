// harmonia-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum DomainError {
    #[error("Unmapped value '{value}' for field '{field}' (source '{source_id}')")]
    #[diagnostic(
        code(harmonia::domain::unmapped_value),
        help("Add a value rule for '{field}' in mappings.yml or extend the field vocabulary.")
    )]
    UnmappedValue {
        source_id: String,
        field: String,
        value: String,
    },

    #[error("Type mismatch on field '{field}' (source '{source_id}'): expected {expected}, found {found}")]
    #[diagnostic(
        code(harmonia::domain::type_mismatch),
        help("Upstream validation must deliver typed columns before mapping.")
    )]
    TypeMismatch {
        source_id: String,
        field: String,
        expected: String,
        found: String,
    },

    #[error("Required field(s) missing for key '{key}': {}", .fields.join(", "))]
    #[diagnostic(code(harmonia::domain::required_field_missing))]
    RequiredFieldMissing { key: String, fields: Vec<String> },

    #[error("Insufficient data for '{audit}': {group}")]
    #[diagnostic(
        code(harmonia::domain::insufficient_data),
        help("Check the group definitions or decide to proceed without this bias check.")
    )]
    InsufficientData { audit: String, group: String },

    #[error("No mapping declared for source '{0}'")]
    #[diagnostic(code(harmonia::domain::unknown_source))]
    UnknownSource(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(harmonia::domain::config))]
    InvalidConfiguration(String),
}
