// harmonia-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarmoniaError {
    // --- DOMAIN ERRORS (mapping, harmonization, fairness) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (IO, parsing, DuckDB) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- GENERIC / APPLICATION ERRORS ---
    #[error("Internal Error: {0}")]
    InternalError(String),

    #[error("Unsafe path traversal detected: {0}")]
    UnsafePath(String),
}

impl HarmoniaError {
    /// Configuration problems abort a run before any data is read.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HarmoniaError::Domain(DomainError::InvalidConfiguration(_))
                | HarmoniaError::Infrastructure(
                    InfrastructureError::ConfigNotFound(_)
                        | InfrastructureError::ConfigError(_)
                        | InfrastructureError::Validation(_)
                        | InfrastructureError::YamlError(_)
                )
        )
    }
}

impl From<std::io::Error> for HarmoniaError {
    fn from(err: std::io::Error) -> Self {
        HarmoniaError::Infrastructure(InfrastructureError::Io(err))
    }
}
