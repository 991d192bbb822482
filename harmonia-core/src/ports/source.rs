// harmonia-core/src/ports/source.rs

// What the pipeline needs from a data source, without knowing how it is stored.
// Validation (typing, inf -> null) happens behind this port: the core only sees RawDatasets.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::dataset::RawDataset;
use crate::domain::project::SourceConfig;
use crate::error::HarmoniaError;

#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Reads one source. Relative paths resolve against `project_dir`.
    async fn read(&self, source: &SourceConfig, project_dir: &Path)
    -> Result<RawDataset, HarmoniaError>;

    fn engine_name(&self) -> &str;
}
