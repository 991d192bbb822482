// harmonia-core/src/infrastructure/adapters/json_sink.rs

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::HarmoniaError;
use crate::infrastructure::fs::write_json;
use crate::ports::sink::{Artifact, AuditSink};

/// Writes each artifact as a pretty JSON file in the target directory.
pub struct JsonFileSink {
    target_dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
        }
    }

    pub fn path_of(&self, artifact: Artifact) -> PathBuf {
        self.target_dir.join(artifact.file_name())
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }
}

impl AuditSink for JsonFileSink {
    fn persist(&self, artifact: Artifact, payload: &serde_json::Value) -> Result<(), HarmoniaError> {
        let path = self.path_of(artifact);
        write_json(&path, payload)?;
        debug!(path = ?path, "Artifact written");
        Ok(())
    }

    fn location(&self) -> String {
        self.target_dir.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_artifacts_land_in_target_dir() -> Result<()> {
        let dir = tempdir()?;
        let sink = JsonFileSink::new(dir.path().join("target"));
        sink.persist(Artifact::BiasReports, &serde_json::json!([]))?;

        let written = std::fs::read_to_string(dir.path().join("target/bias_reports.json"))?;
        assert_eq!(written.trim(), "[]");
        Ok(())
    }
}
