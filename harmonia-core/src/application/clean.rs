// harmonia-core/src/application/clean.rs

use std::fs;
use std::path::{Component, Path};

use crate::error::HarmoniaError;
use crate::infrastructure::config::project::load_project_config;

/// Removes the configured clean targets. Returns the targets actually removed.
pub fn clean_project(project_dir: &Path) -> Result<Vec<String>, HarmoniaError> {
    tracing::info!("🧹 Initializing Harmonia cleanup sequence...");

    let config = load_project_config(project_dir)?;

    let targets = if config.clean_targets.is_empty() {
        vec![config.target_path.clone()]
    } else {
        config.clean_targets
    };

    let mut removed = Vec::new();
    for target_rel_path in targets {
        // Path traversal guard: only plain relative paths below the project
        let relative = Path::new(&target_rel_path);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes {
            return Err(HarmoniaError::UnsafePath(target_rel_path));
        }

        let full_path = project_dir.join(relative);
        if full_path.exists() {
            if full_path.is_dir() {
                fs::remove_dir_all(&full_path)?;
            } else {
                fs::remove_file(&full_path)?;
            }
            println!("   🗑️  Artifact removed: {}", target_rel_path);
            removed.push(target_rel_path);
        }
    }

    Ok(removed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn project(clean_targets: &str) -> Result<tempfile::TempDir> {
        let dir = tempdir()?;
        let yaml = format!(
            r#"
name: demo
version: "1.0"
clean-targets: {}
key_fields: [id]
sources: [ {{ id: a, path: a.csv }} ]
schema:
  fields: [ {{ name: id, type: text }} ]
"#,
            clean_targets
        );
        fs::write(dir.path().join("harmonia.yaml"), yaml)?;
        Ok(dir)
    }

    #[test]
    fn test_clean_removes_targets() -> Result<()> {
        let dir = project("[target]")?;
        fs::create_dir_all(dir.path().join("target"))?;
        fs::write(dir.path().join("target/run_results.json"), "{}")?;

        let removed = clean_project(dir.path())?;
        assert_eq!(removed, vec!["target"]);
        assert!(!dir.path().join("target").exists());
        Ok(())
    }

    #[test]
    fn test_clean_refuses_traversal() -> Result<()> {
        let dir = project("[\"../outside\"]")?;
        let err = clean_project(dir.path()).unwrap_err();
        assert!(matches!(err, HarmoniaError::UnsafePath(_)));
        Ok(())
    }
}
