use crate::error::TrainingResult;
use crate::job::RunId;
use std::path::{Path, PathBuf};

/// Filesystem layout for local export runs.
///
/// Default layout is under `<output_dir>/<run_id>/...`
#[derive(Debug, Clone)]
pub struct ExportLayout {
    root: PathBuf,
}

impl ExportLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.root.join(run_id.0.as_str())
    }

    #[must_use]
    pub fn manifest_path(&self, run_id: &RunId) -> PathBuf {
        self.run_dir(run_id).join("manifest.json")
    }

    #[must_use]
    pub fn train_path(&self, run_id: &RunId) -> PathBuf {
        self.run_dir(run_id).join("train.jsonl")
    }

    #[must_use]
    pub fn validation_path(&self, run_id: &RunId) -> PathBuf {
        self.run_dir(run_id).join("validation.jsonl")
    }

    pub fn ensure_run_dir(&self, run_id: &RunId) -> TrainingResult<()> {
        std::fs::create_dir_all(self.run_dir(run_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let temp = TempDir::new().unwrap();
        let layout = ExportLayout::new(temp.path().join("exports"));
        let id = RunId("run-1".to_string());

        layout.ensure_run_dir(&id).unwrap();
        assert!(layout.run_dir(&id).is_dir());
        assert!(layout.train_path(&id).ends_with("run-1/train.jsonl"));
        assert!(layout.manifest_path(&id).to_string_lossy().contains("exports"));
    }
}
