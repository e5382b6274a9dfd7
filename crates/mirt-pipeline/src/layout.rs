use crate::config::RunConfiguration;
use crate::error::{PipelineError, PipelineResult};
use crate::naming::{self, RunIdentifier};
use std::path::{Path, PathBuf};

pub const TRAIN_SPLIT_FILE: &str = "train.responses";
pub const TEST_SPLIT_FILE: &str = "test.responses";
pub const ROCS_DIR: &str = "rocs";
pub const MANIFESTS_DIR: &str = "manifests";

/// Filesystem layout of one run, computed once from its configuration.
///
/// ```text
/// <model_directory>/rocs/<timestamp>
/// <model_directory>/manifests/<run_id>.json
/// <model_directory>/<run_id>/<snapshot files...>
/// <model_directory>/train.responses
/// <model_directory>/test.responses
/// <model>
/// ```
#[derive(Debug, Clone)]
pub struct RunLayout {
    root: PathBuf,
    run_id: RunIdentifier,
    model_path: PathBuf,
}

impl RunLayout {
    #[must_use]
    pub fn for_config(config: &RunConfiguration) -> Self {
        Self {
            root: config.model_directory().to_path_buf(),
            run_id: naming::name(config),
            model_path: config.model_path().to_path_buf(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn run_id(&self) -> &RunIdentifier {
        &self.run_id
    }

    #[must_use]
    pub fn artifact_dir(&self) -> PathBuf {
        self.root.join(self.run_id.as_str())
    }

    #[must_use]
    pub fn train_split_path(&self) -> PathBuf {
        self.root.join(TRAIN_SPLIT_FILE)
    }

    #[must_use]
    pub fn test_split_path(&self) -> PathBuf {
        self.root.join(TEST_SPLIT_FILE)
    }

    #[must_use]
    pub fn rocs_dir(&self) -> PathBuf {
        self.root.join(ROCS_DIR)
    }

    /// ROC report for this run, keyed by the run's timestamp.
    #[must_use]
    pub fn roc_report_path(&self) -> PathBuf {
        self.rocs_dir().join(self.run_id.timestamp_component())
    }

    #[must_use]
    pub fn manifests_dir(&self) -> PathBuf {
        self.root.join(MANIFESTS_DIR)
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.manifests_dir().join(format!("{}.json", self.run_id))
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Create the artifact directory and the shared report directories.
    /// Idempotent; existing contents are left untouched.
    pub fn ensure_run_dirs(&self) -> PipelineResult<()> {
        for dir in [self.root.clone(), self.rocs_dir(), self.artifact_dir()] {
            ensure_dir(&dir)?;
        }
        Ok(())
    }
}

pub(crate) fn ensure_dir(path: &Path) -> PipelineResult<()> {
    std::fs::create_dir_all(path)
        .map_err(|source| PipelineError::DirectoryCreationFailed { path: path.to_path_buf(), source })
}
