use crate::config::Stage;
use std::path::PathBuf;
use thiserror::Error;

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("training failed: {0}")]
    TrainingFailed(String),

    #[error("trainer produced no artifacts in {}", .0.display())]
    NoArtifactsProduced(PathBuf),

    #[error("failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("response data file not found: {}", .0.display())]
    MissingDataFile(PathBuf),

    #[error("trained model not found: {}", .0.display())]
    MissingModel(PathBuf),

    #[error("{name} failed: {message}")]
    Collaborator { name: &'static str, message: String },

    #[error("malformed ROC report {}: {message}", .path.display())]
    RocParse { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub(crate) fn collaborator(name: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator { name, message: message.into() }
    }
}

/// An error tagged with the stage that raised it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}

impl StageFailure {
    #[must_use]
    pub fn new(stage: Stage, source: PipelineError) -> Self {
        Self { stage, source }
    }
}
