use crate::config::Stage;
use crate::naming::RunIdentifier;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    StageStarted { run_id: RunIdentifier, stage: Stage },
    Message { run_id: RunIdentifier, stage: Stage, message: String },
    StageFinished { run_id: RunIdentifier, stage: Stage },
    StageFailed { run_id: RunIdentifier, stage: Stage, error: String },
    ModelSaved { run_id: RunIdentifier, artifact: PathBuf, model: PathBuf },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Forwards progress to the `tracing` subscriber.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::StageStarted { run_id, stage } => tracing::info!("[{stage}:{run_id}] started"),
            ProgressEvent::Message { run_id, stage, message } => tracing::info!("[{stage}:{run_id}] {message}"),
            ProgressEvent::StageFinished { run_id, stage } => tracing::info!("[{stage}:{run_id}] finished"),
            ProgressEvent::StageFailed { run_id, stage, error } => {
                tracing::error!("[{stage}:{run_id}] failed: {error}");
            }
            ProgressEvent::ModelSaved { run_id, artifact, model } => tracing::info!(
                "[train:{run_id}] saving model {} to {}",
                artifact.display(),
                model.display()
            ),
        }
    }
}
