use crate::config::RunConfiguration;
use crate::error::{PipelineError, PipelineResult};
use crate::layout::RunLayout;
use crate::process::{ExternalCommand, OutputMode};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;

/// Parameters handed to the EM trainer for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainRequest {
    pub abilities: u32,
    pub workers: u32,
    pub num_epochs: u32,
    pub train_data_path: PathBuf,
    pub output_dir: PathBuf,
    pub time_mode: bool,
}

impl TrainRequest {
    #[must_use]
    pub fn for_run(config: &RunConfiguration, layout: &RunLayout) -> Self {
        Self {
            abilities: config.abilities(),
            workers: config.workers(),
            num_epochs: config.num_epochs(),
            train_data_path: layout.train_split_path(),
            output_dir: layout.artifact_dir(),
            time_mode: config.time_mode(),
        }
    }

    /// Trainer command-line: `-a <n> -w <n> -n <n> -f <train file> -o <dir> [-z]`.
    #[must_use]
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-a".into(),
            self.abilities.to_string().into(),
            "-w".into(),
            self.workers.to_string().into(),
            "-n".into(),
            self.num_epochs.to_string().into(),
            "-f".into(),
            self.train_data_path.clone().into(),
            "-o".into(),
            self.output_dir.clone().into(),
        ];
        if self.time_mode {
            args.push("-z".into());
        }
        args
    }
}

/// External EM parameter estimator. Writes zero or more snapshot files into
/// `request.output_dir` and returns once it has finished.
#[async_trait]
pub trait Trainer: Send + Sync {
    fn id(&self) -> &'static str;

    async fn train(&self, request: &TrainRequest) -> PipelineResult<()>;
}

/// Runs the trainer as a child process sharing the terminal.
#[derive(Debug, Clone)]
pub struct CommandTrainer {
    command: ExternalCommand,
}

impl CommandTrainer {
    #[must_use]
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Trainer for CommandTrainer {
    fn id(&self) -> &'static str {
        "command"
    }

    async fn train(&self, request: &TrainRequest) -> PipelineResult<()> {
        self.command
            .run(&request.to_args(), OutputMode::Inherit, None)
            .await
            .map(|_| ())
            .map_err(|e| PipelineError::TrainingFailed(e.to_string()))
    }
}

/// Owns the artifact directory of a run and drives the trainer against it.
pub struct TrainingSupervisor<'a> {
    trainer: &'a dyn Trainer,
}

impl<'a> TrainingSupervisor<'a> {
    #[must_use]
    pub fn new(trainer: &'a dyn Trainer) -> Self {
        Self { trainer }
    }

    /// Create directories, then block on the trainer. No retries: a failed
    /// run leaves an unknown partial state behind.
    pub async fn supervise(&self, config: &RunConfiguration, layout: &RunLayout) -> PipelineResult<()> {
        layout.ensure_run_dirs()?;

        let request = TrainRequest::for_run(config, layout);
        tracing::info!(
            "training with {} (abilities={}, workers={}, epochs={}) into {}",
            self.trainer.id(),
            request.abilities,
            request.workers,
            request.num_epochs,
            request.output_dir.display()
        );

        match self.trainer.train(&request).await {
            Ok(()) => Ok(()),
            Err(e @ PipelineError::TrainingFailed(_)) => Err(e),
            Err(e) => Err(PipelineError::TrainingFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunParameters, Stage};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingTrainer {
        requests: Mutex<Vec<TrainRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl Trainer for RecordingTrainer {
        fn id(&self) -> &'static str {
            "recording"
        }

        async fn train(&self, request: &TrainRequest) -> PipelineResult<()> {
            assert!(request.output_dir.is_dir(), "artifact dir must exist before training");
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(PipelineError::Io(std::io::Error::other("disk full")));
            }
            Ok(())
        }
    }

    fn run_config(root: &std::path::Path, time_mode: bool) -> RunConfiguration {
        RunConfiguration::new(RunParameters {
            model_directory: root.to_path_buf(),
            model_path: root.join("model.json"),
            abilities: 3,
            workers: 4,
            num_epochs: 20,
            time_mode,
            stages: [Stage::Train].into_iter().collect(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_request_args() {
        let temp = TempDir::new().unwrap();
        let config = run_config(temp.path(), true);
        let layout = RunLayout::for_config(&config);
        let args = TrainRequest::for_run(&config, &layout).to_args();

        let expected: Vec<OsString> = vec![
            "-a".into(),
            "3".into(),
            "-w".into(),
            "4".into(),
            "-n".into(),
            "20".into(),
            "-f".into(),
            layout.train_split_path().into(),
            "-o".into(),
            layout.artifact_dir().into(),
            "-z".into(),
        ];
        assert_eq!(args, expected);

        let config = run_config(temp.path(), false);
        let args = TrainRequest::for_run(&config, &RunLayout::for_config(&config)).to_args();
        assert!(!args.contains(&OsString::from("-z")));
    }

    #[tokio::test]
    async fn test_supervise_creates_dirs_before_training() {
        let temp = TempDir::new().unwrap();
        let config = run_config(temp.path(), false);
        let layout = RunLayout::for_config(&config);
        let trainer = RecordingTrainer::default();

        TrainingSupervisor::new(&trainer).supervise(&config, &layout).await.unwrap();

        assert!(layout.rocs_dir().is_dir());
        assert_eq!(trainer.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_supervise_maps_failures_to_training_failed() {
        let temp = TempDir::new().unwrap();
        let config = run_config(temp.path(), false);
        let layout = RunLayout::for_config(&config);
        let trainer = RecordingTrainer { fail: true, ..Default::default() };

        let err = TrainingSupervisor::new(&trainer).supervise(&config, &layout).await.unwrap_err();
        assert!(matches!(err, PipelineError::TrainingFailed(_)));
        assert_eq!(trainer.requests.lock().unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_trainer_nonzero_exit() {
        let temp = TempDir::new().unwrap();
        let config = run_config(temp.path(), false);
        let layout = RunLayout::for_config(&config);
        layout.ensure_run_dirs().unwrap();
        let trainer = CommandTrainer::new(ExternalCommand::new(["sh", "-c", "exit 1", "trainer"]));

        let err = trainer.train(&TrainRequest::for_run(&config, &layout)).await.unwrap_err();
        assert!(matches!(err, PipelineError::TrainingFailed(_)));
    }
}
