use crate::artifacts::{promote_artifact, RunManifest};
use crate::collaborators::{AdaptiveTest, Evaluator, GenerationReport, ResponseGenerator, RocCurve, Visualizer};
use crate::config::{RunConfiguration, Stage};
use crate::error::{PipelineError, PipelineResult, StageFailure};
use crate::layout::{ensure_dir, RunLayout};
use crate::naming::RunIdentifier;
use crate::progress::{ProgressEvent, ProgressSink, TracingProgressSink};
use crate::resolver::ArtifactResolver;
use crate::split::DatasetSplitter;
use crate::trainer::{Trainer, TrainingSupervisor};
use std::collections::BTreeMap;
use std::path::Path;

/// Everything the driver delegates to.
pub struct Collaborators {
    pub generator: Box<dyn ResponseGenerator>,
    pub splitter: Box<dyn DatasetSplitter>,
    pub trainer: Box<dyn Trainer>,
    pub resolver: ArtifactResolver,
    pub evaluator: Box<dyn Evaluator>,
    pub visualizer: Box<dyn Visualizer>,
    pub adaptive_test: Box<dyn AdaptiveTest>,
}

/// What a run accomplished.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub run_id: RunIdentifier,
    pub completed: Vec<Stage>,
    pub generated: Option<GenerationReport>,
    pub trained: Option<RunManifest>,
    pub roc_curve: Option<RocCurve>,
}

/// Sequences the selected stages of one run in the fixed order
/// generate -> train -> visualize -> test.
///
/// A generate or train failure aborts the run. A visualize failure is held
/// back until test has been attempted, since both only read the model.
pub struct PipelineDriver {
    config: RunConfiguration,
    layout: RunLayout,
    collaborators: Collaborators,
    progress: Box<dyn ProgressSink>,
}

impl PipelineDriver {
    #[must_use]
    pub fn new(config: RunConfiguration, collaborators: Collaborators) -> Self {
        let layout = RunLayout::for_config(&config);
        Self { config, layout, collaborators, progress: Box::new(TracingProgressSink) }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    pub async fn run(&self) -> Result<PipelineSummary, StageFailure> {
        let run_id = self.layout.run_id().clone();
        let mut summary = PipelineSummary {
            run_id: run_id.clone(),
            completed: Vec::new(),
            generated: None,
            trained: None,
            roc_curve: None,
        };
        let mut deferred: Option<StageFailure> = None;

        for stage in self.config.stages().iter() {
            self.progress.on_event(ProgressEvent::StageStarted { run_id: run_id.clone(), stage });

            match self.run_stage(stage, &mut summary).await {
                Ok(()) => {
                    self.progress.on_event(ProgressEvent::StageFinished { run_id: run_id.clone(), stage });
                    summary.completed.push(stage);
                }
                Err(source) => {
                    self.progress.on_event(ProgressEvent::StageFailed {
                        run_id: run_id.clone(),
                        stage,
                        error: source.to_string(),
                    });
                    let failure = StageFailure::new(stage, source);
                    if stage.is_fatal_on_failure() {
                        return Err(failure);
                    }
                    deferred.get_or_insert(failure);
                }
            }
        }

        match deferred {
            Some(failure) => Err(failure),
            None => Ok(summary),
        }
    }

    async fn run_stage(&self, stage: Stage, summary: &mut PipelineSummary) -> PipelineResult<()> {
        match stage {
            Stage::Generate => summary.generated = Some(self.generate().await?),
            Stage::Train => summary.trained = Some(self.train().await?),
            Stage::Visualize => summary.roc_curve = Some(self.visualize().await?),
            Stage::Test => self.test().await?,
        }
        Ok(())
    }

    fn message(&self, stage: Stage, message: String) {
        self.progress.on_event(ProgressEvent::Message { run_id: self.layout.run_id().clone(), stage, message });
    }

    async fn generate(&self) -> PipelineResult<GenerationReport> {
        if let Some(parent) = self.config.data_file().parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }

        let report = self.collaborators.generator.generate(&self.config).await?;
        self.message(
            Stage::Generate,
            format!("generated responses for {} students and {} problems", report.students, report.problems),
        );
        Ok(report)
    }

    async fn train(&self) -> PipelineResult<RunManifest> {
        let data_file = self.config.data_file();
        if !data_file.is_file() {
            return Err(PipelineError::MissingDataFile(data_file.to_path_buf()));
        }

        self.layout.ensure_run_dirs()?;

        let split = self.collaborators.splitter.split(data_file, self.layout.root())?;
        self.message(
            Stage::Train,
            format!(
                "split {} students into {} train / {} test rows",
                split.students, split.train_rows, split.test_rows
            ),
        );

        TrainingSupervisor::new(self.collaborators.trainer.as_ref()).supervise(&self.config, &self.layout).await?;

        let artifact = self.collaborators.resolver.resolve(&self.layout.artifact_dir())?;
        self.progress.on_event(ProgressEvent::ModelSaved {
            run_id: self.layout.run_id().clone(),
            artifact: artifact.clone(),
            model: self.layout.model_path().to_path_buf(),
        });
        let digest = promote_artifact(&artifact, self.layout.model_path())?;

        let manifest = RunManifest::new(&self.config, &self.layout, artifact, digest);
        if let Err(e) = manifest.write(&self.layout.manifest_path()) {
            tracing::warn!("model saved but run manifest could not be written: {e}");
        }
        Ok(manifest)
    }

    async fn visualize(&self) -> PipelineResult<RocCurve> {
        let model = self.require_model()?;
        let test_data = self.layout.test_split_path();
        if !test_data.is_file() {
            return Err(PipelineError::MissingDataFile(test_data));
        }
        ensure_dir(&self.layout.rocs_dir())?;

        let curve = self
            .collaborators
            .evaluator
            .evaluate(model, &test_data, &self.layout.roc_report_path())
            .await?;

        self.message(Stage::Visualize, format!("visualizing for {}", model.display()));
        let curves = BTreeMap::from([(self.layout.run_id().clone(), curve.clone())]);
        self.collaborators.visualizer.show(&curves, model).await?;
        Ok(curve)
    }

    async fn test(&self) -> PipelineResult<()> {
        let model = self.require_model()?;
        self.collaborators.adaptive_test.run(model).await
    }

    /// A model at the configured path is sufficient, whether this run or an
    /// earlier one produced it.
    fn require_model(&self) -> PipelineResult<&Path> {
        let model = self.layout.model_path();
        if model.is_file() { Ok(model) } else { Err(PipelineError::MissingModel(model.to_path_buf())) }
    }
}
