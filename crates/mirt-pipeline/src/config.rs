use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One step of the pipeline.
///
/// Variant order is the execution order: sets of stages iterate
/// generate -> train -> visualize -> test no matter how they were built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Generate,
    Train,
    Visualize,
    Test,
}

impl Stage {
    pub const ALL: [Self; 4] = [Self::Generate, Self::Train, Self::Visualize, Self::Test];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Train => "train",
            Self::Visualize => "visualize",
            Self::Test => "test",
        }
    }

    /// Whether a failure in this stage aborts every later stage.
    #[must_use]
    pub fn is_fatal_on_failure(self) -> bool {
        matches!(self, Self::Generate | Self::Train)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stages requested for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSet(BTreeSet<Stage>);

impl StageSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Selected stages in execution order.
    pub fn iter(&self) -> impl Iterator<Item = Stage> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Stage> for StageSet {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Raw, unvalidated inputs for a pipeline invocation.
#[derive(Debug, Clone)]
pub struct RunParameters {
    pub data_file: PathBuf,
    pub model_directory: PathBuf,
    pub model_path: PathBuf,
    pub abilities: u32,
    pub num_students: u32,
    pub num_problems: u32,
    pub time_mode: bool,
    pub workers: u32,
    pub num_epochs: u32,
    pub stages: StageSet,
}

impl Default for RunParameters {
    fn default() -> Self {
        let model_directory = PathBuf::from("sample_data").join("models");
        Self {
            data_file: PathBuf::from("sample_data").join("all.responses"),
            model_path: model_directory.join("model.json"),
            model_directory,
            abilities: 1,
            num_students: 500,
            num_problems: 10,
            time_mode: false,
            workers: 1,
            num_epochs: 100,
            stages: StageSet::new(),
        }
    }
}

/// A validated, frozen description of one pipeline run.
///
/// The timestamp is captured once at construction and is the only source
/// of run identity.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    data_file: PathBuf,
    model_directory: PathBuf,
    model_path: PathBuf,
    abilities: u32,
    num_students: u32,
    num_problems: u32,
    time_mode: bool,
    workers: u32,
    num_epochs: u32,
    stages: StageSet,
    created_at: DateTime<Utc>,
}

impl RunConfiguration {
    /// Validate `params` and stamp the configuration with the current time.
    pub fn new(params: RunParameters) -> PipelineResult<Self> {
        Self::with_timestamp(params, Utc::now())
    }

    pub fn with_timestamp(params: RunParameters, created_at: DateTime<Utc>) -> PipelineResult<Self> {
        validate(&params)?;
        Ok(Self {
            data_file: params.data_file,
            model_directory: params.model_directory,
            model_path: params.model_path,
            abilities: params.abilities,
            num_students: params.num_students,
            num_problems: params.num_problems,
            time_mode: params.time_mode,
            workers: params.workers,
            num_epochs: params.num_epochs,
            stages: params.stages,
            created_at,
        })
    }

    #[must_use]
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    #[must_use]
    pub fn model_directory(&self) -> &Path {
        &self.model_directory
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    #[must_use]
    pub fn abilities(&self) -> u32 {
        self.abilities
    }

    #[must_use]
    pub fn num_students(&self) -> u32 {
        self.num_students
    }

    #[must_use]
    pub fn num_problems(&self) -> u32 {
        self.num_problems
    }

    #[must_use]
    pub fn time_mode(&self) -> bool {
        self.time_mode
    }

    #[must_use]
    pub fn workers(&self) -> u32 {
        self.workers
    }

    #[must_use]
    pub fn num_epochs(&self) -> u32 {
        self.num_epochs
    }

    #[must_use]
    pub fn stages(&self) -> &StageSet {
        &self.stages
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn validate(params: &RunParameters) -> PipelineResult<()> {
    if params.abilities == 0 {
        return Err(PipelineError::InvalidConfiguration("abilities must be >= 1".to_string()));
    }
    if params.workers == 0 {
        return Err(PipelineError::InvalidConfiguration("workers must be >= 1".to_string()));
    }
    if params.num_epochs == 0 {
        return Err(PipelineError::InvalidConfiguration("num_epochs must be >= 1".to_string()));
    }
    if params.stages.is_empty() {
        return Err(PipelineError::InvalidConfiguration(
            "at least one stage (generate, train, visualize, test) must be selected".to_string(),
        ));
    }
    Ok(())
}
