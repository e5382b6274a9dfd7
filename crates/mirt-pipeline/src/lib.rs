//! MIRT Pipeline
//!
//! Orchestration of a multidimensional item-response-theory training run:
//! - Validating a run's parameters (`RunConfiguration`)
//! - Naming runs and laying out their files (`RunIdentifier`, `RunLayout`)
//! - Splitting response data and supervising the external EM trainer
//! - Selecting the canonical snapshot and promoting it to the model path
//! - Sequencing generate / train / visualize / test (`PipelineDriver`)

pub mod artifacts;
pub mod collaborators;
pub mod config;
pub mod driver;
pub mod error;
pub mod layout;
pub mod naming;
pub mod process;
pub mod progress;
pub mod resolver;
pub mod settings;
pub mod split;
pub mod trainer;

pub use artifacts::{discover_runs, promote_artifact, sha256_file, RunManifest};
pub use collaborators::{
    AdaptiveTest, CommandAdaptiveTest, CommandEvaluator, CommandGenerator, CommandVisualizer, Evaluator,
    GenerationReport, ResponseGenerator, RocCurve, RocPoint, Visualizer,
};
pub use config::{RunConfiguration, RunParameters, Stage, StageSet};
pub use driver::{Collaborators, PipelineDriver, PipelineSummary};
pub use error::{PipelineError, PipelineResult, StageFailure};
pub use layout::RunLayout;
pub use naming::{name, RunIdentifier};
pub use process::ExternalCommand;
pub use progress::{ProgressEvent, ProgressSink, TracingProgressSink};
pub use resolver::{ArtifactOrdering, ArtifactResolver, LexicographicSuffix, NumericSuffix, OrderingPolicy};
pub use settings::{PipelineSettings, SettingsError, SettingsFile};
pub use split::{DatasetSplitter, ResponseFileSplitter, SplitOptions, SplitSummary};
pub use trainer::{CommandTrainer, TrainRequest, Trainer, TrainingSupervisor};
