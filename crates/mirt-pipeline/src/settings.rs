//! Pipeline configuration file support.
//!
//! Settings cover what the command line does not: which external programs
//! implement each collaborator, how the dataset is split, and how artifacts
//! are ordered.

use crate::collaborators::{CommandAdaptiveTest, CommandEvaluator, CommandGenerator, CommandVisualizer};
use crate::driver::Collaborators;
use crate::process::ExternalCommand;
use crate::resolver::{ArtifactResolver, OrderingPolicy};
use crate::split::{ResponseFileSplitter, SplitOptions};
use crate::trainer::CommandTrainer;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Argv prefixes of the external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub trainer: ExternalCommand,
    pub generator: ExternalCommand,
    pub evaluator: ExternalCommand,
    pub visualizer: ExternalCommand,
    pub adaptive_test: ExternalCommand,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            trainer: ExternalCommand::new(["mirt_train_EM"]),
            generator: ExternalCommand::new(["generate_responses"]),
            evaluator: ExternalCommand::new(["generate_predictions"]),
            visualizer: ExternalCommand::new(["visualize"]),
            adaptive_test: ExternalCommand::new(["adaptive_pretest"]),
        }
    }
}

/// Every field is optional so partial files can be layered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub artifact_ordering: Option<OrderingPolicy>,

    #[serde(default)]
    pub split: Option<SplitOptions>,

    #[serde(default)]
    pub commands: Option<PartialCommandSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialCommandSettings {
    pub trainer: Option<ExternalCommand>,
    pub generator: Option<ExternalCommand>,
    pub evaluator: Option<ExternalCommand>,
    pub visualizer: Option<ExternalCommand>,
    pub adaptive_test: Option<ExternalCommand>,
}

/// Resolved settings after layering files over defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSettings {
    pub log_level: Option<String>,
    pub artifact_ordering: OrderingPolicy,
    pub split: SplitOptions,
    pub commands: CommandSettings,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),
}

pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

impl SettingsFile {
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            return Err(SettingsError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::ReadError(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| SettingsError::ParseError(format!("{}: {}", path.display(), e)))
    }
}

impl PipelineSettings {
    /// `~/.mirt/config.toml`
    pub fn default_global_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".mirt").join("config.toml"))
    }

    /// `./.mirtrc`
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".mirtrc")
    }

    /// Load the global then the local file; the local file wins. Missing
    /// files are skipped, malformed ones are reported.
    pub fn discover_and_load() -> SettingsResult<Self> {
        let mut settings = Self::default();
        let candidates = Self::default_global_path().into_iter().chain([Self::default_local_path()]);
        for path in candidates {
            match SettingsFile::load_from_file(&path) {
                Ok(file) => settings.merge(file),
                Err(SettingsError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(settings)
    }

    /// Load a single explicit file over defaults. The file must exist.
    pub fn load(path: &Path) -> SettingsResult<Self> {
        let mut settings = Self::default();
        settings.merge(SettingsFile::load_from_file(path)?);
        Ok(settings)
    }

    /// Values present in `file` override the current ones.
    pub fn merge(&mut self, file: SettingsFile) {
        if let Some(level) = file.log_level {
            self.log_level = Some(level);
        }
        if let Some(ordering) = file.artifact_ordering {
            self.artifact_ordering = ordering;
        }
        if let Some(split) = file.split {
            self.split = split;
        }
        if let Some(commands) = file.commands {
            let slots = [
                (commands.trainer, &mut self.commands.trainer),
                (commands.generator, &mut self.commands.generator),
                (commands.evaluator, &mut self.commands.evaluator),
                (commands.visualizer, &mut self.commands.visualizer),
                (commands.adaptive_test, &mut self.commands.adaptive_test),
            ];
            for (value, slot) in slots {
                if let Some(value) = value {
                    *slot = value;
                }
            }
        }
    }

    /// Command-backed collaborators wired from these settings.
    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            generator: Box::new(CommandGenerator::new(self.commands.generator.clone())),
            splitter: Box::new(ResponseFileSplitter::new(self.split.clone())),
            trainer: Box::new(CommandTrainer::new(self.commands.trainer.clone())),
            resolver: ArtifactResolver::new(self.artifact_ordering.strategy()),
            evaluator: Box::new(CommandEvaluator::new(self.commands.evaluator.clone())),
            visualizer: Box::new(CommandVisualizer::new(self.commands.visualizer.clone())),
            adaptive_test: Box::new(CommandAdaptiveTest::new(self.commands.adaptive_test.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
artifact_ordering = "numeric"

[commands]
trainer = ["python", "mirt/mirt_train_EM.py"]
"#,
        )
        .unwrap();

        let settings = PipelineSettings::load(&path).unwrap();
        assert_eq!(settings.artifact_ordering, OrderingPolicy::Numeric);
        assert_eq!(settings.commands.trainer.argv(), ["python", "mirt/mirt_train_EM.py"]);
        assert_eq!(settings.commands.evaluator, CommandSettings::default().evaluator);
        assert_eq!(settings.split, SplitOptions::default());
    }

    #[test]
    fn test_merge_later_layer_wins() {
        let mut settings = PipelineSettings::default();
        settings.merge(SettingsFile { log_level: Some("debug".into()), ..Default::default() });
        settings.merge(SettingsFile {
            split: Some(SplitOptions { holdout_every: 5, min_rows_per_side: 10 }),
            ..Default::default()
        });

        assert_eq!(settings.log_level.as_deref(), Some("debug"));
        assert_eq!(settings.split.holdout_every, 5);
    }

    #[test]
    fn test_partial_split_table_fills_defaults() {
        let file: SettingsFile = toml::from_str("[split]\nmin_rows_per_side = 50\n").unwrap();
        let split = file.split.unwrap();
        assert_eq!(split.min_rows_per_side, 50);
        assert_eq!(split.holdout_every, SplitOptions::default().holdout_every);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            PipelineSettings::load(&temp.path().join("absent.toml")),
            Err(SettingsError::NotFound(_))
        ));

        let bad = temp.path().join("bad.toml");
        std::fs::write(&bad, "artifact_ordering = \"by_mood\"").unwrap();
        assert!(matches!(PipelineSettings::load(&bad), Err(SettingsError::ParseError(_))));
    }
}
