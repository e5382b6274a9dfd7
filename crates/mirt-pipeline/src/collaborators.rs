//! External collaborators the pipeline hands work to: response generation,
//! held-out evaluation, visualization and the adaptive test loop.

use crate::config::RunConfiguration;
use crate::error::{PipelineError, PipelineResult};
use crate::naming::RunIdentifier;
use crate::process::{ExternalCommand, OutputMode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub false_positive_rate: f64,
    pub true_positive_rate: f64,
}

pub type RocCurve = Vec<RocPoint>;

/// Parse a ROC report: one `fpr,tpr` (or whitespace separated) pair per line.
/// Blank lines and `#` comments are skipped.
pub fn parse_roc_report(path: &Path) -> PipelineResult<RocCurve> {
    let contents = std::fs::read_to_string(path)?;
    let malformed = |line: usize, message: String| PipelineError::RocParse {
        path: path.to_path_buf(),
        message: format!("line {line}: {message}"),
    };

    let mut curve = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(|c: char| c == ',' || c.is_whitespace()).filter(|f| !f.is_empty()).collect();
        let [fpr, tpr] = fields.as_slice() else {
            return Err(malformed(idx + 1, format!("expected 2 fields, found {}", fields.len())));
        };
        let parse = |field: &str| {
            field
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| malformed(idx + 1, format!("not a rate: {field}")))
        };
        curve.push(RocPoint { false_positive_rate: parse(*fpr)?, true_positive_rate: parse(*tpr)? });
    }
    Ok(curve)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub data_file: PathBuf,
    pub students: u32,
    pub problems: u32,
}

/// Writes a synthetic response file to `config.data_file()`.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, config: &RunConfiguration) -> PipelineResult<GenerationReport>;
}

/// Replays held-out responses against a model and produces a ROC curve.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, model: &Path, test_data: &Path, roc_report: &Path) -> PipelineResult<RocCurve>;
}

#[async_trait]
pub trait Visualizer: Send + Sync {
    async fn show(&self, curves: &BTreeMap<RunIdentifier, RocCurve>, model: &Path) -> PipelineResult<()>;
}

/// Interactive adaptive test session driven by a trained model.
#[async_trait]
pub trait AdaptiveTest: Send + Sync {
    async fn run(&self, model: &Path) -> PipelineResult<()>;
}

#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: ExternalCommand,
}

impl CommandGenerator {
    #[must_use]
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }

    fn args(config: &RunConfiguration) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-d".into(),
            config.data_file().into(),
            "-a".into(),
            config.abilities().to_string().into(),
            "-s".into(),
            config.num_students().to_string().into(),
            "-p".into(),
            config.num_problems().to_string().into(),
        ];
        if config.time_mode() {
            args.push("-t".into());
        }
        args
    }
}

#[async_trait]
impl ResponseGenerator for CommandGenerator {
    async fn generate(&self, config: &RunConfiguration) -> PipelineResult<GenerationReport> {
        self.command
            .run(&Self::args(config), OutputMode::Capture, None)
            .await
            .map_err(|e| PipelineError::collaborator("response generator", e.to_string()))?;

        Ok(GenerationReport {
            data_file: config.data_file().to_path_buf(),
            students: config.num_students(),
            problems: config.num_problems(),
        })
    }
}

/// Runs `<cmd> --model <m> --test-file <t> --roc-file <r>` and reads back the
/// report it wrote.
#[derive(Debug, Clone)]
pub struct CommandEvaluator {
    command: ExternalCommand,
}

impl CommandEvaluator {
    #[must_use]
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Evaluator for CommandEvaluator {
    async fn evaluate(&self, model: &Path, test_data: &Path, roc_report: &Path) -> PipelineResult<RocCurve> {
        let args: Vec<OsString> = vec![
            "--model".into(),
            model.into(),
            "--test-file".into(),
            test_data.into(),
            "--roc-file".into(),
            roc_report.into(),
        ];
        self.command
            .run(&args, OutputMode::Capture, None)
            .await
            .map_err(|e| PipelineError::collaborator("evaluator", e.to_string()))?;

        if !roc_report.is_file() {
            return Err(PipelineError::collaborator(
                "evaluator",
                format!("no ROC report written to {}", roc_report.display()),
            ));
        }
        parse_roc_report(roc_report)
    }
}

/// Runs `<cmd> --model <m>` with the curves as JSON on stdin.
#[derive(Debug, Clone)]
pub struct CommandVisualizer {
    command: ExternalCommand,
}

impl CommandVisualizer {
    #[must_use]
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Visualizer for CommandVisualizer {
    async fn show(&self, curves: &BTreeMap<RunIdentifier, RocCurve>, model: &Path) -> PipelineResult<()> {
        let payload = serde_json::to_vec(curves)?;
        self.command
            .run(&[OsString::from("--model"), model.into()], OutputMode::Inherit, Some(payload.as_slice()))
            .await
            .map(|_| ())
            .map_err(|e| PipelineError::collaborator("visualizer", e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct CommandAdaptiveTest {
    command: ExternalCommand,
}

impl CommandAdaptiveTest {
    #[must_use]
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl AdaptiveTest for CommandAdaptiveTest {
    async fn run(&self, model: &Path) -> PipelineResult<()> {
        self.command
            .run(&[OsString::from("-i"), model.into()], OutputMode::Inherit, None)
            .await
            .map(|_| ())
            .map_err(|e| PipelineError::collaborator("adaptive test", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_roc_report() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("roc");
        std::fs::write(&path, "# fpr,tpr\n0.0,0.0\n0.25 0.6\n\n1,1\n").unwrap();

        let curve = parse_roc_report(&path).unwrap();
        assert_eq!(curve.len(), 3);
        assert_eq!(curve[1], RocPoint { false_positive_rate: 0.25, true_positive_rate: 0.6 });
    }

    #[test]
    fn test_parse_roc_report_rejects_malformed_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("roc");

        std::fs::write(&path, "0.1,0.2,0.3\n").unwrap();
        assert!(matches!(parse_roc_report(&path), Err(PipelineError::RocParse { .. })));

        std::fs::write(&path, "0.1,nan\n").unwrap();
        assert!(matches!(parse_roc_report(&path), Err(PipelineError::RocParse { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_evaluator_reads_written_report() {
        let temp = TempDir::new().unwrap();
        let roc = temp.path().join("roc");
        // Writes the value following --roc-file.
        let script = r#"while [ $# -gt 0 ]; do if [ "$1" = "--roc-file" ]; then printf '0,0\n1,1\n' > "$2"; fi; shift; done"#;
        let evaluator = CommandEvaluator::new(ExternalCommand::new(["sh", "-c", script, "eval"]));

        let curve = evaluator.evaluate(Path::new("model.json"), Path::new("test.responses"), &roc).await.unwrap();
        assert_eq!(curve.len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_evaluator_without_report_fails() {
        let temp = TempDir::new().unwrap();
        let evaluator = CommandEvaluator::new(ExternalCommand::new(["true"]));

        let err = evaluator
            .evaluate(Path::new("model.json"), Path::new("test.responses"), &temp.path().join("roc"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Collaborator { name: "evaluator", .. }));
    }
}
