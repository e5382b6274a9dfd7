use crate::artifacts::write_atomic;
use crate::error::{PipelineError, PipelineResult};
use crate::layout::{TEST_SPLIT_FILE, TRAIN_SPLIT_FILE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Partitions a response file into `train.responses` and `test.responses`
/// under an output directory.
pub trait DatasetSplitter: Send + Sync {
    fn split(&self, source: &Path, output_dir: &Path) -> PipelineResult<SplitSummary>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSummary {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub train_rows: usize,
    pub test_rows: usize,
    pub students: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    /// Every n-th student (in first-appearance order) goes to the test side.
    pub holdout_every: usize,
    pub min_rows_per_side: usize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self { holdout_every: 10, min_rows_per_side: 1 }
    }
}

/// Splits comma-separated response rows by student so that one student's
/// responses never appear on both sides.
#[derive(Debug, Clone, Default)]
pub struct ResponseFileSplitter {
    options: SplitOptions,
}

impl ResponseFileSplitter {
    #[must_use]
    pub fn new(options: SplitOptions) -> Self {
        Self { options }
    }
}

impl DatasetSplitter for ResponseFileSplitter {
    fn split(&self, source: &Path, output_dir: &Path) -> PipelineResult<SplitSummary> {
        if self.options.holdout_every < 2 {
            return Err(PipelineError::InvalidConfiguration("split.holdout_every must be >= 2".to_string()));
        }
        if !source.is_file() {
            return Err(PipelineError::MissingDataFile(source.to_path_buf()));
        }

        let contents = std::fs::read_to_string(source)?;
        let mut student_index: HashMap<&str, usize> = HashMap::new();
        let mut train = String::new();
        let mut test = String::new();
        let (mut train_rows, mut test_rows) = (0usize, 0usize);

        for line in contents.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let student = trimmed.split(',').next().unwrap_or(trimmed).trim();
            let next = student_index.len();
            let idx = *student_index.entry(student).or_insert(next);

            if (idx + 1) % self.options.holdout_every == 0 {
                test.push_str(line);
                test.push('\n');
                test_rows += 1;
            } else {
                train.push_str(line);
                train.push('\n');
                train_rows += 1;
            }
        }

        let min = self.options.min_rows_per_side;
        if train_rows < min || test_rows < min {
            return Err(PipelineError::InsufficientData(format!(
                "{} split into {train_rows} train / {test_rows} test rows across {} students; need at least {min} on each side",
                source.display(),
                student_index.len()
            )));
        }

        let train_path = output_dir.join(TRAIN_SPLIT_FILE);
        let test_path = output_dir.join(TEST_SPLIT_FILE);
        write_atomic(&train_path, train.as_bytes())?;
        write_atomic(&test_path, test.as_bytes())?;

        tracing::debug!("split {} into {train_rows} train / {test_rows} test rows", source.display());
        Ok(SplitSummary { train_path, test_path, train_rows, test_rows, students: student_index.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_responses(dir: &Path, students: usize, rows_per_student: usize) -> PathBuf {
        let mut out = String::from("# student,exercise,time,correct\n");
        for s in 0..students {
            for r in 0..rows_per_student {
                out.push_str(&format!("s{s},ex{r},12.5,{}\n", (s + r) % 2));
            }
        }
        let path = dir.join("all.responses");
        std::fs::write(&path, out).unwrap();
        path
    }

    #[test]
    fn test_split_keeps_students_on_one_side() {
        let temp = TempDir::new().unwrap();
        let source = write_responses(temp.path(), 20, 3);

        let summary = ResponseFileSplitter::default().split(&source, temp.path()).unwrap();
        assert_eq!(summary.students, 20);
        assert_eq!(summary.test_rows, 6);
        assert_eq!(summary.train_rows, 54);

        let test = std::fs::read_to_string(&summary.test_path).unwrap();
        let train = std::fs::read_to_string(&summary.train_path).unwrap();
        for line in test.lines() {
            let student = line.split(',').next().unwrap();
            assert!(!train.lines().any(|l| l.starts_with(&format!("{student},"))));
        }
    }

    #[test]
    fn test_split_rejects_too_few_students() {
        let temp = TempDir::new().unwrap();
        let source = write_responses(temp.path(), 3, 5);

        let err = ResponseFileSplitter::default().split(&source, temp.path()).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(_)));
        assert!(!temp.path().join(TRAIN_SPLIT_FILE).exists());
    }

    #[test]
    fn test_split_honors_min_rows_per_side() {
        let temp = TempDir::new().unwrap();
        let source = write_responses(temp.path(), 10, 1);
        let splitter = ResponseFileSplitter::new(SplitOptions { holdout_every: 10, min_rows_per_side: 2 });

        assert!(matches!(splitter.split(&source, temp.path()), Err(PipelineError::InsufficientData(_))));
    }

    #[test]
    fn test_split_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = ResponseFileSplitter::default()
            .split(&temp.path().join("missing.responses"), temp.path())
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingDataFile(_)));
    }
}
