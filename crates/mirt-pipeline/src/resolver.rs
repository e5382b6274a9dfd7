//! Selection of the canonical artifact from a run's snapshot files.
//!
//! Trainers embed a monotonically increasing marker (iteration or epoch) as
//! the final `_`-delimited token of each snapshot name. The resolver orders
//! candidates by that token and picks the greatest. How tokens compare is a
//! pluggable [`ArtifactOrdering`].

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const SEGMENT_SEPARATOR: char = '_';

/// Trailing `_`-delimited segment of a snapshot file name.
#[must_use]
pub fn sort_key(file_name: &str) -> &str {
    file_name.rsplit(SEGMENT_SEPARATOR).next().unwrap_or(file_name)
}

pub trait ArtifactOrdering: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Compare two snapshot file names; the greatest one is selected.
    fn compare(&self, a: &str, b: &str) -> Ordering;

    /// Hook to flag listings this ordering is known to mishandle.
    fn inspect(&self, _file_names: &[String]) {}
}

/// Byte-wise comparison of the trailing segment. Only agrees with numeric
/// order when counters are zero-padded to a fixed width.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicographicSuffix;

impl ArtifactOrdering for LexicographicSuffix {
    fn name(&self) -> &'static str {
        "lexicographic"
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        sort_key(a).cmp(sort_key(b)).then_with(|| a.cmp(b))
    }

    fn inspect(&self, file_names: &[String]) {
        let mut widths = file_names.iter().filter_map(|n| leading_digits(sort_key(n))).map(str::len);
        if let Some(first) = widths.next() {
            if widths.any(|w| w != first) {
                tracing::warn!(
                    "snapshot counters have unequal widths; lexicographic selection may not pick the highest counter"
                );
            }
        }
    }
}

/// Compares the leading digits of the trailing segment as numbers, falling
/// back to lexicographic order when either side has none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericSuffix;

impl ArtifactOrdering for NumericSuffix {
    fn name(&self) -> &'static str {
        "numeric"
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        let numeric = |name: &str| leading_digits(sort_key(name)).and_then(|d| d.parse::<u128>().ok());
        match (numeric(a), numeric(b)) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| LexicographicSuffix.compare(a, b)),
            _ => LexicographicSuffix.compare(a, b),
        }
    }
}

fn leading_digits(segment: &str) -> Option<&str> {
    let end = segment.find(|c: char| !c.is_ascii_digit()).unwrap_or(segment.len());
    (end > 0).then(|| &segment[..end])
}

/// Config-facing choice of ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    #[default]
    Lexicographic,
    Numeric,
}

impl OrderingPolicy {
    #[must_use]
    pub fn strategy(self) -> Box<dyn ArtifactOrdering> {
        match self {
            Self::Lexicographic => Box::new(LexicographicSuffix),
            Self::Numeric => Box::new(NumericSuffix),
        }
    }
}

#[derive(Debug)]
pub struct ArtifactResolver {
    ordering: Box<dyn ArtifactOrdering>,
}

impl Default for ArtifactResolver {
    fn default() -> Self {
        Self::new(Box::new(LexicographicSuffix))
    }
}

impl ArtifactResolver {
    #[must_use]
    pub fn new(ordering: Box<dyn ArtifactOrdering>) -> Self {
        Self { ordering }
    }

    /// Select the canonical artifact in `directory`.
    ///
    /// Only regular files are candidates. A missing or empty directory means
    /// the trainer emitted nothing.
    pub fn resolve(&self, directory: &Path) -> PipelineResult<PathBuf> {
        let entries = match std::fs::read_dir(directory) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::NoArtifactsProduced(directory.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        // Lossy names are only sort keys; the real file name is what gets returned.
        let mut candidates: Vec<(String, OsString)> = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let file_name = entry.file_name();
                candidates.push((file_name.to_string_lossy().into_owned(), file_name));
            }
        }

        let names: Vec<String> = candidates.iter().map(|(name, _)| name.clone()).collect();
        self.ordering.inspect(&names);
        candidates.sort_by(|(a, _), (b, _)| self.ordering.compare(a, b));
        let (selected, file_name) =
            candidates.pop().ok_or_else(|| PipelineError::NoArtifactsProduced(directory.to_path_buf()))?;

        tracing::debug!("selected {selected} from {} using {} ordering", directory.display(), self.ordering.name());
        Ok(directory.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_with(files: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for f in files {
            std::fs::write(temp.path().join(f), f.as_bytes()).unwrap();
        }
        temp
    }

    fn selected(resolver: &ArtifactResolver, dir: &TempDir) -> String {
        resolver.resolve(dir.path()).unwrap().file_name().unwrap().to_string_lossy().into_owned()
    }

    #[test]
    fn test_unpadded_suffixes_sort_lexicographically() {
        let dir = dir_with(&["a_1", "a_2", "a_10"]);
        assert_eq!(selected(&ArtifactResolver::default(), &dir), "a_2");
    }

    #[test]
    fn test_padded_suffixes_pick_highest() {
        let dir = dir_with(&["a_01", "a_02", "a_10"]);
        assert_eq!(selected(&ArtifactResolver::default(), &dir), "a_10");
    }

    #[test]
    fn test_numeric_ordering_handles_unpadded_suffixes() {
        let dir = dir_with(&["a_1", "a_2", "a_10.npz", "a_9.npz"]);
        let resolver = ArtifactResolver::new(OrderingPolicy::Numeric.strategy());
        assert_eq!(selected(&resolver, &dir), "a_10.npz");
    }

    #[test]
    fn test_only_trailing_segment_is_compared() {
        let dir = dir_with(&["zzz_epoch_0001", "aaa_epoch_0002"]);
        assert_eq!(selected(&ArtifactResolver::default(), &dir), "aaa_epoch_0002");
    }

    #[test]
    fn test_empty_directory_fails() {
        let dir = dir_with(&[]);
        std::fs::create_dir(dir.path().join("nested_99")).unwrap();
        let err = ArtifactResolver::default().resolve(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::NoArtifactsProduced(_)));
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = dir_with(&[]);
        let err = ArtifactResolver::default().resolve(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, PipelineError::NoArtifactsProduced(_)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_snapshot_name_resolves_to_real_file() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = dir_with(&["snap_0000"]);
        let raw = OsStr::from_bytes(b"snap_\xff0001");
        std::fs::write(dir.path().join(raw), b"latest").unwrap();

        let resolved = ArtifactResolver::default().resolve(dir.path()).unwrap();
        assert_eq!(resolved.file_name(), Some(raw));
        assert_eq!(std::fs::read(&resolved).unwrap(), b"latest");

        let dest = dir.path().join("model.json");
        crate::artifacts::promote_artifact(&resolved, &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"latest");
    }

    #[test]
    fn test_resolution_is_deterministic_on_equal_keys() {
        let dir = dir_with(&["b_7", "a_7", "c_7"]);
        assert_eq!(selected(&ArtifactResolver::default(), &dir), "c_7");
    }
}
