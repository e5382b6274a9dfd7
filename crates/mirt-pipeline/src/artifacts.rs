use crate::config::RunConfiguration;
use crate::error::{PipelineError, PipelineResult};
use crate::layout::{ensure_dir, RunLayout, MANIFESTS_DIR};
use crate::naming::RunIdentifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Record of a completed training run, written next to (never inside) the
/// artifact directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunIdentifier,
    pub created_at: DateTime<Utc>,
    pub abilities: u32,
    pub time_mode: bool,
    pub workers: u32,
    pub num_epochs: u32,
    pub canonical_artifact: PathBuf,
    pub model_path: PathBuf,
    pub model_sha256: String,
}

impl RunManifest {
    #[must_use]
    pub fn new(
        config: &RunConfiguration,
        layout: &RunLayout,
        canonical_artifact: PathBuf,
        model_sha256: String,
    ) -> Self {
        Self {
            run_id: layout.run_id().clone(),
            created_at: config.created_at(),
            abilities: config.abilities(),
            time_mode: config.time_mode(),
            workers: config.workers(),
            num_epochs: config.num_epochs(),
            canonical_artifact,
            model_path: layout.model_path().to_path_buf(),
            model_sha256,
        }
    }

    pub fn write(&self, path: &Path) -> PipelineResult<()> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        write_atomic(path, serde_json::to_string_pretty(self)?.as_bytes())
    }

    pub fn read(path: &Path) -> PipelineResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

pub fn sha256_file(path: &Path) -> PipelineResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Replace `path` with `bytes` via a sibling temp file and rename, so readers
/// see either the old contents or the new ones.
///
/// An existing file keeps its permissions; a new one gets regular file
/// permissions rather than the temp file's owner-only mode.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> PipelineResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let permissions = match std::fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => new_file_permissions(),
        Err(e) => return Err(e.into()),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    if let Some(permissions) = permissions {
        tmp.as_file().set_permissions(permissions)?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PipelineError::Io(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn new_file_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<std::fs::Permissions> {
    None
}

/// Copy `artifact` to `destination` atomically, creating the destination's
/// parent directory if needed. The source is left in place.
pub fn promote_artifact(artifact: &Path, destination: &Path) -> PipelineResult<String> {
    if !artifact.is_file() {
        return Err(PipelineError::NoArtifactsProduced(
            artifact.parent().map(Path::to_path_buf).unwrap_or_default(),
        ));
    }
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let bytes = std::fs::read(artifact)?;
    write_atomic(destination, &bytes)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// All run manifests under `model_directory`, newest first.
pub fn discover_runs(model_directory: &Path) -> PipelineResult<Vec<RunManifest>> {
    let dir = match std::fs::read_dir(model_directory.join(MANIFESTS_DIR)) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut out = Vec::new();
    for entry in dir {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match RunManifest::read(&path) {
            Ok(manifest) => out.push(manifest),
            Err(e) => tracing::warn!("skipping unreadable run manifest {}: {e}", path.display()),
        }
    }

    out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.run_id.cmp(&a.run_id)));
    Ok(out)
}
