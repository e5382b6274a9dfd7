//! CLI configuration loading and merging.

use anyhow::Context;
use mirt_pipeline::PipelineSettings;
use std::path::Path;

/// Load pipeline settings.
///
/// Configuration precedence:
/// 1. CLI arguments (handled by clap)
/// 2. Explicit `--config` file, when given (replaces 3 and 4)
/// 3. Local config file (./.mirtrc)
/// 4. Global config file (~/.mirt/config.toml)
/// 5. Defaults
pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<PipelineSettings> {
    match explicit {
        Some(path) => PipelineSettings::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => PipelineSettings::discover_and_load().context("Failed to load configuration"),
    }
}
