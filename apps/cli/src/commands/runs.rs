//! Listing of past training runs.

use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use std::path::Path;

pub fn execute(model_directory: &Path, json_output: bool) -> anyhow::Result<()> {
    let runs = mirt_pipeline::discover_runs(model_directory)
        .with_context(|| format!("Failed to read runs under {}", model_directory.display()))?;

    if json_output {
        let out: Vec<_> = runs
            .iter()
            .map(|m| {
                json!({
                    "run_id": m.run_id,
                    "created_at": m.created_at,
                    "abilities": m.abilities,
                    "time_mode": m.time_mode,
                    "num_epochs": m.num_epochs,
                    "snapshot": m.canonical_artifact,
                    "model": m.model_path,
                    "sha256": m.model_sha256,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Training Runs ({})", runs.len()).bold().cyan());
    println!();

    if runs.is_empty() {
        println!("  {}", "No training runs found in this model directory.".dimmed());
        println!();
        println!("  {}", "Tip: run with --train to fit a model.".dimmed());
        return Ok(());
    }

    println!("{:<44} {:<10} {:<7} {}", "Run", "Abilities", "Epochs", "Snapshot");
    println!("{}", "─".repeat(100));
    for m in runs {
        println!(
            "{:<44} {:<10} {:<7} {}",
            m.run_id.as_str().cyan(),
            m.abilities,
            m.num_epochs,
            m.canonical_artifact.display().to_string().dimmed()
        );
    }
    println!();
    Ok(())
}
