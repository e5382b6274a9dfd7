//! Pipeline command implementation.

use colored::Colorize;
use mirt_pipeline::{PipelineDriver, PipelineSettings, RunConfiguration, Stage};

pub async fn execute(config: RunConfiguration, settings: &PipelineSettings) -> anyhow::Result<()> {
    let driver = PipelineDriver::new(config, settings.collaborators());
    let summary = driver.run().await?;

    println!();
    println!("{}", "Pipeline complete".bold().green());
    println!("  Run: {}", summary.run_id.as_str().cyan());
    let stages: Vec<&str> = summary.completed.iter().map(|s| s.as_str()).collect();
    println!("  Stages: {}", stages.join(" -> "));

    if let Some(report) = &summary.generated {
        println!(
            "  Generated: {} students, {} problems -> {}",
            report.students,
            report.problems,
            report.data_file.display().to_string().dimmed()
        );
    }
    if let Some(manifest) = &summary.trained {
        println!("  Model: {}", manifest.model_path.display().to_string().cyan());
        println!("  Snapshot: {}", manifest.canonical_artifact.display().to_string().dimmed());
        println!("  SHA-256: {}", manifest.model_sha256.dimmed());
    }
    if let Some(curve) = &summary.roc_curve {
        println!(
            "  ROC: {} points -> {}",
            curve.len(),
            driver.layout().roc_report_path().display().to_string().dimmed()
        );
    }
    if summary.completed.contains(&Stage::Train) && !summary.completed.contains(&Stage::Test) {
        println!();
        println!("  {}", "Tip: run with --test to take an adaptive test against this model.".dimmed());
    }
    println!();
    Ok(())
}
