//! MIRT CLI - Command-line interface for the MIRT training pipeline
//!
//! Takes a response file all the way to a trained parameter file: optional
//! fake-data generation, EM training, ROC visualization and an adaptive test.

mod commands;
mod config;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use mirt_pipeline::{RunConfiguration, RunParameters, Stage, StageSet};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// MIRT pipeline - train multidimensional item response theory models
///
/// Select one or more tasks; they always run in the order
/// generate, train, visualize, test.
#[derive(Parser, Debug)]
#[command(
    name = "mirt",
    author,
    version,
    about = "Train and evaluate MIRT models from student response data",
    long_about = "Takes you from a file of student responses to trained item parameters.\nTasks run in the fixed order generate -> train -> visualize -> test."
)]
struct Args {
    /// Generate fake training data
    #[arg(long)]
    generate: bool,

    /// Train a model from training data
    #[arg(long)]
    train: bool,

    /// Visualize a trained model
    #[arg(long)]
    visualize: bool,

    /// Take an adaptive test from a trained model
    #[arg(long)]
    test: bool,

    /// File holding the response data of interest
    #[arg(short = 'd', long = "data_file", default_value = "sample_data/all.responses")]
    data_file: PathBuf,

    /// The dimensionality/number of abilities
    #[arg(short = 'a', long, default_value_t = 1)]
    abilities: u32,

    /// Number of students to generate data for (generation only)
    #[arg(short = 's', long = "num_students", default_value_t = 500)]
    num_students: u32,

    /// Number of problems to generate data for (generation only)
    #[arg(short = 'p', long = "num_problems", default_value_t = 10)]
    num_problems: u32,

    /// Model response times
    #[arg(short = 't', long)]
    time: bool,

    /// Number of processes the trainer may use
    #[arg(short = 'w', long, default_value_t = 1)]
    workers: u32,

    /// Number of EM iterations to run
    #[arg(short = 'n', long = "num_epochs", default_value_t = 100)]
    num_epochs: u32,

    /// Directory for models and other output
    #[arg(short = 'o', long = "model_directory", default_value = "sample_data/models")]
    model_directory: PathBuf,

    /// Model location (written when training, read when visualizing or testing)
    #[arg(short = 'm', long, default_value = "sample_data/models/model.json")]
    model: PathBuf,

    /// Configuration file (defaults to ./.mirtrc over ~/.mirt/config.toml)
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// List previous training runs under the model directory and exit
    #[arg(long, conflicts_with_all = ["generate", "train", "visualize", "test"])]
    list_runs: bool,

    /// Print --list-runs output as JSON
    #[arg(long, requires = "list_runs")]
    json: bool,
}

impl Args {
    fn stages(&self) -> StageSet {
        [
            (self.generate, Stage::Generate),
            (self.train, Stage::Train),
            (self.visualize, Stage::Visualize),
            (self.test, Stage::Test),
        ]
        .into_iter()
        .filter_map(|(selected, stage)| selected.then_some(stage))
        .collect()
    }

    fn run_parameters(&self) -> RunParameters {
        RunParameters {
            data_file: self.data_file.clone(),
            model_directory: self.model_directory.clone(),
            model_path: self.model.clone(),
            abilities: self.abilities,
            num_students: self.num_students,
            num_problems: self.num_problems,
            time_mode: self.time,
            workers: self.workers,
            num_epochs: self.num_epochs,
            stages: self.stages(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = config::load_settings(args.config.as_deref())?;

    // Initialize tracing
    let level = match args.log_level.as_deref().or(settings.log_level.as_deref()).unwrap_or("info") {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.list_runs {
        return commands::runs::execute(&args.model_directory, args.json);
    }

    // Nothing requested: show guidance and leave the filesystem alone.
    if args.stages().is_empty() {
        println!("\nMust specify at least one task (--generate, --train, --visualize, --test).\n");
        Args::command().print_help()?;
        println!();
        return Ok(());
    }

    let run_config = RunConfiguration::new(args.run_parameters()).context("Invalid run configuration")?;
    commands::pipeline::execute(run_config, &settings).await
}
