//! Prediction Service - batch entry point
//!
//! Neighborhood collaborative filtering over a flat-file rating corpus.
//!
//! # Modes
//! - `evaluate` (default): holdout RMSE for the configured similarity variant
//! - `compare`: holdout RMSE for every variant, persisted as a JSON run report
//! - `predict`: fill in the unknown ratings of each held-out triplet file

use anyhow::{Context, Result};
use prediction_service::jobs::{run_evaluation_job, run_prediction_job};
use prediction_service::Config;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Service run mode
#[derive(Debug, Clone, PartialEq)]
enum RunMode {
    Evaluate,
    Compare,
    Predict,
}

impl RunMode {
    fn from_args() -> Self {
        let args: Vec<String> = env::args().collect();

        for i in 0..args.len() {
            if args[i] == "--mode" && i + 1 < args.len() {
                return match args[i + 1].as_str() {
                    "evaluate" => RunMode::Evaluate,
                    "compare" => RunMode::Compare,
                    "predict" => RunMode::Predict,
                    _ => {
                        warn!("Unknown mode '{}', using default 'evaluate'", args[i + 1]);
                        RunMode::Evaluate
                    }
                };
            }
        }

        RunMode::Evaluate
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "prediction_service=info,info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_thread_names(true)
                    .with_target(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first: it decides the log format
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.json_logs());

    config.validate().context("Invalid configuration")?;

    let mode = RunMode::from_args();
    info!(
        mode = ?mode,
        ratings = %config.ratings_path,
        similarity = config.similarity.as_str(),
        orientation = config.orientation.as_str(),
        neighbors = config.neighbor_count,
        "Starting prediction service"
    );

    match mode {
        RunMode::Evaluate => run_evaluation_job(config, false)
            .await
            .context("Evaluation job failed")?,
        RunMode::Compare => run_evaluation_job(config, true)
            .await
            .context("Compare job failed")?,
        RunMode::Predict => run_prediction_job(config)
            .await
            .context("Prediction job failed")?,
    }

    Ok(())
}
