// ============================================
// Held-out File Prediction Job
// ============================================
//
// Predicts the unknown ratings of test users supplied as triplet files and
// writes one result file per input (`test5.txt` -> `result5.txt`).
//
// Workflow:
// 1. Load the training corpus once
// 2. For each triplet file, append its users and mark the `0` cells pending
// 3. Predict every pending cell with the configured variant
// 4. Write `<user_id> <item_id> <rating>` lines sorted by user, then item
//
// Every pending cell must appear in the result file. A cell whose prediction
// cannot be placed on the scale fails the file before anything is written.
//
// Usage:
//   prediction-service --mode predict

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::Orientation;
use crate::services::matrix::RatingMatrix;
use crate::services::predictor::{PredictionEngine, Predictor};
use crate::services::similarity::build_similarity;
use crate::storage::{FlatFileSink, FlatFileSource, HoldoutFileSource, PredictionSink, RatingSource};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Per-file statistics of a prediction run
#[derive(Debug, Clone, Default)]
pub struct PredictionJobStats {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub holdout_path: String,
    pub result_path: PathBuf,
    pub targets: usize,
    pub predicted: usize,
    pub fallbacks: usize,
    pub total_duration_ms: u64,
}

pub struct PredictionJob {
    config: Config,
}

impl PredictionJob {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Process every configured triplet file in order
    pub async fn run(&self) -> Result<Vec<PredictionJobStats>> {
        let source = FlatFileSource::new(
            &self.config.ratings_path,
            self.config.user_count,
            self.config.item_count,
        );
        let train = source.load().await?;

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| AppError::io(&self.config.output_dir, e))?;

        let mut all_stats = Vec::with_capacity(self.config.holdout_paths.len());
        for holdout_path in &self.config.holdout_paths {
            let stats = self.predict_file(&train, holdout_path).await?;

            info!(
                holdout = %stats.holdout_path,
                result = %stats.result_path.display(),
                targets = stats.targets,
                predicted = stats.predicted,
                fallbacks = stats.fallbacks,
                duration_ms = stats.total_duration_ms,
                "Held-out file processed"
            );
            all_stats.push(stats);
        }

        Ok(all_stats)
    }

    async fn predict_file(
        &self,
        train: &RatingMatrix,
        holdout_path: &str,
    ) -> Result<PredictionJobStats> {
        let start_time = Instant::now();
        let mut stats = PredictionJobStats {
            started_at: Some(Utc::now()),
            holdout_path: holdout_path.to_string(),
            result_path: self.config.result_path(holdout_path),
            ..Default::default()
        };

        let set = HoldoutFileSource::new(holdout_path, self.config.holdout_users)
            .load(train)
            .await?
            .oriented(self.config.orientation);

        // Test users never serve as neighbors for user-based runs
        let candidates = match self.config.orientation {
            Orientation::UserBased => 0..train.entity_count(),
            Orientation::ItemBased => 0..set.matrix.entity_count(),
        };

        let matrix = Arc::new(set.matrix);
        stats.targets = set.targets.len();
        let similarity = build_similarity(self.config.similarity, self.config.case_exponent, &matrix);
        let predictor = Predictor::new(matrix, similarity, candidates, self.config.neighbor_count);
        let engine = PredictionEngine::new(predictor, self.config.prediction_chunk_size);

        let outcome = engine.predict_batch(set.targets).await?;

        if !outcome.rejected.is_empty() {
            let mut cells: Vec<(u32, u32)> = outcome
                .rejected
                .iter()
                .map(|r| (r.target.user_id, r.target.item_id))
                .collect();
            cells.sort_unstable();
            return Err(AppError::IncompleteResults {
                path: PathBuf::from(holdout_path),
                cells,
            });
        }

        let mut predictions = outcome.predictions;
        predictions.sort_by_key(|p| (p.user_id, p.item_id));

        FlatFileSink::new(&stats.result_path)
            .write(&predictions)
            .await?;

        stats.predicted = predictions.len();
        stats.fallbacks = predictions.iter().filter(|p| p.fell_back).count();
        stats.completed_at = Some(Utc::now());
        stats.total_duration_ms = start_time.elapsed().as_millis() as u64;

        Ok(stats)
    }
}

/// Entry point for `--mode predict`
pub async fn run_prediction_job(config: Config) -> Result<()> {
    info!(
        files = config.holdout_paths.len(),
        similarity = config.similarity.as_str(),
        orientation = config.orientation.as_str(),
        "Initializing prediction job"
    );

    let job = PredictionJob::new(config);
    let stats = job.run().await?;

    info!(
        files = stats.len(),
        predicted = stats.iter().map(|s| s.predicted).sum::<usize>(),
        fallbacks = stats.iter().map(|s| s.fallbacks).sum::<usize>(),
        "Prediction job completed"
    );

    Ok(())
}
