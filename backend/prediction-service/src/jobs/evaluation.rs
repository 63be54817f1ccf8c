// ============================================
// Holdout Evaluation Job
// ============================================
//
// Scores the configured similarity variant (or all of them in compare mode)
// against ratings that already exist in the corpus.
//
// Workflow:
// 1. Load the training corpus and orient it (items become rows for item-based runs)
// 2. Every concrete rating of the test segment becomes a target
// 3. Only training-segment entities may act as neighbors
// 4. Report RMSE per variant; compare mode persists a JSON run report
//
// The targets' own ratings stay visible while they are predicted, so a test
// entity's mean includes the value being predicted.
//
// Usage:
//   prediction-service --mode evaluate
//   prediction-service --mode compare

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Cell, HeldOutCell, Orientation, RunReport, SimilarityKind, VariantReport};
use crate::services::evaluation::Evaluator;
use crate::services::matrix::RatingMatrix;
use crate::services::predictor::{PredictionEngine, Predictor};
use crate::services::similarity::build_similarity;
use crate::storage::{FlatFileSource, RatingSource};
use chrono::Utc;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

/// File name of the persisted compare report inside `output_dir`
pub const RUN_REPORT_FILE: &str = "run_report.json";

pub struct EvaluationJob {
    config: Config,
}

impl EvaluationJob {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Training corpus in the configured orientation
    pub async fn load_matrix(&self) -> Result<RatingMatrix> {
        let source = FlatFileSource::new(
            &self.config.ratings_path,
            self.config.user_count,
            self.config.item_count,
        );
        let matrix = source.load().await?;

        Ok(match self.config.orientation {
            Orientation::UserBased => matrix,
            Orientation::ItemBased => matrix.transpose(),
        })
    }

    /// Predict every test-segment rating with one variant and score it
    pub async fn evaluate(
        &self,
        matrix: Arc<RatingMatrix>,
        kind: SimilarityKind,
    ) -> Result<VariantReport> {
        let start = Instant::now();
        let (train, test) = self.config.segments();
        let targets = holdout_targets(&matrix, test, self.config.orientation);

        info!(
            similarity = kind.as_str(),
            orientation = self.config.orientation.as_str(),
            targets = targets.len(),
            neighbors = self.config.neighbor_count,
            "Starting holdout evaluation"
        );

        let similarity = build_similarity(kind, self.config.case_exponent, &matrix);
        let predictor = Predictor::new(matrix, similarity, train, self.config.neighbor_count);
        let engine = PredictionEngine::new(predictor, self.config.prediction_chunk_size);

        let outcome = engine.predict_batch(targets).await?;

        let mut evaluator = Evaluator::new();
        evaluator.record_many(outcome.predictions.iter().map(|p| (p.rating, p.actual)));
        let metrics = evaluator.report()?;

        let report = VariantReport {
            similarity: kind,
            orientation: self.config.orientation,
            predicted: outcome.predictions.len(),
            rejected: outcome.rejected.len(),
            fallbacks: outcome.fallbacks(),
            rmse: metrics.rmse,
            mae: metrics.mae,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            similarity = kind.as_str(),
            rmse = report.rmse,
            mae = report.mae,
            predicted = report.predicted,
            rejected = report.rejected,
            duration_ms = report.duration_ms,
            "Holdout evaluation completed"
        );

        Ok(report)
    }

    /// Evaluate the configured variant
    pub async fn run(&self) -> Result<VariantReport> {
        let matrix = Arc::new(self.load_matrix().await?);
        self.evaluate(matrix, self.config.similarity).await
    }

    /// Evaluate all variants on the same matrix and persist a run report
    pub async fn compare(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        let matrix = Arc::new(self.load_matrix().await?);

        let mut variants = Vec::with_capacity(SimilarityKind::ALL.len());
        for kind in SimilarityKind::ALL {
            variants.push(self.evaluate(matrix.clone(), kind).await?);
        }

        let report = RunReport {
            run_id: Uuid::new_v4(),
            started_at,
            completed_at: Utc::now(),
            ratings_path: self.config.ratings_path.clone(),
            neighbor_count: self.config.neighbor_count,
            variants,
        };

        let path = self.write_report(&report).await?;
        info!(
            run_id = %report.run_id,
            path = %path.display(),
            "Run report written"
        );

        Ok(report)
    }

    async fn write_report(&self, report: &RunReport) -> Result<PathBuf> {
        let dir = PathBuf::from(&self.config.output_dir);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::io(&dir, e))?;

        let path = dir.join(RUN_REPORT_FILE);
        let body = serde_json::to_vec_pretty(report)?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| AppError::io(&path, e))?;

        Ok(path)
    }
}

/// Every concrete rating of the `test` entities, labelled with 1-based
/// user-major ids and its value as ground truth
pub fn holdout_targets(
    matrix: &RatingMatrix,
    test: Range<usize>,
    orientation: Orientation,
) -> Vec<HeldOutCell> {
    let end = test.end.min(matrix.entity_count());
    let start = test.start.min(end);

    (start..end)
        .flat_map(|entity| {
            matrix
                .concrete_ratings(entity)
                .map(move |(item, value)| (Cell::new(entity, item), value))
        })
        .map(|(cell, value)| {
            let (user, item) = match orientation {
                Orientation::UserBased => (cell.entity, cell.item),
                Orientation::ItemBased => (cell.item, cell.entity),
            };
            HeldOutCell {
                cell,
                user_id: user as u32 + 1,
                item_id: item as u32 + 1,
                actual: Some(value as u8),
            }
        })
        .collect()
}

/// Entry point for `--mode evaluate` and `--mode compare`
pub async fn run_evaluation_job(config: Config, compare: bool) -> Result<()> {
    let job = EvaluationJob::new(config);

    if compare {
        let report = job.compare().await?;
        for variant in &report.variants {
            info!(
                similarity = variant.similarity.as_str(),
                rmse = variant.rmse,
                "Variant RMSE"
            );
        }
    } else {
        let report = job.run().await?;
        info!(
            similarity = report.similarity.as_str(),
            rmse = report.rmse,
            "Evaluation job completed"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_cover_concrete_test_cells_only() {
        let matrix = RatingMatrix::from_raw_rows(&[
            vec![5, 4, 0],
            vec![1, 0, 2],
            vec![0, 3, 4],
        ])
        .unwrap();

        let targets = holdout_targets(&matrix, 1..3, Orientation::UserBased);
        let cells: Vec<Cell> = targets.iter().map(|t| t.cell).collect();
        assert_eq!(
            cells,
            vec![Cell::new(1, 0), Cell::new(1, 2), Cell::new(2, 1), Cell::new(2, 2)]
        );
        assert_eq!(targets[0].actual, Some(1));
        assert_eq!((targets[3].user_id, targets[3].item_id), (3, 3));
    }

    #[test]
    fn test_item_based_targets_report_user_major_ids() {
        let matrix = RatingMatrix::from_raw_rows(&[vec![5, 0], vec![0, 2]])
            .unwrap()
            .transpose();

        let targets = holdout_targets(&matrix, 1..2, Orientation::ItemBased);
        assert_eq!(targets.len(), 1);
        // entity 1 is item 2; its only rating comes from user 2
        assert_eq!(targets[0].cell, Cell::new(1, 1));
        assert_eq!((targets[0].user_id, targets[0].item_id), (2, 2));
        assert_eq!(targets[0].actual, Some(2));
    }

    #[test]
    fn test_test_segment_is_clipped_to_matrix() {
        let matrix = RatingMatrix::from_raw_rows(&[vec![5, 4]]).unwrap();
        assert!(holdout_targets(&matrix, 3..10, Orientation::UserBased).is_empty());
    }
}
