//! Single-target prediction and the parallel batch engine.
//!
//! A prediction is a linear scan over candidate entities: every candidate
//! that rated the target item is scored against the target, the strongest K
//! are kept, and their ratings are aggregated. Predictions only read the
//! matrix, so a batch is split into chunks that run on tokio's blocking pool
//! against the same `Arc`-shared snapshot.

use crate::error::{AppError, Result};
use crate::models::{Cell, HeldOutCell, Prediction};
use crate::services::aggregation::PredictionAggregator;
use crate::services::matrix::RatingMatrix;
use crate::services::neighbors::TopKSelector;
use crate::services::similarity::SimilarityFunction;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Default number of targets handed to one blocking task
pub const DEFAULT_CHUNK_SIZE: usize = 256;

pub struct Predictor {
    matrix: Arc<RatingMatrix>,
    similarity: Arc<dyn SimilarityFunction>,
    aggregator: PredictionAggregator,
    /// Entities allowed to act as neighbors
    candidates: Range<usize>,
    neighbor_count: usize,
}

impl Predictor {
    pub fn new(
        matrix: Arc<RatingMatrix>,
        similarity: Arc<dyn SimilarityFunction>,
        candidates: Range<usize>,
        neighbor_count: usize,
    ) -> Self {
        let aggregator = PredictionAggregator::new(similarity.aggregation());
        let end = candidates.end.min(matrix.entity_count());
        let candidates = candidates.start.min(end)..end;

        Self {
            matrix,
            similarity,
            aggregator,
            candidates,
            neighbor_count,
        }
    }

    /// Scan candidates in ascending id order and keep the strongest K.
    ///
    /// A candidate is eligible when it is not the target, has a concrete
    /// rating for the target item, and shares at least one co-rated
    /// dimension with the target.
    pub fn select_neighbors(&self, target: Cell) -> TopKSelector {
        let mut selector = TopKSelector::new(self.neighbor_count, self.similarity.ranking());

        for candidate in self.candidates.clone() {
            if candidate == target.entity || !self.matrix.is_concrete(candidate, target.item) {
                continue;
            }
            if let Some(score) = self.similarity.score(&self.matrix, target.entity, candidate) {
                selector.offer(candidate, score);
            }
        }

        selector
    }

    pub fn predict(&self, target: &HeldOutCell) -> Result<Prediction> {
        let cell = target.cell;
        if !self.matrix.contains(cell) {
            return Err(AppError::IndexOutOfRange {
                entity: cell.entity,
                item: cell.item,
            });
        }

        let neighbors = self.select_neighbors(cell).into_neighbors();
        let aggregated = self.aggregator.aggregate(&self.matrix, cell, &neighbors)?;

        debug!(
            entity = cell.entity,
            item = cell.item,
            neighbors = neighbors.len(),
            raw = aggregated.raw,
            rating = aggregated.rating,
            "Prediction computed"
        );

        Ok(Prediction {
            cell,
            user_id: target.user_id,
            item_id: target.item_id,
            rating: aggregated.rating,
            raw: aggregated.raw,
            actual: target.actual,
            neighbors_used: neighbors.len(),
            fell_back: aggregated.fell_back,
        })
    }
}

/// A target whose prediction could not be placed on the rating scale
#[derive(Debug)]
pub struct Rejection {
    pub target: HeldOutCell,
    pub error: AppError,
}

/// Predictions of a batch plus the targets that could not be placed on the scale
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub predictions: Vec<Prediction>,
    pub rejected: Vec<Rejection>,
}

impl BatchOutcome {
    pub fn fallbacks(&self) -> usize {
        self.predictions.iter().filter(|p| p.fell_back).count()
    }
}

/// Runs a batch of independent predictions in parallel
pub struct PredictionEngine {
    predictor: Arc<Predictor>,
    chunk_size: usize,
}

impl PredictionEngine {
    pub fn new(predictor: Predictor, chunk_size: usize) -> Self {
        Self {
            predictor: Arc::new(predictor),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Predict every target; output keeps input order.
    ///
    /// Out-of-scale predictions are collected as rejected targets; any other
    /// error aborts the batch.
    pub async fn predict_batch(&self, targets: Vec<HeldOutCell>) -> Result<BatchOutcome> {
        let start = Instant::now();
        let total = targets.len();

        let handles: Vec<_> = targets
            .chunks(self.chunk_size)
            .map(|chunk| {
                let predictor = self.predictor.clone();
                let chunk = chunk.to_vec();
                tokio::task::spawn_blocking(move || {
                    chunk
                        .into_iter()
                        .map(|target| {
                            let result = predictor.predict(&target);
                            (target, result)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut outcome = BatchOutcome {
            predictions: Vec::with_capacity(total),
            rejected: Vec::new(),
        };

        for handle in handles {
            for (target, result) in handle.await? {
                match result {
                    Ok(prediction) => outcome.predictions.push(prediction),
                    Err(error) if !error.is_fatal() => {
                        error!(
                            user_id = target.user_id,
                            item_id = target.item_id,
                            error = %error,
                            "Prediction rejected"
                        );
                        outcome.rejected.push(Rejection { target, error });
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        info!(
            targets = total,
            predicted = outcome.predictions.len(),
            rejected = outcome.rejected.len(),
            fallbacks = outcome.fallbacks(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Prediction batch completed"
        );

        Ok(outcome)
    }
}
