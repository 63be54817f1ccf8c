use crate::error::{AppError, Result};
use crate::models::{Cell, Neighbor, MAX_RATING, MIN_RATING};
use crate::services::matrix::RatingMatrix;
use tracing::debug;

/// Used when neither the neighbors nor the target's own history say anything
const SCALE_MIDPOINT: f64 = 3.0;

/// How a neighbor set becomes a rating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Σ(s·r) / Σ(s)
    WeightedMean,
    /// target_avg + Σ(s·(r − neighbor_avg)) / Σ|s|
    MeanCentered,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatedRating {
    pub rating: u8,
    /// Value before rounding and clamping
    pub raw: f64,
    /// Whether the weighted formula was degenerate and the fallback was used
    pub fell_back: bool,
}

/// Turns a neighbor set into a rating on the 1..=5 scale
#[derive(Debug, Clone, Copy)]
pub struct PredictionAggregator {
    aggregation: Aggregation,
}

impl PredictionAggregator {
    pub fn new(aggregation: Aggregation) -> Self {
        Self { aggregation }
    }

    /// Aggregate raw ratings of `neighbors` for `target.item`.
    ///
    /// Neighbors without a concrete rating for the item are skipped.
    pub fn aggregate(
        &self,
        matrix: &RatingMatrix,
        target: Cell,
        neighbors: &[Neighbor],
    ) -> Result<AggregatedRating> {
        let target_avg = matrix.entity_mean(target.entity);

        let weighted = match self.aggregation {
            Aggregation::WeightedMean => weighted_mean(matrix, target.item, neighbors),
            Aggregation::MeanCentered => {
                mean_centered(matrix, target.item, neighbors, target_avg.unwrap_or(f64::NAN))
            }
        };

        let (raw, fell_back) = if weighted.is_finite() {
            (weighted, false)
        } else {
            debug!(
                entity = target.entity,
                item = target.item,
                neighbors = neighbors.len(),
                "Degenerate aggregation, falling back to the target average"
            );
            (target_avg.unwrap_or(SCALE_MIDPOINT), true)
        };

        let rating = clamp_rating(raw).ok_or(AppError::PredictionOutOfRange {
            entity: target.entity,
            item: target.item,
            value: raw.round() as i64,
        })?;

        Ok(AggregatedRating {
            rating,
            raw,
            fell_back,
        })
    }
}

fn weighted_mean(matrix: &RatingMatrix, item: usize, neighbors: &[Neighbor]) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;

    for neighbor in neighbors {
        if let Some(rating) = matrix.rating(neighbor.entity, item).value() {
            weighted_sum += neighbor.score * rating;
            weight_sum += neighbor.score;
        }
    }

    weighted_sum / weight_sum
}

fn mean_centered(matrix: &RatingMatrix, item: usize, neighbors: &[Neighbor], target_avg: f64) -> f64 {
    let mut deviation_sum = 0.0;
    let mut weight_sum = 0.0;

    for neighbor in neighbors {
        let rating = matrix.rating(neighbor.entity, item).value();
        let neighbor_avg = matrix.entity_mean(neighbor.entity);
        if let (Some(rating), Some(neighbor_avg)) = (rating, neighbor_avg) {
            deviation_sum += neighbor.score * (rating - neighbor_avg);
            weight_sum += neighbor.score.abs();
        }
    }

    target_avg + deviation_sum / weight_sum
}

/// Round to the nearest integer and pull near misses back onto the scale.
///
/// 0 and -1 become 1, 6 and 7 become 5; anything further out is rejected.
pub fn clamp_rating(raw: f64) -> Option<u8> {
    if !raw.is_finite() {
        return None;
    }

    match raw.round() as i64 {
        -1 | 0 => Some(MIN_RATING),
        6 | 7 => Some(MAX_RATING),
        r @ 1..=5 => Some(r as u8),
        _ => None,
    }
}
