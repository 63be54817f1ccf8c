// ============================================
// Polarization weighting
// ============================================
//
// Items whose ratings are spread out (a "love it or hate it" movie) say more
// about taste than items everyone rates the same. Before the Pearson
// similarity is computed, every concrete rating is rescaled by
//
//   multiplier(item) = ln(stddev(item)) - ln(mean stddev over items)
//
// The weights are computed once per matrix and frozen. They only feed the
// similarity; predictions still aggregate raw ratings.

use super::pearson::centered_correlation;
use super::SimilarityFunction;
use crate::models::SimilarityKind;
use crate::services::matrix::RatingMatrix;
use crate::utils::{mean, sample_std_dev};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PolarizationWeights {
    /// Per-dimension sample stddev; `None` when nobody rated it
    spreads: Vec<Option<f64>>,
    mean_spread: Option<f64>,
    multipliers: Vec<f64>,
}

impl PolarizationWeights {
    pub fn compute(matrix: &RatingMatrix) -> Self {
        let spreads: Vec<Option<f64>> = (0..matrix.item_count())
            .map(|item| {
                let column: Vec<f64> = (0..matrix.entity_count())
                    .filter_map(|entity| matrix.rating(entity, item).value())
                    .collect();
                sample_std_dev(&column)
            })
            .collect();

        let mean_spread = mean(spreads.iter().flatten().copied());

        let multipliers = spreads
            .iter()
            .map(|spread| match (spread, mean_spread) {
                (Some(spread), Some(avg)) => spread.ln() - avg.ln(),
                _ => f64::NAN,
            })
            .collect();

        Self {
            spreads,
            mean_spread,
            multipliers,
        }
    }

    pub fn spread(&self, item: usize) -> Option<f64> {
        self.spreads.get(item).copied().flatten()
    }

    pub fn mean_spread(&self) -> Option<f64> {
        self.mean_spread
    }

    /// Raw multiplier; `-inf` for a zero-spread item, NaN for an unrated one
    pub fn multiplier(&self, item: usize) -> f64 {
        self.multipliers.get(item).copied().unwrap_or(f64::NAN)
    }

    /// Weighted rating, `None` when the item has no finite multiplier
    pub fn weighted(&self, item: usize, rating: f64) -> Option<f64> {
        let multiplier = self.multiplier(item);
        multiplier.is_finite().then(|| rating * multiplier)
    }
}

/// Pearson similarity over polarization-weighted ratings.
///
/// Items without a finite multiplier (zero spread, or a dataset with no
/// spread at all) are dropped from the overlap.
#[derive(Debug, Clone)]
pub struct PolarizedPearson {
    weights: Arc<PolarizationWeights>,
}

impl PolarizedPearson {
    pub fn new(weights: Arc<PolarizationWeights>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &PolarizationWeights {
        &self.weights
    }
}

impl SimilarityFunction for PolarizedPearson {
    fn kind(&self) -> SimilarityKind {
        SimilarityKind::PearsonPolarized
    }

    fn score(&self, matrix: &RatingMatrix, target: usize, candidate: usize) -> Option<f64> {
        centered_correlation(matrix, target, candidate, |item, rating| {
            self.weights.weighted(item, rating)
        })
    }
}
