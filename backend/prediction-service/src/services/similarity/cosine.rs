use super::SimilarityFunction;
use crate::models::SimilarityKind;
use crate::services::aggregation::Aggregation;
use crate::services::matrix::RatingMatrix;
use crate::services::neighbors::Ranking;
use crate::utils::finite_or;

/// Cosine of the raw rating vectors, restricted to co-rated dimensions
///
/// score = Σ(r1·r2) / (sqrt(Σr1²) · sqrt(Σr2²))
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSimilarity;

impl SimilarityFunction for CosineSimilarity {
    fn kind(&self) -> SimilarityKind {
        SimilarityKind::Cosine
    }

    fn score(&self, matrix: &RatingMatrix, target: usize, candidate: usize) -> Option<f64> {
        let mut dot = 0.0;
        let mut target_sq = 0.0;
        let mut candidate_sq = 0.0;
        let mut overlap = 0usize;

        let pairs = matrix.row(target).iter().zip(matrix.row(candidate));
        for (a, b) in pairs {
            let (Some(a), Some(b)) = (a.value(), b.value()) else {
                continue;
            };
            overlap += 1;
            dot += a * b;
            target_sq += a * a;
            candidate_sq += b * b;
        }

        if overlap == 0 {
            return None;
        }

        let denominator = target_sq.sqrt() * candidate_sq.sqrt();
        if denominator == 0.0 {
            return Some(0.0);
        }

        Some(finite_or(dot / denominator, 0.0))
    }

    fn ranking(&self) -> Ranking {
        Ranking::Raw
    }

    fn aggregation(&self) -> Aggregation {
        Aggregation::WeightedMean
    }
}
