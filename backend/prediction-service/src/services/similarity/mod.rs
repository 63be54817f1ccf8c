mod cosine;
mod pearson;
mod polarization;

use crate::models::SimilarityKind;
use crate::services::aggregation::Aggregation;
use crate::services::matrix::RatingMatrix;
use crate::services::neighbors::Ranking;
use std::sync::Arc;
use tracing::info;

pub use cosine::CosineSimilarity;
pub use pearson::{CaseModifiedPearson, PearsonSimilarity};
pub use polarization::{PolarizationWeights, PolarizedPearson};

/// Similarity strategy between two entities of the same matrix
///
/// `score` returns `None` when the two entities share no co-rated dimension,
/// which keeps the candidate out of the neighbor set. Any other degenerate
/// case (zero variance, zero norm, NaN) scores 0.0.
pub trait SimilarityFunction: Send + Sync {
    fn kind(&self) -> SimilarityKind;

    fn score(&self, matrix: &RatingMatrix, target: usize, candidate: usize) -> Option<f64>;

    /// How candidates are compared when filling the neighbor set
    fn ranking(&self) -> Ranking {
        Ranking::Magnitude
    }

    /// How the neighbor set is turned into a rating
    fn aggregation(&self) -> Aggregation {
        Aggregation::MeanCentered
    }
}

/// Build the strategy for `kind`.
///
/// The polarized variant runs its global pre-processing pass here, so the
/// weights are frozen before any prediction task starts.
pub fn build_similarity(
    kind: SimilarityKind,
    case_exponent: f64,
    matrix: &RatingMatrix,
) -> Arc<dyn SimilarityFunction> {
    match kind {
        SimilarityKind::Cosine => Arc::new(CosineSimilarity),
        SimilarityKind::Pearson => Arc::new(PearsonSimilarity),
        SimilarityKind::PearsonCaseModified => Arc::new(CaseModifiedPearson::new(case_exponent)),
        SimilarityKind::PearsonPolarized => {
            let weights = PolarizationWeights::compute(matrix);
            info!(
                items = matrix.item_count(),
                mean_spread = weights.mean_spread().unwrap_or(0.0),
                "Polarization weights computed"
            );
            Arc::new(PolarizedPearson::new(Arc::new(weights)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> RatingMatrix {
        RatingMatrix::from_raw_rows(&[
            vec![5, 3, 0, 1, 4, 2],
            vec![4, 0, 2, 1, 5, 3],
            vec![1, 5, 4, 0, 2, 2],
            vec![0, 2, 5, 4, 1, 1],
            vec![3, 3, 3, 3, 0, 5],
        ])
        .unwrap()
    }

    fn all_variants(matrix: &RatingMatrix) -> Vec<Arc<dyn SimilarityFunction>> {
        vec![
            build_similarity(SimilarityKind::Cosine, 1.0, matrix),
            build_similarity(SimilarityKind::Pearson, 1.0, matrix),
            build_similarity(SimilarityKind::PearsonCaseModified, 1.0, matrix),
            build_similarity(SimilarityKind::PearsonCaseModified, 2.5, matrix),
            build_similarity(SimilarityKind::PearsonPolarized, 1.0, matrix),
        ]
    }

    #[test]
    fn test_every_variant_is_symmetric() {
        let matrix = matrix();
        for similarity in all_variants(&matrix) {
            for a in 0..matrix.entity_count() {
                for b in 0..matrix.entity_count() {
                    assert_eq!(
                        similarity.score(&matrix, a, b),
                        similarity.score(&matrix, b, a),
                        "{} not symmetric for ({}, {})",
                        similarity.kind().as_str(),
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn test_scores_are_bounded_and_finite() {
        let matrix = matrix();
        for similarity in all_variants(&matrix) {
            for a in 0..matrix.entity_count() {
                for b in 0..matrix.entity_count() {
                    if let Some(score) = similarity.score(&matrix, a, b) {
                        assert!(score.is_finite());
                        assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&score));
                    }
                }
            }
        }
    }

    #[test]
    fn test_rules_per_variant() {
        let matrix = matrix();
        let cosine = build_similarity(SimilarityKind::Cosine, 1.0, &matrix);
        assert_eq!(cosine.ranking(), Ranking::Raw);
        assert_eq!(cosine.aggregation(), Aggregation::WeightedMean);

        for kind in [
            SimilarityKind::Pearson,
            SimilarityKind::PearsonCaseModified,
            SimilarityKind::PearsonPolarized,
        ] {
            let similarity = build_similarity(kind, 1.0, &matrix);
            assert_eq!(similarity.kind(), kind);
            assert_eq!(similarity.ranking(), Ranking::Magnitude);
            assert_eq!(similarity.aggregation(), Aggregation::MeanCentered);
        }
    }
}
