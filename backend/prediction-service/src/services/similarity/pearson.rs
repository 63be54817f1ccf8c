use super::SimilarityFunction;
use crate::models::SimilarityKind;
use crate::services::matrix::RatingMatrix;
use crate::utils::{finite_or, mean};

/// Pearson correlation: cosine of the mean-centered rating vectors.
///
/// Each entity is centered by its own average over all of its concrete
/// ratings; the sums then run over co-rated dimensions only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PearsonSimilarity;

impl SimilarityFunction for PearsonSimilarity {
    fn kind(&self) -> SimilarityKind {
        SimilarityKind::Pearson
    }

    fn score(&self, matrix: &RatingMatrix, target: usize, candidate: usize) -> Option<f64> {
        centered_correlation(matrix, target, candidate, |_, value| Some(value))
    }
}

/// Pearson with case modification: sign(p) · |p|^exponent
///
/// An exponent of 1.0 leaves the correlation unchanged.
#[derive(Debug, Clone, Copy)]
pub struct CaseModifiedPearson {
    exponent: f64,
}

impl CaseModifiedPearson {
    pub fn new(exponent: f64) -> Self {
        Self { exponent }
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    fn amplify(&self, correlation: f64) -> f64 {
        let modified = correlation.signum() * correlation.abs().powf(self.exponent);
        finite_or(modified, 0.0)
    }
}

impl SimilarityFunction for CaseModifiedPearson {
    fn kind(&self) -> SimilarityKind {
        SimilarityKind::PearsonCaseModified
    }

    fn score(&self, matrix: &RatingMatrix, target: usize, candidate: usize) -> Option<f64> {
        PearsonSimilarity
            .score(matrix, target, candidate)
            .map(|p| self.amplify(p))
    }
}

/// Shared Pearson kernel.
///
/// `value` maps a concrete rating at a dimension to the number used in the
/// correlation; returning `None` drops that dimension for both entities.
pub(super) fn centered_correlation<F>(
    matrix: &RatingMatrix,
    target: usize,
    candidate: usize,
    value: F,
) -> Option<f64>
where
    F: Fn(usize, f64) -> Option<f64>,
{
    let entity_avg = |entity: usize| {
        mean(
            matrix
                .concrete_ratings(entity)
                .filter_map(|(item, rating)| value(item, rating)),
        )
    };
    let target_avg = entity_avg(target)?;
    let candidate_avg = entity_avg(candidate)?;

    let mut cross = 0.0;
    let mut target_sq = 0.0;
    let mut candidate_sq = 0.0;
    let mut overlap = 0usize;

    let pairs = matrix.row(target).iter().zip(matrix.row(candidate));
    for (item, (a, b)) in pairs.enumerate() {
        let (Some(a), Some(b)) = (a.value(), b.value()) else {
            continue;
        };
        let (Some(a), Some(b)) = (value(item, a), value(item, b)) else {
            continue;
        };
        overlap += 1;

        let da = a - target_avg;
        let db = b - candidate_avg;
        cross += da * db;
        target_sq += da * da;
        candidate_sq += db * db;
    }

    if overlap == 0 {
        return None;
    }

    // zero variance on the overlap
    if target_sq == 0.0 || candidate_sq == 0.0 {
        return Some(0.0);
    }

    Some(finite_or(cross / (target_sq.sqrt() * candidate_sq.sqrt()), 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_correlation() {
        let matrix = RatingMatrix::from_raw_rows(&[vec![1, 2, 3, 4], vec![2, 3, 4, 5]]).unwrap();
        let score = PearsonSimilarity.score(&matrix, 0, 1).unwrap();
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_anti_correlation() {
        let matrix = RatingMatrix::from_raw_rows(&[vec![1, 2, 3, 4], vec![5, 4, 3, 2]]).unwrap();
        let score = PearsonSimilarity.score(&matrix, 0, 1).unwrap();
        assert!((score + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_ratings_score_zero() {
        let matrix = RatingMatrix::from_raw_rows(&[vec![3, 3, 3, 0], vec![1, 4, 5, 2]]).unwrap();
        assert_eq!(PearsonSimilarity.score(&matrix, 0, 1), Some(0.0));
        assert_eq!(PearsonSimilarity.score(&matrix, 1, 0), Some(0.0));
    }

    #[test]
    fn test_centering_uses_full_average() {
        // Entity 0 averages 3 over all of its ratings; co-rated items are 0 and 1.
        // Centered: (2, -2) vs (−1, 1) around entity 1's average of 3.
        let matrix = RatingMatrix::from_raw_rows(&[vec![5, 1, 3, 0], vec![2, 4, 0, 3]]).unwrap();
        let score = PearsonSimilarity.score(&matrix, 0, 1).unwrap();
        assert!((score + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_overlap_is_excluded() {
        let matrix = RatingMatrix::from_raw_rows(&[vec![5, 1, 0, 0], vec![0, 0, 2, 4]]).unwrap();
        assert_eq!(PearsonSimilarity.score(&matrix, 0, 1), None);
    }

    #[test]
    fn test_unit_exponent_is_identity() {
        let matrix =
            RatingMatrix::from_raw_rows(&[vec![5, 1, 4, 2, 0], vec![4, 2, 2, 1, 3]]).unwrap();
        let plain = PearsonSimilarity.score(&matrix, 0, 1).unwrap();
        let modified = CaseModifiedPearson::new(1.0).score(&matrix, 0, 1).unwrap();
        assert!((plain - modified).abs() < 1e-12);
    }

    #[test]
    fn test_exponent_keeps_sign() {
        let case = CaseModifiedPearson::new(2.5);
        assert!((case.amplify(-0.5) + 0.5f64.powf(2.5)).abs() < 1e-12);
        assert!((case.amplify(0.5) - 0.5f64.powf(2.5)).abs() < 1e-12);
        assert_eq!(case.amplify(0.0), 0.0);
        assert_eq!(case.exponent(), 2.5);
    }
}
