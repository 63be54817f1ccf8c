pub mod aggregation;
pub mod evaluation;
pub mod matrix;
pub mod neighbors;
pub mod predictor;
pub mod similarity;

pub use aggregation::{clamp_rating, Aggregation, PredictionAggregator};
pub use evaluation::{EvaluationReport, Evaluator};
pub use matrix::RatingMatrix;
pub use neighbors::{Ranking, TopKSelector};
pub use predictor::{BatchOutcome, PredictionEngine, Predictor};
pub use similarity::{build_similarity, SimilarityFunction};
