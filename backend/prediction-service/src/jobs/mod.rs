// ============================================
// Batch Jobs
// ============================================
//
// Job runners behind the binary's run modes:
// 1. Holdout evaluation (--mode evaluate / --mode compare)
// 2. Held-out file prediction (--mode predict)
//
// Both load the training corpus, build one predictor per similarity
// variant, and hand targets to the parallel prediction engine.

pub mod evaluation;
pub mod prediction;

pub use evaluation::{holdout_targets, run_evaluation_job, EvaluationJob};
pub use prediction::{run_prediction_job, PredictionJob, PredictionJobStats};
