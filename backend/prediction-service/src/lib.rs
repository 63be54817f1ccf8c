pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
pub use jobs::{EvaluationJob, PredictionJob};
pub use services::{Evaluator, PredictionEngine, Predictor, RatingMatrix};
