use crate::error::{AppError, Result};
use crate::models::{Orientation, SimilarityKind};
use crate::services::neighbors::DEFAULT_NEIGHBOR_COUNT;
use crate::services::predictor::DEFAULT_CHUNK_SIZE;
use serde::Deserialize;
use std::ops::Range;
use std::path::PathBuf;

/// (train, test) entities of a holdout run: 175/25 of 200 users, 900/100 of 1000 items
pub const USER_BASED_SPLIT: (usize, usize) = (175, 25);
pub const ITEM_BASED_SPLIT: (usize, usize) = (900, 100);

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Inputs and outputs
    pub ratings_path: String,
    pub holdout_paths: Vec<String>,
    pub output_dir: String,

    // Corpus shape (user-major)
    pub user_count: usize,
    pub item_count: usize,
    /// Users appended per held-out triplet file
    pub holdout_users: usize,

    // Holdout evaluation segments, counted along the configured orientation.
    // Unset values fall back to USER_BASED_SPLIT or ITEM_BASED_SPLIT.
    #[serde(default)]
    pub train_split: Option<usize>,
    #[serde(default)]
    pub test_split: Option<usize>,

    // Algorithm
    pub neighbor_count: usize,
    pub orientation: Orientation,
    pub similarity: SimilarityKind,
    pub case_exponent: f64,

    // Execution
    pub prediction_chunk_size: usize,

    // Observability
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> std::result::Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .set_default("ratings_path", "train.txt")?
            .set_default("holdout_paths", vec!["test5.txt", "test10.txt", "test20.txt"])?
            .set_default("output_dir", ".")?
            .set_default("user_count", 200)?
            .set_default("item_count", 1000)?
            .set_default("holdout_users", 100)?
            .set_default("neighbor_count", DEFAULT_NEIGHBOR_COUNT as u64)?
            .set_default("orientation", "user_based")?
            .set_default("similarity", "pearson")?
            .set_default("case_exponent", 1.0)?
            .set_default("prediction_chunk_size", DEFAULT_CHUNK_SIZE as u64)?
            .set_default("log_format", "text")?
            .add_source(
                config::Environment::default()
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("holdout_paths"),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_count == 0 || self.item_count == 0 {
            return Err(AppError::Configuration(
                "User and item counts must be greater than 0".to_string(),
            ));
        }

        if self.neighbor_count == 0 {
            return Err(AppError::Configuration(
                "Neighbor count must be greater than 0".to_string(),
            ));
        }

        if !(self.case_exponent.is_finite() && self.case_exponent > 0.0) {
            return Err(AppError::Configuration(format!(
                "Case exponent must be a positive number, got {}",
                self.case_exponent
            )));
        }

        if self.holdout_users == 0 {
            return Err(AppError::Configuration(
                "Holdout user count must be greater than 0".to_string(),
            ));
        }

        let entities = self.entity_count();
        let (train, test) = self.splits();
        if train == 0 || test == 0 || train + test > entities {
            return Err(AppError::Configuration(format!(
                "Train split {} + test split {} must fit in {} {} entities",
                train,
                test,
                entities,
                self.orientation.as_str()
            )));
        }

        if self.prediction_chunk_size == 0 {
            return Err(AppError::Configuration(
                "Prediction chunk size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Entities along the configured orientation
    pub fn entity_count(&self) -> usize {
        match self.orientation {
            Orientation::UserBased => self.user_count,
            Orientation::ItemBased => self.item_count,
        }
    }

    /// Configured (train, test) sizes, defaulted per orientation
    pub fn splits(&self) -> (usize, usize) {
        let (train, test) = match self.orientation {
            Orientation::UserBased => USER_BASED_SPLIT,
            Orientation::ItemBased => ITEM_BASED_SPLIT,
        };
        (self.train_split.unwrap_or(train), self.test_split.unwrap_or(test))
    }

    /// Training and test entity ranges for holdout evaluation
    pub fn segments(&self) -> (Range<usize>, Range<usize>) {
        let (train, test) = self.splits();
        (0..train, train..train + test)
    }

    /// `test5.txt` -> `<output_dir>/result5.txt`
    pub fn result_path(&self, holdout_path: &str) -> PathBuf {
        let file_name = PathBuf::from(holdout_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| holdout_path.to_string());

        let result_name = match file_name.strip_prefix("test") {
            Some(rest) => format!("result{rest}"),
            None => format!("result_{file_name}"),
        };

        PathBuf::from(&self.output_dir).join(result_name)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
