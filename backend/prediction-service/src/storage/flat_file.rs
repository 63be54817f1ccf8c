use super::{PredictionSink, RatingSource};
use crate::error::{AppError, Result};
use crate::models::{Prediction, Rating};
use crate::services::matrix::RatingMatrix;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

/// User-major training corpus of `user_count × item_count` integers
#[derive(Debug, Clone)]
pub struct FlatFileSource {
    path: PathBuf,
    user_count: usize,
    item_count: usize,
}

impl FlatFileSource {
    pub fn new(path: impl Into<PathBuf>, user_count: usize, item_count: usize) -> Self {
        Self {
            path: path.into(),
            user_count,
            item_count,
        }
    }
}

#[async_trait]
impl RatingSource for FlatFileSource {
    async fn load(&self) -> Result<RatingMatrix> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AppError::io(&self.path, e))?;

        let matrix = parse_matrix(&text, &self.path, self.user_count, self.item_count)?;

        info!(
            path = %self.path.display(),
            users = matrix.entity_count(),
            items = matrix.item_count(),
            ratings = matrix.concrete_count(),
            "Rating matrix loaded"
        );

        Ok(matrix)
    }
}

/// Parse a whitespace-delimited corpus; the token count must match the shape exactly
pub(crate) fn parse_matrix(
    text: &str,
    path: &Path,
    user_count: usize,
    item_count: usize,
) -> Result<RatingMatrix> {
    let expected = user_count * item_count;
    let mut cells = Vec::with_capacity(expected);

    for (idx, token) in text.split_whitespace().enumerate() {
        if idx >= expected {
            let found = idx + text.split_whitespace().skip(idx).count();
            return Err(AppError::format(
                path,
                format!("expected {expected} ratings ({user_count} users x {item_count} items), found {found}"),
            ));
        }

        let rating = token
            .parse::<i64>()
            .ok()
            .and_then(Rating::from_raw)
            .ok_or_else(|| {
                AppError::format(
                    path,
                    format!(
                        "token {} (user {}, item {}) is not a rating: {:?}",
                        idx,
                        idx / item_count + 1,
                        idx % item_count + 1,
                        token
                    ),
                )
            })?;
        cells.push(rating);
    }

    if cells.len() != expected {
        return Err(AppError::format(
            path,
            format!(
                "expected {expected} ratings ({user_count} users x {item_count} items), found {}",
                cells.len()
            ),
        ));
    }

    RatingMatrix::from_dense(user_count, item_count, cells)
}

/// Writes one `<user_id> <item_id> <rating>` line per prediction
#[derive(Debug, Clone)]
pub struct FlatFileSink {
    path: PathBuf,
}

impl FlatFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PredictionSink for FlatFileSink {
    async fn write(&self, predictions: &[Prediction]) -> Result<()> {
        let file = tokio::fs::File::create(&self.path)
            .await
            .map_err(|e| AppError::io(&self.path, e))?;
        let mut writer = BufWriter::new(file);

        for prediction in predictions {
            let line = format!(
                "{} {} {}\n",
                prediction.user_id, prediction.item_id, prediction.rating
            );
            writer
                .write_all(line.as_bytes())
                .await
                .map_err(|e| AppError::io(&self.path, e))?;
        }

        writer
            .flush()
            .await
            .map_err(|e| AppError::io(&self.path, e))?;

        info!(
            path = %self.path.display(),
            lines = predictions.len(),
            "Predictions written"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    #[test]
    fn test_parse_user_major_layout() {
        let matrix = parse_matrix("5 0 3\n0 4 1\n", Path::new("train.txt"), 2, 3).unwrap();
        assert_eq!(matrix.rating(0, 0).score(), Some(5));
        assert_eq!(matrix.rating(0, 1), Rating::Unrated);
        assert_eq!(matrix.rating(1, 1).score(), Some(4));
    }

    #[test]
    fn test_short_input_is_a_format_error() {
        let err = parse_matrix("5 0 3 0", Path::new("train.txt"), 2, 3).unwrap_err();
        match err {
            AppError::Format { path, detail } => {
                assert_eq!(path, PathBuf::from("train.txt"));
                assert!(detail.contains("found 4"), "{detail}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_long_input_is_a_format_error() {
        let err = parse_matrix("1 2 3 4 5", Path::new("train.txt"), 2, 2).unwrap_err();
        assert!(err.to_string().contains("found 5"));
    }

    #[test]
    fn test_bad_tokens_are_format_errors() {
        assert!(parse_matrix("1 x", Path::new("t"), 1, 2).is_err());
        assert!(parse_matrix("1 9", Path::new("t"), 1, 2).is_err());
        assert!(parse_matrix("1 -1", Path::new("t"), 1, 2).is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_io_error() {
        let source = FlatFileSource::new("/nonexistent/ratings.txt", 2, 2);
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/ratings.txt"));
    }

    #[tokio::test]
    async fn test_sink_writes_one_line_per_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.txt");
        let predictions = vec![
            Prediction {
                cell: Cell::new(0, 4),
                user_id: 201,
                item_id: 5,
                rating: 4,
                raw: 3.8,
                actual: None,
                neighbors_used: 20,
                fell_back: false,
            },
            Prediction {
                cell: Cell::new(0, 9),
                user_id: 201,
                item_id: 10,
                rating: 2,
                raw: 2.1,
                actual: None,
                neighbors_used: 12,
                fell_back: false,
            },
        ];

        FlatFileSink::new(&path).write(&predictions).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "201 5 4\n201 10 2\n");
    }
}
