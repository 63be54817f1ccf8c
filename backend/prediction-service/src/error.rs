use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Format error in {path}: {detail}")]
    Format { path: PathBuf, detail: String },

    #[error("Degenerate metric: {0}")]
    DegenerateMetric(String),

    #[error("Prediction {value} for entity {entity}, item {item} is outside the rating scale")]
    PredictionOutOfRange { entity: usize, item: usize, value: i64 },

    #[error(
        "{} held-out cells of {} fall outside the rating scale (user, item): {}",
        .cells.len(),
        .path.display(),
        format_cells(.cells)
    )]
    IncompleteResults { path: PathBuf, cells: Vec<(u32, u32)> },

    #[error("Cell ({entity}, {item}) is outside the matrix")]
    IndexOutOfRange { entity: usize, item: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn format(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        AppError::Format {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Whether the error aborts a run, as opposed to rejecting a single target
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AppError::PredictionOutOfRange { .. })
    }
}

fn format_cells(cells: &[(u32, u32)]) -> String {
    cells
        .iter()
        .map(|(user, item)| format!("({user}, {item})"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Prediction task panicked: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_names_file() {
        let err = AppError::format("data/train.txt", "expected 200000 tokens, found 12");
        let message = err.to_string();
        assert!(message.contains("data/train.txt"));
        assert!(message.contains("found 12"));
    }

    #[test]
    fn test_only_out_of_range_is_recoverable() {
        let rejected = AppError::PredictionOutOfRange {
            entity: 3,
            item: 7,
            value: 9,
        };
        assert!(!rejected.is_fatal());
        assert!(AppError::DegenerateMetric("no predictions".into()).is_fatal());
    }

    #[test]
    fn test_incomplete_results_list_every_cell() {
        let err = AppError::IncompleteResults {
            path: PathBuf::from("test5.txt"),
            cells: vec![(201, 5), (204, 17)],
        };
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "2 held-out cells of test5.txt fall outside the rating scale (user, item): (201, 5), (204, 17)"
        );
    }
}
