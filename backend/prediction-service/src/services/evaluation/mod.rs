use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub count: usize,
    pub rmse: f64,
    pub mae: f64,
}

/// Accumulates prediction errors against held-out ground truth
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    count: usize,
    squared_error: f64,
    absolute_error: f64,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, predicted: u8, actual: u8) {
        let error = f64::from(predicted) - f64::from(actual);
        self.count += 1;
        self.squared_error += error * error;
        self.absolute_error += error.abs();
    }

    /// Record `(predicted, actual)` pairs; cells without an actual value are skipped
    pub fn record_many<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (u8, Option<u8>)>,
    {
        for (predicted, actual) in pairs {
            if let Some(actual) = actual {
                self.record(predicted, actual);
            }
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// sqrt(Σ error² / count); an empty evaluation has no defined value
    pub fn rmse(&self) -> Result<f64> {
        self.ensure_samples()?;
        Ok((self.squared_error / self.count as f64).sqrt())
    }

    pub fn report(&self) -> Result<EvaluationReport> {
        self.ensure_samples()?;
        Ok(EvaluationReport {
            count: self.count,
            rmse: (self.squared_error / self.count as f64).sqrt(),
            mae: self.absolute_error / self.count as f64,
        })
    }

    fn ensure_samples(&self) -> Result<()> {
        if self.count == 0 {
            return Err(AppError::DegenerateMetric(
                "RMSE requested with no evaluated predictions".to_string(),
            ));
        }
        Ok(())
    }
}
