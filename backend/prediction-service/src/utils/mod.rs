// Numeric helpers shared by the similarity and aggregation code

/// Arithmetic mean, `None` for an empty input
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    (count > 0).then(|| sum / count as f64)
}

/// Sample standard deviation (n - 1 denominator).
///
/// A single observation has zero spread; an empty input has none.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    match values.len() {
        0 => None,
        1 => Some(0.0),
        n => {
            let avg = values.iter().sum::<f64>() / n as f64;
            let sum_sq: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
            Some((sum_sq / (n - 1) as f64).sqrt())
        }
    }
}

/// Replace NaN and infinities with `fallback`
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
