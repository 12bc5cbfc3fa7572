//! Statistical functions for testing and analysis

use thiserror::Error;

/// Errors from summary statistics over empty or invalid samples
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("cannot compute {0} of an empty sample")]
    Empty(&'static str),
    #[error("insufficient data points to compute median: {0} total values, 0 valid (all NaN)")]
    AllNan(usize),
}

/// Arithmetic mean of a slice
pub fn mean(values: &[f64]) -> Result<f64, StatsError> {
    if values.is_empty() {
        return Err(StatsError::Empty("mean"));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`)
pub fn population_std(values: &[f64]) -> Result<f64, StatsError> {
    let mu = mean(values).map_err(|_| StatsError::Empty("standard deviation"))?;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    Ok(variance.sqrt())
}

/// Calculate median of a slice of f64 values
///
/// NaN values are ignored, infinities are kept. For even-length data the
/// two middle values are averaged.
pub fn median(values: &[f64]) -> Result<f64, StatsError> {
    let mut valid_values: Vec<f64> = values.iter().filter(|v| !v.is_nan()).copied().collect();

    if valid_values.is_empty() {
        return Err(StatsError::AllNan(values.len()));
    }

    Ok(median_in_place(&mut valid_values))
}

/// Median of a non-empty, NaN-free buffer, reordering it in place.
///
/// Used on the hot path of per-pixel median stacking where the caller
/// already owns a scratch buffer.
pub fn median_in_place(values: &mut [f64]) -> f64 {
    debug_assert!(!values.is_empty());
    values.sort_by(|a, b| a.total_cmp(b));

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(population_std(&values).unwrap(), 2.0);
    }

    #[test]
    fn test_empty_sample() {
        assert_eq!(mean(&[]), Err(StatsError::Empty("mean")));
        assert_eq!(
            population_std(&[]),
            Err(StatsError::Empty("standard deviation"))
        );
    }

    #[test]
    fn test_median_odd_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_median_ignores_nan() {
        assert_eq!(median(&[f64::NAN, 1.0, 5.0, 3.0]).unwrap(), 3.0);
        assert_eq!(median(&[f64::NAN, f64::NAN]), Err(StatsError::AllNan(2)));
    }

    #[test]
    fn test_median_keeps_infinity() {
        assert_eq!(median(&[f64::INFINITY, 1.0, 2.0]).unwrap(), 2.0);
    }
}
