//! Regression error metrics over aligned (actual, predicted) slices.

use crate::error::RfError;

fn check_inputs(actual: &[f64], predicted: &[f64]) -> Result<(), RfError> {
    if actual.len() != predicted.len() {
        return Err(RfError::MetricLengthMismatch {
            n_actual: actual.len(),
            n_predicted: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(RfError::EmptyMetricInput);
    }
    Ok(())
}

/// Mean squared error.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`RfError::MetricLengthMismatch`] | slices differ in length |
/// | [`RfError::EmptyMetricInput`] | slices are empty |
pub fn mse(actual: &[f64], predicted: &[f64]) -> Result<f64, RfError> {
    check_inputs(actual, predicted)?;
    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    Ok(sse / actual.len() as f64)
}

/// Root mean squared error.
///
/// # Errors
///
/// Same conditions as [`mse`].
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64, RfError> {
    Ok(mse(actual, predicted)?.sqrt())
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// Returns `Ok(None)` for a single sample, where R² is undefined. When the
/// actual values are all equal (`SS_tot == 0`) the score is 1.0 for an exact
/// fit and 0.0 otherwise, so the result is always finite.
///
/// # Errors
///
/// Same conditions as [`mse`].
pub fn r2(actual: &[f64], predicted: &[f64]) -> Result<Option<f64>, RfError> {
    check_inputs(actual, predicted)?;
    if actual.len() < 2 {
        return Ok(None);
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return Ok(Some(if ss_res == 0.0 { 1.0 } else { 0.0 }));
    }
    Ok(Some(1.0 - ss_res / ss_tot))
}
