//! Size-adaptive chronological train/test evaluation.

use std::ops::Range;

use tracing::{info, instrument, warn};

use crate::config::ModelSpec;
use crate::error::RfError;
use crate::metrics;
use crate::result::{Diagnostic, EvaluationResult, ForestFit};

/// Fewest samples for which a train/test split is attempted.
pub const MIN_SAMPLES: usize = 4;

/// Fraction of samples held out for testing.
///
/// `max(0.5, 2 / n)` for `n > 2`, otherwise 0.5. The `2 / n` floor keeps
/// at least two test rows whenever that is possible, so R² stays defined.
#[must_use]
pub fn test_fraction(n_samples: usize) -> f64 {
    if n_samples > 2 {
        f64::max(0.5, 2.0 / n_samples as f64)
    } else {
        0.5
    }
}

/// A chronological train/test partition: the earliest rows train, the latest test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitPlan {
    n_train: usize,
    n_test: usize,
    test_fraction: f64,
}

impl SplitPlan {
    /// Plan the split for `n_samples` rows.
    ///
    /// `n_test = ceil(test_fraction(n) * n)`; the remaining rows train.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InsufficientSamples`] if `n_samples < MIN_SAMPLES`.
    pub fn for_samples(n_samples: usize) -> Result<Self, RfError> {
        if n_samples < MIN_SAMPLES {
            return Err(RfError::InsufficientSamples {
                n_samples,
                min: MIN_SAMPLES,
            });
        }
        let fraction = test_fraction(n_samples);
        let n_test = (fraction * n_samples as f64).ceil() as usize;
        Ok(Self {
            n_train: n_samples - n_test,
            n_test,
            test_fraction: fraction,
        })
    }

    /// A plan with explicit partition sizes, bypassing the size policy.
    #[cfg(test)]
    pub(crate) fn from_counts(n_train: usize, n_test: usize) -> Self {
        Self {
            n_train,
            n_test,
            test_fraction: n_test as f64 / (n_train + n_test) as f64,
        }
    }

    /// Return the number of training rows.
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.n_train
    }

    /// Return the number of test rows.
    #[must_use]
    pub fn n_test(&self) -> usize {
        self.n_test
    }

    /// Return the test fraction used.
    #[must_use]
    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Return the row range of the training partition.
    #[must_use]
    pub fn train_range(&self) -> Range<usize> {
        0..self.n_train
    }

    /// Return the row range of the test partition.
    #[must_use]
    pub fn test_range(&self) -> Range<usize> {
        self.n_train..self.n_train + self.n_test
    }
}

/// Score held-out predictions: RMSE always, R² when at least two rows.
///
/// Returns a [`Diagnostic::DegenerateMetric`] alongside the result when R²
/// is undefined.
///
/// # Errors
///
/// Propagates [`metrics`] input errors (length mismatch, empty input).
pub fn score_predictions(
    actual: &[f64],
    predicted: &[f64],
) -> Result<(EvaluationResult, Option<Diagnostic>), RfError> {
    let rmse = metrics::rmse(actual, predicted)?;
    let r2 = metrics::r2(actual, predicted)?;
    let diagnostic = if r2.is_none() {
        warn!(n_test = actual.len(), "R² undefined for a single test row");
        Some(Diagnostic::DegenerateMetric {
            n_test: actual.len(),
        })
    } else {
        None
    };
    Ok((EvaluationResult { rmse, r2 }, diagnostic))
}

/// Fits a forest on the earliest rows of a chronologically ordered dataset
/// and scores it on the latest rows.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `spec`    | 100 trees, unbounded depth, seed 42 |
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveEvaluator {
    spec: ModelSpec,
}

/// Outcome of [`AdaptiveEvaluator::evaluate`].
#[derive(Debug, Clone)]
pub struct AdaptiveEvaluation {
    /// The model specification evaluated.
    pub spec: ModelSpec,
    /// The partition used.
    pub split: SplitPlan,
    /// The forest fitted on the training partition.
    pub fit: ForestFit,
    /// Held-out metrics.
    pub evaluation: EvaluationResult,
    /// Non-fatal conditions met during evaluation.
    pub diagnostics: Vec<Diagnostic>,
}

impl AdaptiveEvaluator {
    /// Create an evaluator for the given model specification.
    ///
    /// # Errors
    ///
    /// Returns the [`ModelSpec::to_config`] errors for an invalid spec.
    pub fn new(spec: ModelSpec) -> Result<Self, RfError> {
        spec.to_config()?;
        Ok(Self { spec })
    }

    /// Return the model specification.
    #[must_use]
    pub fn spec(&self) -> ModelSpec {
        self.spec
    }

    /// Split, fit, and score.
    ///
    /// Rows must already be in chronological order; they are never shuffled.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::TargetLengthMismatch`] | `features.len() != targets.len()` |
    /// | [`RfError::InsufficientSamples`] | fewer than [`MIN_SAMPLES`] rows |
    /// | Other RF errors | from forest training |
    #[instrument(skip_all, fields(n_samples = features.len(), spec = %self.spec))]
    pub fn evaluate(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
    ) -> Result<AdaptiveEvaluation, RfError> {
        if features.len() != targets.len() {
            return Err(RfError::TargetLengthMismatch {
                n_samples: features.len(),
                n_targets: targets.len(),
            });
        }
        let split = SplitPlan::for_samples(features.len())?;
        info!(
            n_train = split.n_train(),
            n_test = split.n_test(),
            test_fraction = split.test_fraction(),
            "chronological split"
        );

        let (train, test) = (split.train_range(), split.test_range());
        let fit = self
            .spec
            .to_config()?
            .fit(&features[train.clone()], &targets[train], feature_names)?;
        let predicted = fit.forest().predict_batch(&features[test.clone()])?;
        let (evaluation, diagnostic) = score_predictions(&targets[test], &predicted)?;

        info!(rmse = evaluation.rmse, r2 = ?evaluation.r2, "base evaluation complete");

        Ok(AdaptiveEvaluation {
            spec: self.spec,
            split,
            fit,
            evaluation,
            diagnostics: diagnostic.into_iter().collect(),
        })
    }
}

impl Default for AdaptiveEvaluator {
    fn default() -> Self {
        Self {
            spec: ModelSpec::default(),
        }
    }
}
