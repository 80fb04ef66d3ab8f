//! Contiguous k-fold cross-validation scored by negative mean squared error.

use std::ops::Range;

use tracing::{debug, instrument};

use crate::config::ForestConfig;
use crate::error::RfError;
use crate::metrics;

/// Unshuffled k-fold splitter.
///
/// Folds are contiguous blocks in row order. The first `n % k` folds hold
/// one extra row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    n_folds: usize,
}

/// Per-fold scores from [`KFold::cross_val_score`].
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationResult {
    /// Negative MSE on each held-out fold, in fold order.
    pub fold_scores: Vec<f64>,
    /// Mean of `fold_scores`.
    pub mean_score: f64,
    /// Population standard deviation of `fold_scores`.
    pub std_score: f64,
}

impl KFold {
    /// Create a splitter with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, RfError> {
        if n_folds < 2 {
            return Err(RfError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds })
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Return the held-out row range of each fold.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::TooFewSamplesForFolds`] if `n_samples < n_folds`.
    pub fn folds(&self, n_samples: usize) -> Result<Vec<Range<usize>>, RfError> {
        if n_samples < self.n_folds {
            return Err(RfError::TooFewSamplesForFolds {
                n_samples,
                n_folds: self.n_folds,
            });
        }
        let base = n_samples / self.n_folds;
        let extra = n_samples % self.n_folds;
        let mut start = 0;
        Ok((0..self.n_folds)
            .map(|fold| {
                let size = base + usize::from(fold < extra);
                let range = start..start + size;
                start += size;
                range
            })
            .collect())
    }

    /// Train on all-but-one fold and score on the held-out fold, for every fold.
    ///
    /// Every fold trains with the same configuration, seed included.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::TargetLengthMismatch`] | `features.len() != targets.len()` |
    /// | [`RfError::TooFewSamplesForFolds`] | fewer rows than folds |
    /// | Other RF errors | from forest training |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_samples = features.len()))]
    pub fn cross_val_score(
        &self,
        config: &ForestConfig,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
    ) -> Result<CrossValidationResult, RfError> {
        if features.len() != targets.len() {
            return Err(RfError::TargetLengthMismatch {
                n_samples: features.len(),
                n_targets: targets.len(),
            });
        }

        let mut fold_scores = Vec::with_capacity(self.n_folds);
        for (fold, held_out) in self.folds(features.len())?.into_iter().enumerate() {
            let (train_features, train_targets): (Vec<Vec<f64>>, Vec<f64>) = features
                .iter()
                .zip(targets)
                .enumerate()
                .filter(|(i, _)| !held_out.contains(i))
                .map(|(_, (row, &y))| (row.clone(), y))
                .unzip();

            let fit = config.fit(&train_features, &train_targets, feature_names)?;
            let predicted = fit.forest().predict_batch(&features[held_out.clone()])?;
            let score = -metrics::mse(&targets[held_out], &predicted)?;
            debug!(fold, score, "fold scored");
            fold_scores.push(score);
        }

        let k = fold_scores.len() as f64;
        let mean_score = fold_scores.iter().sum::<f64>() / k;
        let std_score =
            (fold_scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / k).sqrt();

        Ok(CrossValidationResult {
            fold_scores,
            mean_score,
            std_score,
        })
    }
}
