//! Size-aware grid search over forest hyperparameters.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use crate::config::{ForestConfig, ModelSpec};
use crate::cv::{CrossValidationResult, KFold};
use crate::error::RfError;
use crate::evaluate::{SplitPlan, score_predictions};
use crate::result::{Diagnostic, EvaluationResult, ForestFit};

/// Candidate values for each tunable hyperparameter.
///
/// # Defaults
///
/// | Parameter      | Default                 |
/// |----------------|-------------------------|
/// | `n_estimators` | 50, 100, 200            |
/// | `max_depth`    | 5, 10, 20, unbounded    |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    n_estimators: Vec<usize>,
    max_depth: Vec<Option<usize>>,
}

impl ParamGrid {
    /// Create a grid from candidate lists.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::EmptyGrid`] if either list is empty.
    pub fn new(n_estimators: Vec<usize>, max_depth: Vec<Option<usize>>) -> Result<Self, RfError> {
        if n_estimators.is_empty() || max_depth.is_empty() {
            return Err(RfError::EmptyGrid);
        }
        Ok(Self {
            n_estimators,
            max_depth,
        })
    }

    /// Return the number of grid points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n_estimators.len() * self.max_depth.len()
    }

    /// Return true if the grid has no points. Never true for a constructed grid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand the grid into model specs: `max_depth` outer, `n_estimators` inner.
    #[must_use]
    pub fn candidates(&self, seed: u64) -> Vec<ModelSpec> {
        self.max_depth
            .iter()
            .flat_map(|&max_depth| {
                self.n_estimators.iter().map(move |&n_estimators| ModelSpec {
                    n_estimators,
                    max_depth,
                    seed,
                })
            })
            .collect()
    }
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![50, 100, 200],
            max_depth: vec![Some(5), Some(10), Some(20), None],
        }
    }
}

/// Cross-validated score of one grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    /// The grid point.
    pub spec: ModelSpec,
    /// Its fold scores.
    pub cv: CrossValidationResult,
}

/// Result of a completed grid search.
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    /// Best grid point by mean cross-validated score.
    pub best_spec: ModelSpec,
    /// Mean negative MSE of the best grid point.
    pub best_score: f64,
    /// Per-fold negative MSE of the best grid point.
    pub best_fold_scores: Vec<f64>,
    /// Number of folds used.
    pub n_folds: usize,
    /// Every grid point in grid order.
    pub candidates: Vec<CandidateScore>,
    /// The best spec refitted on the full training partition.
    pub fit: ForestFit,
    /// Held-out metrics of the refitted model.
    pub evaluation: EvaluationResult,
    /// Non-fatal conditions met during re-evaluation.
    pub diagnostics: Vec<Diagnostic>,
}

/// Outcome of [`GridSearch::run`].
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// Search ran to completion.
    Completed(Box<GridSearchResult>),
    /// Too few training rows for at least two folds; nothing was searched.
    Skipped {
        /// Number of training rows.
        n_train: usize,
        /// Folds that would have been used.
        n_folds: usize,
    },
}

impl SearchOutcome {
    /// Return the completed result, if any.
    #[must_use]
    pub fn completed(&self) -> Option<&GridSearchResult> {
        match self {
            SearchOutcome::Completed(result) => Some(&**result),
            SearchOutcome::Skipped { .. } => None,
        }
    }

    /// Return the skip diagnostic, if the search was skipped.
    #[must_use]
    pub fn skip_diagnostic(&self) -> Option<Diagnostic> {
        match *self {
            SearchOutcome::Skipped { n_train, n_folds } => {
                Some(Diagnostic::SearchSkipped { n_train, n_folds })
            }
            SearchOutcome::Completed(_) => None,
        }
    }
}

/// Exhaustive grid search with k-fold cross-validation.
///
/// # Defaults
///
/// | Parameter   | Default              |
/// |-------------|----------------------|
/// | `grid`      | [`ParamGrid::default`] |
/// | `max_folds` | 3                    |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSearch {
    grid: ParamGrid,
    max_folds: usize,
}

impl GridSearch {
    /// Create a search over the given grid.
    #[must_use]
    pub fn new(grid: ParamGrid) -> Self {
        Self { grid, max_folds: 3 }
    }

    /// Set the fold count used when the training partition is large enough.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidFoldCount`] if `max_folds` < 2.
    pub fn with_max_folds(mut self, max_folds: usize) -> Result<Self, RfError> {
        if max_folds < 2 {
            return Err(RfError::InvalidFoldCount { n_folds: max_folds });
        }
        self.max_folds = max_folds;
        Ok(self)
    }

    /// Return the grid.
    #[must_use]
    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }

    /// Return the maximum fold count.
    #[must_use]
    pub fn max_folds(&self) -> usize {
        self.max_folds
    }

    /// Search the grid on the training partition, then refit the winner and
    /// score it on the test partition.
    ///
    /// Uses `min(max_folds, n_train)` folds and skips the search when that is
    /// below 2. Grid points are scored in parallel; the winner is the highest
    /// mean score (lowest MSE), ties going to the first in grid order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::TargetLengthMismatch`] | `features.len() != targets.len()` |
    /// | [`RfError::SplitMismatch`] | `split` does not cover exactly `features.len()` rows |
    /// | [`RfError::InvalidTreeCount`] / [`RfError::InvalidMaxDepth`] | a grid point is invalid |
    /// | Other RF errors | from training or scoring |
    #[instrument(skip_all, fields(n_train = split.n_train(), n_test = split.n_test(), grid_size = self.grid.len()))]
    pub fn run(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
        split: &SplitPlan,
        seed: u64,
    ) -> Result<SearchOutcome, RfError> {
        if features.len() != targets.len() {
            return Err(RfError::TargetLengthMismatch {
                n_samples: features.len(),
                n_targets: targets.len(),
            });
        }
        let n_split = split.test_range().end;
        if n_split != features.len() {
            return Err(RfError::SplitMismatch {
                n_samples: features.len(),
                n_split,
            });
        }

        let n_train = split.n_train();
        let n_folds = self.max_folds.min(n_train);
        if n_folds < 2 {
            warn!(n_train, n_folds, "too few training rows for cross-validation; search skipped");
            return Ok(SearchOutcome::Skipped { n_train, n_folds });
        }
        let kfold = KFold::new(n_folds)?;

        let (train, test) = (split.train_range(), split.test_range());
        let (train_features, train_targets) = (&features[train.clone()], &targets[train]);

        let candidates = self.grid.candidates(seed);
        let configs: Vec<ForestConfig> = candidates
            .iter()
            .map(ModelSpec::to_config)
            .collect::<Result<_, _>>()?;

        let scores: Vec<CrossValidationResult> = configs
            .par_iter()
            .map(|config| kfold.cross_val_score(config, train_features, train_targets, feature_names))
            .collect::<Result<_, _>>()?;

        let candidates: Vec<CandidateScore> = candidates
            .into_iter()
            .zip(scores)
            .map(|(spec, cv)| {
                debug!(%spec, mean_score = cv.mean_score, "grid point scored");
                CandidateScore { spec, cv }
            })
            .collect();

        let mut best_idx = 0;
        for (i, candidate) in candidates.iter().enumerate().skip(1) {
            if candidate.cv.mean_score > candidates[best_idx].cv.mean_score {
                best_idx = i;
            }
        }
        let best = &candidates[best_idx];
        info!(best = %best.spec, best_score = best.cv.mean_score, n_folds, "grid search complete");

        let fit = configs[best_idx].fit(train_features, train_targets, feature_names)?;
        let predicted = fit.forest().predict_batch(&features[test.clone()])?;
        let (evaluation, diagnostic) = score_predictions(&targets[test], &predicted)?;

        info!(rmse = evaluation.rmse, r2 = ?evaluation.r2, "best model re-evaluated");

        Ok(SearchOutcome::Completed(Box::new(GridSearchResult {
            best_spec: best.spec,
            best_score: best.cv.mean_score,
            best_fold_scores: best.cv.fold_scores.clone(),
            n_folds,
            fit,
            evaluation,
            diagnostics: diagnostic.into_iter().collect(),
            candidates,
        })))
    }
}

impl Default for GridSearch {
    fn default() -> Self {
        Self::new(ParamGrid::default())
    }
}
