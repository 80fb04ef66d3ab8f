//! Training and evaluation result types.

use crate::forest::RandomForest;
use crate::importance::RankedFeature;

/// Metadata about the training run.
#[derive(Debug, Clone)]
pub struct TrainingMetadata {
    /// Number of trees trained.
    pub n_trees: usize,
    /// Number of features in the dataset.
    pub n_features: usize,
    /// Number of training samples.
    pub n_samples: usize,
    /// Resolved max_features value used.
    pub max_features_resolved: usize,
}

/// A fitted forest with its feature importances and training metadata.
#[derive(Debug, Clone)]
pub struct ForestFit {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    metadata: TrainingMetadata,
}

impl ForestFit {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            importances,
            metadata,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Return the ranked feature importances.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}

/// Held-out error metrics for one fitted model.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct EvaluationResult {
    /// Root mean squared error; always defined.
    pub rmse: f64,
    /// Coefficient of determination; `None` when fewer than 2 test rows.
    pub r2: Option<f64>,
}

/// Non-fatal conditions recovered locally and carried into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The test partition was too small for R²; it was left undefined.
    DegenerateMetric {
        /// Number of rows in the test partition.
        n_test: usize,
    },
    /// Too few training rows for cross-validation; the base evaluation is final.
    SearchSkipped {
        /// Number of rows in the training partition.
        n_train: usize,
        /// Folds that would have been used.
        n_folds: usize,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::DegenerateMetric { n_test } => {
                write!(f, "R² undefined: test partition has {n_test} row(s), need at least 2")
            }
            Diagnostic::SearchSkipped { n_train, n_folds } => write!(
                f,
                "hyperparameter search skipped: {n_train} training row(s) allow only {n_folds} fold(s)"
            ),
        }
    }
}
