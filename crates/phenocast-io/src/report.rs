//! The evaluation report assembled from a base evaluation and a search outcome.

use phenocast_rf::{AdaptiveEvaluation, Diagnostic, ModelSpec, RankedFeature, SearchOutcome};
use serde::Serialize;

/// Everything one training run produced, in report form.
///
/// When the search was skipped or not requested, the `best_*` metrics repeat
/// the base evaluation and `best_hyperparameters` is `None`; a skip also adds
/// a `search_skipped` entry to `diagnostics`. Undefined R² values serialize as
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Experiment the report belongs to.
    pub experiment: String,
    /// Aligned samples fed to the evaluator.
    pub sample_count: usize,
    /// Rows in the training partition.
    pub train_count: usize,
    /// Rows in the test partition.
    pub test_count: usize,
    /// Fraction of samples held out.
    pub test_fraction: f64,
    /// The configuration of the base evaluation.
    pub base_hyperparameters: ModelSpec,
    /// Held-out RMSE of the base model.
    pub rmse: f64,
    /// Held-out R² of the base model.
    pub r2: Option<f64>,
    /// Winning grid point, if the search ran.
    pub best_hyperparameters: Option<ModelSpec>,
    /// Mean cross-validated negative MSE of the winner, if the search ran.
    pub best_cv_score: Option<f64>,
    /// Held-out RMSE of the final model.
    pub best_rmse: f64,
    /// Held-out R² of the final model.
    pub best_r2: Option<f64>,
    /// Non-fatal conditions met along the way.
    pub diagnostics: Vec<Diagnostic>,
    /// Feature importances of the final model.
    pub feature_importances: Vec<RankedFeature>,
}

impl EvaluationReport {
    /// Assemble a report from the base evaluation and the search outcome, if
    /// a search was requested.
    #[must_use]
    pub fn new(
        experiment: &str,
        base: &AdaptiveEvaluation,
        search: Option<&SearchOutcome>,
    ) -> Self {
        let mut diagnostics = base.diagnostics.clone();
        let mut push = |d: Diagnostic| {
            if !diagnostics.contains(&d) {
                diagnostics.push(d);
            }
        };
        search
            .and_then(SearchOutcome::skip_diagnostic)
            .into_iter()
            .for_each(&mut push);

        let (best_hyperparameters, best_cv_score, best_evaluation, final_fit) =
            match search.and_then(SearchOutcome::completed) {
                Some(result) => {
                    result.diagnostics.iter().copied().for_each(&mut push);
                    (
                        Some(result.best_spec),
                        Some(result.best_score),
                        result.evaluation,
                        &result.fit,
                    )
                }
                None => (None, None, base.evaluation, &base.fit),
            };

        Self {
            experiment: experiment.to_string(),
            sample_count: base.split.n_train() + base.split.n_test(),
            train_count: base.split.n_train(),
            test_count: base.split.n_test(),
            test_fraction: base.split.test_fraction(),
            base_hyperparameters: base.spec,
            rmse: base.evaluation.rmse,
            r2: base.evaluation.r2,
            best_hyperparameters,
            best_cv_score,
            best_rmse: best_evaluation.rmse,
            best_r2: best_evaluation.r2,
            diagnostics,
            feature_importances: final_fit.importances().to_vec(),
        }
    }
}
