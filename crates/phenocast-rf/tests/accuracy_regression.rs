//! Accuracy regression tests for phenocast-rf.
//!
//! These tests verify that algorithmic changes do not degrade regression
//! quality on a deterministic synthetic dataset, and that the size-adaptive
//! evaluation path keeps working down to the smallest accepted datasets.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use phenocast_rf::{
    AdaptiveEvaluator, ForestConfig, GridSearch, ModelSpec, ParamGrid, RfError, SearchOutcome,
    metrics,
};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic regression dataset
// ---------------------------------------------------------------------------

/// Generate an `n_samples` x 6 regression dataset.
///
/// `y = 3·f0 + 2·sin(3·f1) + noise`, noise uniform in [-0.05, 0.05].
/// Features f2-f5 are pure noise in [0, 1].
fn make_regression(n_samples: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut targets = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let row: Vec<f64> = (0..6).map(|_| rng.r#gen::<f64>()).collect();
        let noise = rng.gen_range(-0.05..0.05);
        targets.push(3.0 * row[0] + 2.0 * (3.0 * row[1]).sin() + noise);
        features.push(row);
    }
    let names: Vec<String> = (0..6).map(|f| format!("f{f}")).collect();
    (features, targets, names)
}

// ---------------------------------------------------------------------------
// a) held_out_r2_above_threshold
// ---------------------------------------------------------------------------

/// Chronological 50/50 evaluation must explain most of the variance.
#[test]
fn held_out_r2_above_threshold() {
    let (features, targets, names) = make_regression(200, 42);
    let result = AdaptiveEvaluator::default()
        .evaluate(&features, &targets, &names)
        .unwrap();

    let r2 = result.evaluation.r2.expect("100 test rows define R²");
    assert!(r2 > 0.7, "held-out r2 {r2} <= 0.7");
    }

// ---------------------------------------------------------------------------
// b) top_features_are_informative
// ---------------------------------------------------------------------------

/// f0 and f1 drive the target and must rank among the top 3 by importance.
#[test]
fn top_features_are_informative() {
    let (features, targets, names) = make_regression(200, 42);
    let fit = ForestConfig::new(100).unwrap().fit(&features, &targets, &names).unwrap();

    let top3: Vec<&str> = fit.importances().iter().take(3).map(|f| f.name.as_str()).collect();
    assert!(top3.contains(&"f0"), "top-3: {top3:?}");
    assert!(top3.contains(&"f1"), "top-3: {top3:?}");
}

// ---------------------------------------------------------------------------
// c) deterministic_predictions
// ---------------------------------------------------------------------------

/// Same config and seed must produce identical predictions across two independent runs.
#[test]
fn deterministic_predictions() {
    let (features, targets, names) = make_regression(120, 7);
    let config = ForestConfig::new(50).unwrap().with_seed(42);

    let preds1 = config.fit(&features, &targets, &names).unwrap().forest().predict_batch(&features).unwrap();
    let preds2 = config.fit(&features, &targets, &names).unwrap().forest().predict_batch(&features).unwrap();
    assert_eq!(preds1, preds2, "predictions differ across runs with the same seed");
}

// ---------------------------------------------------------------------------
// d) forest_beats_mean_baseline
// ---------------------------------------------------------------------------

/// Training-set MSE must be well below the variance of the targets.
#[test]
fn forest_beats_mean_baseline() {
    let (features, targets, names) = make_regression(150, 3);
    let fit = ForestConfig::new(100).unwrap().fit(&features, &targets, &names).unwrap();
    let predicted = fit.forest().predict_batch(&features).unwrap();

    let mean = targets.iter().sum::<f64>() / targets.len() as f64;
    let baseline = metrics::mse(&targets, &vec![mean; targets.len()]).unwrap();
    let model = metrics::mse(&targets, &predicted).unwrap();
    assert!(model < 0.15 * baseline, "model mse {model} vs baseline {baseline}");
}

// ---------------------------------------------------------------------------
// e) grid_search_end_to_end
// ---------------------------------------------------------------------------

/// Evaluate, search, and re-evaluate on a moderately sized dataset.
#[test]
fn grid_search_end_to_end() {
    let (features, targets, names) = make_regression(60, 11);
    let base = AdaptiveEvaluator::new(ModelSpec { n_estimators: 30, ..ModelSpec::default() })
        .unwrap()
        .evaluate(&features, &targets, &names)
        .unwrap();

    let grid = ParamGrid::new(vec![10, 30], vec![Some(3), None]).unwrap();
    let outcome = GridSearch::new(grid)
        .run(&features, &targets, &names, &base.split, 42)
        .unwrap();
    let SearchOutcome::Completed(result) = outcome else {
        panic!("30 training rows must be searchable");
    };

    assert_eq!(result.n_folds, 3);
    assert_eq!(result.candidates.len(), 4);
    assert!(result.best_score <= 0.0);
    assert!(result.evaluation.rmse.is_finite());
    assert!(result.evaluation.r2.is_some());
}

// ---------------------------------------------------------------------------
// f) small_datasets_degrade_gracefully
// ---------------------------------------------------------------------------

/// Datasets of 4..=8 rows must evaluate and search without error; 3 rows must fail.
#[test]
fn small_datasets_degrade_gracefully() {
    let grid = ParamGrid::new(vec![5], vec![Some(2), None]).unwrap();
    for n in 4..=8 {
        let (features, targets, names) = make_regression(n, n as u64);
        let base = AdaptiveEvaluator::default()
            .evaluate(&features, &targets, &names)
            .unwrap();
        assert!(base.split.n_test() >= 2, "n = {n}");
        assert!(base.split.n_train() >= 2, "n = {n}");

        let outcome = GridSearch::new(grid.clone())
            .run(&features, &targets, &names, &base.split, 42)
            .unwrap();
        assert!(outcome.completed().is_some(), "n = {n}");
    }

    let (features, targets, names) = make_regression(3, 0);
    assert!(matches!(
        AdaptiveEvaluator::default().evaluate(&features, &targets, &names),
        Err(RfError::InsufficientSamples { n_samples: 3, min: 4 })
    ));
}
