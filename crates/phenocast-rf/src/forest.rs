//! Regression forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{ForestConfig, MaxFeatures};
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::result::{ForestFit, TrainingMetadata};
use crate::tree::{RegressionTree, RegressionTreeConfig, validate_training_data};

/// A fitted regression forest ensemble.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub(crate) trees: Vec<RegressionTree>,
    pub(crate) n_features: usize,
    pub(crate) feature_names: Vec<String>,
}

/// Resolve `MaxFeatures` to a concrete count.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, RfError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(RfError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Draw `n_samples` row indices with replacement.
fn bootstrap_indices(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Train the regression forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &ForestConfig,
    features: &[Vec<f64>],
    targets: &[f64],
    feature_names: &[String],
) -> Result<ForestFit, RfError> {
    let (n_samples, n_features) = validate_training_data(features, targets)?;
    if feature_names.len() != n_features {
        return Err(RfError::FeatureNameMismatch {
            n_features,
            n_names: feature_names.len(),
        });
    }
    let max_features_resolved = resolve_max_features(config.max_features, n_features)?;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        max_features = max_features_resolved,
        bootstrap = config.bootstrap,
        "training random forest"
    );

    // Per-tree seeds come from the master RNG up front so results do not
    // depend on thread scheduling.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let tree_config = RegressionTreeConfig::new()
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved));
    let bootstrap = config.bootstrap;

    let trees: Vec<RegressionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let tree_config = tree_config.clone().with_seed(rng.r#gen());
            if bootstrap {
                let indices = bootstrap_indices(n_samples, &mut rng);
                let boot_features: Vec<Vec<f64>> =
                    indices.iter().map(|&i| features[i].clone()).collect();
                let boot_targets: Vec<f64> = indices.iter().map(|&i| targets[i]).collect();
                tree_config.fit(&boot_features, &boot_targets)
            } else {
                tree_config.fit(features, targets)
            }
        })
        .collect::<Result<_, _>>()?;

    let per_tree_importances: Vec<Vec<f64>> =
        trees.iter().map(RegressionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree_importances, feature_names);

    debug!(
        n_trees_trained = trees.len(),
        total_nodes = trees.iter().map(RegressionTree::n_nodes).sum::<usize>(),
        "tree training complete"
    );

    let forest = RandomForest {
        trees,
        n_features,
        feature_names: feature_names.to_vec(),
    };

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_samples,
        max_features_resolved,
    };

    Ok(ForestFit::new(forest, importances, metadata))
}

#[cfg(test)]
mod tests {
    use crate::config::{ForestConfig, MaxFeatures};

    /// Piecewise-linear target on feature 0; feature 1 is constant noise.
    fn make_regression_data() -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
        let features: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64 * 0.5, 0.5]).collect();
        let targets: Vec<f64> = (0..60)
            .map(|i| if i < 30 { i as f64 * 0.1 } else { 10.0 + i as f64 * 0.05 })
            .collect();
        let names = vec!["x".to_string(), "y".to_string()];
        (features, targets, names)
    }

    #[test]
    fn fits_training_data_closely() {
        let (features, targets, names) = make_regression_data();
        let fit = ForestConfig::new(50).unwrap().fit(&features, &targets, &names).unwrap();

        let predictions = fit.forest().predict_batch(&features).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(&targets)
            .map(|(p, y)| (p - y).powi(2))
            .sum::<f64>()
            / targets.len() as f64;
        assert!(mse < 0.5, "training mse = {mse}");
    }

    #[test]
    fn feature_importances_sum_to_one() {
        let (features, targets, names) = make_regression_data();
        let fit = ForestConfig::new(20).unwrap().fit(&features, &targets, &names).unwrap();

        let total: f64 = fit.importances().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
        assert_eq!(fit.importances()[0].name, "x");
        assert_eq!(fit.importances()[0].rank, 1);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, targets, names) = make_regression_data();
        let fit = |seed| {
            ForestConfig::new(10)
                .unwrap()
                .with_seed(seed)
                .fit(&features, &targets, &names)
                .unwrap()
        };
        let preds1 = fit(99).forest().predict_batch(&features).unwrap();
        let preds2 = fit(99).forest().predict_batch(&features).unwrap();
        assert_eq!(preds1, preds2);
    }

    #[test]
    fn without_bootstrap_every_tree_interpolates() {
        let (features, targets, names) = make_regression_data();
        let fit = ForestConfig::new(5)
            .unwrap()
            .with_bootstrap(false)
            .fit(&features, &targets, &names)
            .unwrap();
        let predictions = fit.forest().predict_batch(&features).unwrap();
        for (p, y) in predictions.iter().zip(&targets) {
            assert!((p - y).abs() < 1e-9);
        }
    }

    #[test]
    fn single_sample_forest_predicts_that_sample() {
        let names = vec!["x".to_string()];
        let fit = ForestConfig::new(3).unwrap().fit(&[vec![1.0]], &[4.2], &names).unwrap();
        assert_eq!(fit.forest().predict(&[100.0]).unwrap(), 4.2);
    }

    #[test]
    fn invalid_tree_count_error() {
        assert!(ForestConfig::new(0).is_err());
    }

    #[test]
    fn empty_dataset_error() {
        let err = ForestConfig::new(10).unwrap().fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, crate::RfError::EmptyDataset));
    }

    #[test]
    fn feature_names_must_match_columns() {
        let (features, targets, _) = make_regression_data();
        for names in [vec!["x".to_string()], vec!["x".into(), "y".into(), "z".into()]] {
            let err = ForestConfig::new(3)
                .unwrap()
                .fit(&features, &targets, &names)
                .unwrap_err();
            assert!(matches!(
                err,
                crate::RfError::FeatureNameMismatch { n_features: 2, n_names } if n_names == names.len()
            ));
        }
    }

    #[test]
    fn invalid_max_features_error() {
        let (features, targets, names) = make_regression_data();
        let err = ForestConfig::new(3)
            .unwrap()
            .with_max_features(MaxFeatures::Fixed(5))
            .fit(&features, &targets, &names)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::RfError::InvalidMaxFeatures { max_features: 5, n_features: 2 }
        ));
    }

    #[test]
    fn sqrt_max_features_trains() {
        let (features, targets, names) = make_regression_data();
        let fit = ForestConfig::new(10)
            .unwrap()
            .with_max_features(MaxFeatures::Sqrt)
            .fit(&features, &targets, &names)
            .unwrap();
        assert_eq!(fit.metadata().max_features_resolved, 2);
    }
}
