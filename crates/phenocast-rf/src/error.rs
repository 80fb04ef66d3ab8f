/// Errors from regression forest training, evaluation, and search.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the feature name list does not match the feature columns.
    #[error("{n_names} feature names given for {n_features} feature columns")]
    FeatureNameMismatch {
        /// Number of feature columns in the dataset.
        n_features: usize,
        /// Number of feature names provided.
        n_names: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a target value is NaN or infinite.
    #[error("non-finite target at sample {sample_index}")]
    NonFiniteTarget {
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the feature rows and targets differ in length.
    #[error("{n_samples} feature rows but {n_targets} targets")]
    TargetLengthMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of target values.
        n_targets: usize,
    },

    /// Returned when actual and predicted slices passed to a metric differ in length.
    #[error("metric inputs differ in length: {n_actual} actual, {n_predicted} predicted")]
    MetricLengthMismatch {
        /// Number of actual values.
        n_actual: usize,
        /// Number of predicted values.
        n_predicted: usize,
    },

    /// Returned when a metric is computed over zero samples.
    #[error("cannot compute a metric over zero samples")]
    EmptyMetricInput,

    /// Returned when the dataset is too small for a train/test split.
    #[error("need at least {min} samples for a train/test split, got {n_samples}")]
    InsufficientSamples {
        /// Number of samples available.
        n_samples: usize,
        /// Minimum number required.
        min: usize,
    },

    /// Returned when there are fewer samples than cross-validation folds.
    #[error("cannot split {n_samples} samples into {n_folds} folds")]
    TooFewSamplesForFolds {
        /// Number of samples available.
        n_samples: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when a split plan does not cover the rows it is applied to.
    #[error("split plan covers {n_split} rows but the dataset has {n_samples}")]
    SplitMismatch {
        /// Number of rows in the dataset.
        n_samples: usize,
        /// Number of rows the split plan covers.
        n_split: usize,
    },

    /// Returned when a hyperparameter grid has no candidates.
    #[error("hyperparameter grid is empty")]
    EmptyGrid,
}
