//! Random Forest regression with size-adaptive evaluation and grid search.
//!
//! Provides a hand-rolled regression forest of CART trees (variance-reduction
//! splits, bootstrap sampling, parallel training via rayon), explicit error
//! metrics, a chronological train/test evaluator that adapts its split to
//! very small datasets, contiguous k-fold cross-validation, and a grid
//! search that skips itself when there are too few rows to fold.

mod config;
mod cv;
mod error;
mod evaluate;
mod forest;
mod importance;
pub mod metrics;
mod node;
mod predict;
mod result;
mod search;
mod split;
mod tree;

pub use config::{ForestConfig, MaxFeatures, ModelSpec};
pub use cv::{CrossValidationResult, KFold};
pub use error::RfError;
pub use evaluate::{
    AdaptiveEvaluation, AdaptiveEvaluator, MIN_SAMPLES, SplitPlan, score_predictions,
    test_fraction,
};
pub use forest::RandomForest;
pub use importance::RankedFeature;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use result::{Diagnostic, EvaluationResult, ForestFit, TrainingMetadata};
pub use search::{CandidateScore, GridSearch, GridSearchResult, ParamGrid, SearchOutcome};
pub use tree::{RegressionTree, RegressionTreeConfig};
