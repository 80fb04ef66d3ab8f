use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value.
    pub(crate) threshold: f64,
    /// Weighted impurity decrease from this split (MDI formula).
    pub(crate) impurity_decrease: f64,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Find the variance-minimising split among a random subset of features.
///
/// For each of `max_features` randomly chosen features, sorts the
/// `(value, target)` pairs and scans left-to-right, moving one sample at a
/// time from the right child to the left while keeping running sums of the
/// targets and their squares. The split with the largest weighted variance
/// decrease wins; ties keep the first candidate found.
///
/// Returns `None` when no valid split exists (all values identical,
/// or every boundary would violate `min_samples_leaf`).
///
/// # Column-major layout
///
/// `features` is column-major: `features[feature_idx][sample_idx]`.
/// `sample_indices` are indices into these inner Vecs.
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    targets: &[f64],
    sample_indices: &[usize],
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let (parent_sum, parent_sum_sq) = sample_indices.iter().fold((0.0, 0.0), |(s, sq), &si| {
        let y = targets[si];
        (s + y, sq + y * y)
    });
    let parent_impurity = Impurity::from_sums(parent_sum, parent_sum_sq, n_samples);

    // Partial Fisher-Yates: shuffle only the first `max_features` positions.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in &feature_order[..take] {
        let feat_col = &features[feat_idx];

        let mut sorted: Vec<(f64, f64)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], targets[si]))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let (mut left_sum, mut left_sum_sq) = (0.0f64, 0.0f64);

        for i in 0..(n_samples - 1) {
            let (val_i, y) = sorted[i];
            left_sum += y;
            left_sum_sq += y * y;

            let n_left = i + 1;
            let n_right = n_samples - n_left;

            // No boundary between equal feature values.
            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let left_impurity = Impurity::from_sums(left_sum, left_sum_sq, n_left);
            let right_impurity = Impurity::from_sums(
                parent_sum - left_sum,
                parent_sum_sq - left_sum_sq,
                n_right,
            );

            let decrease = (n_samples as f64) * parent_impurity.value()
                - (n_left as f64) * left_impurity.value()
                - (n_right as f64) * right_impurity.value();

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((FeatureIndex::new(feat_idx), (val_i + val_next) / 2.0));
            }
        }
    }

    let (feature, threshold) = best?;

    let feat_col = &features[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .copied()
        .partition(|&si| feat_col[si] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        impurity_decrease: best_decrease.max(0.0),
        left_indices,
        right_indices,
    })
}
