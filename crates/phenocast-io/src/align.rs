//! Alignment of decomposed signal components with the productivity history.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::IoError;
use crate::domain::{DecompositionRecord, ProductivityRecord};

/// Feature column names, in the order [`AlignedData::features`] stores them.
pub const FEATURE_NAMES: [&str; 4] = ["ndvi", "trend", "seasonal", "resid"];

/// Aligned dataset: decomposition components matched with productivity by date.
///
/// Dates, features, and targets are stored in parallel vectors, date-ascending
/// with no duplicates. `dates[i]` corresponds to `features[i]` and `targets[i]`.
#[derive(Debug, Clone)]
pub struct AlignedData {
    dates: Vec<NaiveDate>,
    /// Feature matrix (row-major): `[ndvi, trend, seasonal, resid]` per sample.
    features: Vec<Vec<f64>>,
    targets: Vec<f64>,
    feature_names: Vec<String>,
}

impl AlignedData {
    /// Return the dates.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Return the feature matrix.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the productivity targets.
    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Return true if there are no samples. Never true for a successful alignment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Inner-join decomposition rows with productivity records on exact date equality.
///
/// Rows with any undefined component (the trend boundary) are dropped before
/// the join, so every aligned sample has fully defined features. Unmatched
/// rows on either side are dropped with a log message. The result is sorted by
/// date whatever the input order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::DataJoin`] | no usable decomposition row shares a date with a productivity record |
#[instrument(skip_all, fields(n_decomposition = decomposition.len(), n_productivity = productivity.len()))]
pub fn align(
    decomposition: &[DecompositionRecord],
    productivity: &[ProductivityRecord],
) -> Result<AlignedData, IoError> {
    let usable: Vec<(NaiveDate, [f64; 4])> = decomposition
        .iter()
        .filter_map(|r| r.complete_features().map(|f| (r.date, f)))
        .collect();
    let n_undefined = decomposition.len() - usable.len();
    if n_undefined > 0 {
        warn!(n_undefined, "dropped decomposition rows with undefined components");
    }

    let target_lookup: HashMap<NaiveDate, f64> = productivity
        .iter()
        .map(|r| (r.date, r.productivity))
        .collect();

    let mut joined: Vec<(NaiveDate, [f64; 4], f64)> = usable
        .iter()
        .filter_map(|&(date, features)| {
            target_lookup
                .get(&date)
                .map(|&target| (date, features, target))
        })
        .collect();

    if joined.is_empty() {
        return Err(IoError::DataJoin {
            n_decomposition: usable.len(),
            n_productivity: productivity.len(),
        });
    }
    joined.sort_by_key(|&(date, _, _)| date);

    let n_unmatched_decomposition = usable.len().saturating_sub(joined.len());
    let n_unmatched_productivity = productivity.len().saturating_sub(joined.len());
    if n_unmatched_decomposition > 0 || n_unmatched_productivity > 0 {
        info!(
            n_unmatched_decomposition,
            n_unmatched_productivity, "dropped rows without a matching date"
        );
    }
    info!(n_aligned = joined.len(), "alignment complete");

    let mut dates = Vec::with_capacity(joined.len());
    let mut features = Vec::with_capacity(joined.len());
    let mut targets = Vec::with_capacity(joined.len());
    for (date, row, target) in joined {
        dates.push(date);
        features.push(row.to_vec());
        targets.push(target);
    }

    Ok(AlignedData {
        dates,
        features,
        targets,
        feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
    })
}
