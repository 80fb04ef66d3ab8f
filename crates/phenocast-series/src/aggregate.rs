//! Quality-gated spatial aggregation of per-pixel observations into one daily series.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::error::SeriesError;
use crate::observation::{Observation, QualityFlag};
use crate::series::DailySeries;

/// Configuration for quality-gated aggregation.
///
/// # Defaults
///
/// | Parameter   | Default |
/// |-------------|---------|
/// | `threshold` | 0.8     |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationConfig {
    threshold: f64,
}

/// Counts describing what happened to each observation during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationSummary {
    /// Observations that found a quality flag.
    pub n_matched: usize,
    /// Observations with no quality flag for their (date, pixel) key.
    pub n_unmatched: usize,
    /// Matched observations dropped for scoring below the threshold.
    pub n_below_threshold: usize,
    /// Distinct dates in the output series.
    pub n_dates: usize,
}

impl AggregationConfig {
    /// Create a config with the given quality threshold.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::InvalidThreshold`] unless `threshold` is in `[0, 1]`.
    pub fn new(threshold: f64) -> Result<Self, SeriesError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SeriesError::InvalidThreshold { threshold });
        }
        Ok(Self { threshold })
    }

    /// Return the quality threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Filter observations by quality and average surviving pixels per date.
    ///
    /// Observations are matched to flags by exact `(date, pixel_id)`. Matches
    /// scoring below the threshold are discarded, as are observations with no
    /// flag. Dates with no surviving observation are absent from the output.
    /// The output is empty when nothing survives; decomposition rejects that
    /// case with [`SeriesError::EmptySeries`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::DataJoin`] | both inputs are non-empty but share no key |
    /// | [`SeriesError::NonFiniteValue`] | a surviving NDVI value is NaN or infinite |
    #[instrument(skip_all, fields(n_observations = observations.len(), n_flags = flags.len(), threshold = self.threshold))]
    pub fn aggregate(
        &self,
        observations: &[Observation],
        flags: &[QualityFlag],
    ) -> Result<(DailySeries, AggregationSummary), SeriesError> {
        let quality: HashMap<(NaiveDate, &str), f64> = flags
            .iter()
            .map(|f| ((f.date, f.pixel_id.as_str()), f.quality))
            .collect();

        let mut n_matched = 0usize;
        let mut n_unmatched = 0usize;
        let mut n_below_threshold = 0usize;
        // (sum, count) per date; BTreeMap keeps the output date-ordered.
        let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

        for obs in observations {
            let Some(&q) = quality.get(&(obs.date, obs.pixel_id.as_str())) else {
                n_unmatched += 1;
                continue;
            };
            n_matched += 1;
            if q < self.threshold {
                n_below_threshold += 1;
                continue;
            }
            let entry = by_date.entry(obs.date).or_insert((0.0, 0));
            entry.0 += obs.ndvi;
            entry.1 += 1;
        }

        if n_matched == 0 && !observations.is_empty() && !flags.is_empty() {
            return Err(SeriesError::DataJoin {
                n_observations: observations.len(),
                n_flags: flags.len(),
            });
        }
        if n_unmatched > 0 {
            debug!(n_unmatched, "observations without a quality flag dropped");
        }

        let (dates, values): (Vec<NaiveDate>, Vec<Option<f64>>) = by_date
            .into_iter()
            .map(|(date, (sum, count))| (date, Some(sum / count as f64)))
            .unzip();

        let summary = AggregationSummary {
            n_matched,
            n_unmatched,
            n_below_threshold,
            n_dates: dates.len(),
        };

        if dates.is_empty() {
            warn!(n_below_threshold, "no observation met the quality threshold");
        } else {
            info!(
                n_dates = summary.n_dates,
                n_matched,
                n_below_threshold,
                "daily series aggregated"
            );
        }

        Ok((DailySeries::new(dates, values)?, summary))
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self { threshold: 0.8 }
    }
}
