//! Classical moving-average seasonal decomposition.

use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::error::SeriesError;
use crate::series::DailySeries;

/// How the seasonal and trend components combine into the observed signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompositionMode {
    /// `observed = trend + seasonal + resid`.
    Additive,
    /// `observed = trend * seasonal * resid`. Requires strictly positive values.
    Multiplicative,
}

impl std::fmt::Display for DecompositionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecompositionMode::Additive => f.write_str("additive"),
            DecompositionMode::Multiplicative => f.write_str("multiplicative"),
        }
    }
}

/// Configuration for seasonal decomposition.
///
/// Construct via [`DecompositionConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter | Default    |
/// |-----------|------------|
/// | `period`  | 46         |
/// | `mode`    | `Additive` |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompositionConfig {
    period: usize,
    mode: DecompositionMode,
}

impl DecompositionConfig {
    /// Create a config with the given period (samples per seasonal cycle).
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::InvalidPeriod`] if `period` < 2.
    pub fn new(period: usize) -> Result<Self, SeriesError> {
        if period < 2 {
            return Err(SeriesError::InvalidPeriod { period });
        }
        Ok(Self {
            period,
            mode: DecompositionMode::Additive,
        })
    }

    /// Set the decomposition mode.
    #[must_use]
    pub fn with_mode(mut self, mode: DecompositionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Return the period.
    #[must_use]
    pub fn period(&self) -> usize {
        self.period
    }

    /// Return the decomposition mode.
    #[must_use]
    pub fn mode(&self) -> DecompositionMode {
        self.mode
    }

    /// Decompose a gap-free daily series into trend, seasonal, and residual.
    ///
    /// The trend is a centred moving average of width `period` (a 2×period
    /// average for even periods) and is undefined for the first and last
    /// `period / 2` samples. The seasonal pattern averages the detrended
    /// values at each position `index % period` and is normalised to zero
    /// mean (additive) or unit mean (multiplicative) over one cycle before
    /// being repeated across the series. The residual is undefined wherever
    /// the trend is.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::EmptySeries`] | the series has no entries |
    /// | [`SeriesError::InsufficientData`] | `series.len() < 2 * period` |
    /// | [`SeriesError::IrregularSeries`] | consecutive dates are not one day apart |
    /// | [`SeriesError::MissingValue`] | any date has no value |
    /// | [`SeriesError::NonPositiveValue`] | multiplicative mode and a value <= 0 |
    #[instrument(skip_all, fields(n = series.len(), period = self.period, mode = %self.mode))]
    pub fn decompose(&self, series: &DailySeries) -> Result<Decomposition, SeriesError> {
        if series.is_empty() {
            return Err(SeriesError::EmptySeries);
        }
        let n = series.len();
        let required = self.period.saturating_mul(2);
        if n < required {
            return Err(SeriesError::InsufficientData {
                len: n,
                period: self.period,
                required,
            });
        }
        if let Some((previous, next)) = series.first_irregularity() {
            return Err(SeriesError::IrregularSeries { previous, next });
        }
        let observed = series.complete_values()?;
        if self.mode == DecompositionMode::Multiplicative
            && let Some(i) = observed.iter().position(|&v| v <= 0.0)
        {
            return Err(SeriesError::NonPositiveValue {
                date: series.dates()[i],
                value: observed[i],
            });
        }

        let trend = centered_moving_average(&observed, self.period);
        let pattern = seasonal_pattern(&observed, &trend, self.period, self.mode);
        debug!(?pattern, "seasonal pattern estimated");

        let seasonal: Vec<f64> = (0..n).map(|i| pattern[i % self.period]).collect();
        let resid: Vec<Option<f64>> = observed
            .iter()
            .zip(&trend)
            .zip(&seasonal)
            .map(|((&x, t), &s)| {
                t.map(|t| match self.mode {
                    DecompositionMode::Additive => x - t - s,
                    DecompositionMode::Multiplicative => x / (t * s),
                })
            })
            .collect();

        let n_defined = trend.iter().filter(|t| t.is_some()).count();
        info!(n, n_defined, "decomposition complete");

        Ok(Decomposition {
            dates: series.dates().to_vec(),
            observed,
            trend,
            seasonal,
            resid,
            period: self.period,
            mode: self.mode,
        })
    }
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            period: 46,
            mode: DecompositionMode::Additive,
        }
    }
}

/// Centred moving average; `None` within `period / 2` samples of either end.
fn centered_moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let half = period / 2;
    let mut trend = vec![None; n];
    if n < 2 * half + 1 {
        return trend;
    }
    let p = period as f64;
    for (i, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
        let window = &values[i - half..=i + half];
        let avg = if period % 2 == 0 {
            // Weights [0.5, 1, ..., 1, 0.5] over period + 1 samples.
            let inner: f64 = window[1..window.len() - 1].iter().sum();
            (inner + 0.5 * (window[0] + window[window.len() - 1])) / p
        } else {
            window.iter().sum::<f64>() / p
        };
        *slot = Some(avg);
    }
    trend
}

/// Per-position seasonal averages, normalised over one cycle.
fn seasonal_pattern(
    observed: &[f64],
    trend: &[Option<f64>],
    period: usize,
    mode: DecompositionMode,
) -> Vec<f64> {
    let mut sums = vec![0.0f64; period];
    let mut counts = vec![0usize; period];
    for (i, (&x, t)) in observed.iter().zip(trend).enumerate() {
        if let Some(t) = t {
            let detrended = match mode {
                DecompositionMode::Additive => x - t,
                DecompositionMode::Multiplicative => x / t,
            };
            sums[i % period] += detrended;
            counts[i % period] += 1;
        }
    }

    // With n >= 2 * period every position has at least one defined sample.
    let averages: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();
    let mean = averages.iter().sum::<f64>() / period as f64;

    match mode {
        DecompositionMode::Additive => averages.iter().map(|a| a - mean).collect(),
        DecompositionMode::Multiplicative => averages.iter().map(|a| a / mean).collect(),
    }
}

/// One dated row of a [`Decomposition`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecompositionRow {
    /// Calendar date.
    pub date: NaiveDate,
    /// Observed value.
    pub observed: f64,
    /// Trend, undefined near the series boundaries.
    pub trend: Option<f64>,
    /// Seasonal component.
    pub seasonal: f64,
    /// Residual, undefined wherever the trend is.
    pub resid: Option<f64>,
}

/// Trend, seasonal, and residual components aligned with the input dates.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    dates: Vec<NaiveDate>,
    observed: Vec<f64>,
    trend: Vec<Option<f64>>,
    seasonal: Vec<f64>,
    resid: Vec<Option<f64>>,
    period: usize,
    mode: DecompositionMode,
}

impl Decomposition {
    /// Return the dates.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Return the observed values.
    #[must_use]
    pub fn observed(&self) -> &[f64] {
        &self.observed
    }

    /// Return the trend component.
    #[must_use]
    pub fn trend(&self) -> &[Option<f64>] {
        &self.trend
    }

    /// Return the seasonal component.
    #[must_use]
    pub fn seasonal(&self) -> &[f64] {
        &self.seasonal
    }

    /// Return the residual component.
    #[must_use]
    pub fn resid(&self) -> &[Option<f64>] {
        &self.resid
    }

    /// Return the period used.
    #[must_use]
    pub fn period(&self) -> usize {
        self.period
    }

    /// Return the mode used.
    #[must_use]
    pub fn mode(&self) -> DecompositionMode {
        self.mode
    }

    /// Return the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Return true if there are no rows. Never true for a successful decomposition.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Iterate over dated rows.
    pub fn rows(&self) -> impl Iterator<Item = DecompositionRow> + '_ {
        (0..self.len()).map(|i| DecompositionRow {
            date: self.dates[i],
            observed: self.observed[i],
            trend: self.trend[i],
            seasonal: self.seasonal[i],
            resid: self.resid[i],
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Days;

    use super::*;

    fn daily(values: &[f64]) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        DailySeries::from_points(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (start + Days::new(i as u64), v)),
        )
        .unwrap()
    }

    fn synthetic(n: usize, period: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * (i % period) as f64 / period as f64;
                0.4 + 0.002 * i as f64 + 0.15 * phase.sin() + 0.01 * ((i * 7 % 5) as f64 - 2.0)
            })
            .collect()
    }

    #[test]
    fn moving_average_odd_period() {
        let trend = centered_moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(trend, vec![None, Some(2.0), Some(3.0), Some(4.0), None]);
    }

    #[test]
    fn moving_average_even_period_uses_half_weights() {
        // Window for i=2 with period 4: 0.5*1 + 2 + 3 + 4 + 0.5*5 = 12, / 4 = 3.
        let trend = centered_moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 4);
        assert_eq!(trend[0], None);
        assert_eq!(trend[1], None);
        assert!((trend[2].unwrap() - 3.0).abs() < 1e-12);
        assert!((trend[3].unwrap() - 4.0).abs() < 1e-12);
        assert_eq!(trend[4], None);
        assert_eq!(trend[5], None);
    }

    #[test]
    fn additive_identity_holds_where_trend_defined() {
        let series = daily(&synthetic(120, 12));
        let result = DecompositionConfig::new(12).unwrap().decompose(&series).unwrap();
        for row in result.rows() {
            if let (Some(t), Some(r)) = (row.trend, row.resid) {
                assert!((row.observed - (t + row.seasonal + r)).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn seasonal_sums_to_zero_over_a_cycle() {
        let series = daily(&synthetic(100, 10));
        let result = DecompositionConfig::new(10).unwrap().decompose(&series).unwrap();
        for start in 0..=(result.len() - 10) {
            let sum: f64 = result.seasonal()[start..start + 10].iter().sum();
            assert!(sum.abs() < 1e-10, "cycle at {start} sums to {sum}");
        }
    }

    #[test]
    fn seasonal_pattern_repeats() {
        let series = daily(&synthetic(60, 6));
        let result = DecompositionConfig::new(6).unwrap().decompose(&series).unwrap();
        for i in 6..result.len() {
            assert_eq!(result.seasonal()[i], result.seasonal()[i - 6]);
        }
    }

    #[test]
    fn boundary_trend_undefined() {
        let series = daily(&synthetic(50, 10));
        let result = DecompositionConfig::new(10).unwrap().decompose(&series).unwrap();
        assert_eq!(result.len(), 50);
        assert!(result.trend()[..5].iter().all(Option::is_none));
        assert!(result.trend()[45..].iter().all(Option::is_none));
        assert!(result.trend()[5..45].iter().all(Option::is_some));
        assert!(result.resid()[..5].iter().all(Option::is_none));

        let interior: Vec<_> = result.rows().skip(5).take(40).collect();
        assert_eq!(interior.len(), 40);
        for row in interior {
            let (t, r) = (row.trend.unwrap(), row.resid.unwrap());
            assert!((row.observed - (t + row.seasonal + r)).abs() < 1e-10);
        }
    }

    #[test]
    fn pure_seasonal_signal_is_recovered() {
        let pattern = [0.1, -0.2, 0.3, -0.2];
        let values: Vec<f64> = (0..40).map(|i| 0.5 + pattern[i % 4]).collect();
        let result = DecompositionConfig::new(4).unwrap().decompose(&daily(&values)).unwrap();
        for i in 0..4 {
            assert!((result.seasonal()[i] - pattern[i]).abs() < 1e-12);
        }
        for r in result.resid().iter().flatten() {
            assert!(r.abs() < 1e-12);
        }
    }

    #[test]
    fn multiplicative_identity_holds() {
        let values: Vec<f64> = synthetic(80, 8).iter().map(|v| v + 1.0).collect();
        let result = DecompositionConfig::new(8)
            .unwrap()
            .with_mode(DecompositionMode::Multiplicative)
            .decompose(&daily(&values))
            .unwrap();
        let mean_seasonal: f64 = result.seasonal()[..8].iter().sum::<f64>() / 8.0;
        assert!((mean_seasonal - 1.0).abs() < 1e-10);
        for row in result.rows() {
            if let (Some(t), Some(r)) = (row.trend, row.resid) {
                assert!((row.observed - t * row.seasonal * r).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn multiplicative_rejects_non_positive() {
        let mut values = synthetic(40, 4);
        values[7] = 0.0;
        let err = DecompositionConfig::new(4)
            .unwrap()
            .with_mode(DecompositionMode::Multiplicative)
            .decompose(&daily(&values))
            .unwrap_err();
        assert!(matches!(err, SeriesError::NonPositiveValue { value, .. } if value == 0.0));
    }

    #[test]
    fn insufficient_data_error() {
        let err = DecompositionConfig::new(10)
            .unwrap()
            .decompose(&daily(&synthetic(19, 10)))
            .unwrap_err();
        assert!(matches!(
            err,
            SeriesError::InsufficientData { len: 19, period: 10, required: 20 }
        ));
    }

    #[test]
    fn huge_period_is_insufficient_not_overflow() {
        let period = usize::MAX / 2 + 1;
        let err = DecompositionConfig::new(period)
            .unwrap()
            .decompose(&daily(&synthetic(10, 5)))
            .unwrap_err();
        assert!(matches!(
            err,
            SeriesError::InsufficientData { len: 10, period: p, required: usize::MAX } if p == period
        ));
    }

    #[test]
    fn exactly_two_cycles_is_enough() {
        let result = DecompositionConfig::new(10)
            .unwrap()
            .decompose(&daily(&synthetic(20, 10)));
        assert!(result.is_ok());
    }

    #[test]
    fn empty_series_error_is_distinct() {
        let err = DecompositionConfig::default()
            .decompose(&DailySeries::empty())
            .unwrap_err();
        assert!(matches!(err, SeriesError::EmptySeries));
    }

    #[test]
    fn irregular_series_rejected() {
        let d = |day| NaiveDate::from_ymd_opt(2020, 1, day).unwrap();
        let points: Vec<(NaiveDate, f64)> = (1..=9).map(|day| (d(day), 0.5)).chain([(d(20), 0.5)]).collect();
        let err = DecompositionConfig::new(5)
            .unwrap()
            .decompose(&DailySeries::from_points(points).unwrap())
            .unwrap_err();
        assert!(matches!(err, SeriesError::IrregularSeries { .. }));
    }

    #[test]
    fn missing_value_rejected() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..10).map(|i| start + Days::new(i)).collect();
        let mut values = vec![Some(0.5); 10];
        values[9] = None;
        let series = DailySeries::new(dates, values).unwrap();
        let err = DecompositionConfig::new(5).unwrap().decompose(&series).unwrap_err();
        assert!(matches!(err, SeriesError::MissingValue { .. }));
    }

    #[test]
    fn invalid_period() {
        assert!(matches!(
            DecompositionConfig::new(1),
            Err(SeriesError::InvalidPeriod { period: 1 })
        ));
    }
}
