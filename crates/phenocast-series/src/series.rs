//! Daily series type with ordering and finiteness guarantees.

use chrono::NaiveDate;

use crate::error::SeriesError;

/// A date-indexed series of optional values.
///
/// Dates are strictly increasing and every present value is finite. Gaps come
/// in two forms: dates missing from the index entirely (irregular spacing),
/// and dates present with no value. [`fill_gaps`](crate::fill_gaps) removes
/// both.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    dates: Vec<NaiveDate>,
    values: Vec<Option<f64>>,
}

impl DailySeries {
    /// Create a new series from parallel date and value vectors.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::LengthMismatch`] | `dates.len() != values.len()` |
    /// | [`SeriesError::UnorderedDates`] | dates are not strictly increasing |
    /// | [`SeriesError::NonFiniteValue`] | a present value is NaN or infinite |
    pub fn new(dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> Result<Self, SeriesError> {
        if dates.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                n_dates: dates.len(),
                n_values: values.len(),
            });
        }
        for (index, pair) in dates.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(SeriesError::UnorderedDates {
                    previous: pair[0],
                    next: pair[1],
                    index: index + 1,
                });
            }
        }
        if let Some(i) = values
            .iter()
            .position(|v| v.is_some_and(|x| !x.is_finite()))
        {
            return Err(SeriesError::NonFiniteValue { date: dates[i] });
        }
        Ok(Self { dates, values })
    }

    /// Create a fully-populated series from `(date, value)` pairs.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DailySeries::new`].
    pub fn from_points(points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Result<Self, SeriesError> {
        let (dates, values): (Vec<_>, Vec<_>) = points.into_iter().map(|(d, v)| (d, Some(v))).unzip();
        Self::new(dates, values)
    }

    /// Create an empty series.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            dates: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Crate-internal constructor for data that already satisfies the invariants.
    pub(crate) fn new_unchecked(dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self { dates, values }
    }

    /// Return the dates.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Return the values, `None` where a date has no value.
    #[must_use]
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Iterate over `(date, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Return the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Return true if the series has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Return the first and last date, or `None` for an empty series.
    #[must_use]
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }

    /// Return the number of dates with no value.
    #[must_use]
    pub fn n_missing(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Return true if consecutive dates are exactly one day apart.
    #[must_use]
    pub fn is_regular(&self) -> bool {
        self.first_irregularity().is_none()
    }

    /// Return the first pair of consecutive dates more than one day apart.
    pub(crate) fn first_irregularity(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.dates
            .windows(2)
            .find(|pair| (pair[1] - pair[0]).num_days() != 1)
            .map(|pair| (pair[0], pair[1]))
    }

    /// Return all values if every date has one.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::MissingValue`] naming the first valueless date.
    pub fn complete_values(&self) -> Result<Vec<f64>, SeriesError> {
        self.iter()
            .map(|(date, v)| v.ok_or(SeriesError::MissingValue { date }))
            .collect()
    }
}
