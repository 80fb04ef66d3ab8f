//! Error types for daily series construction, aggregation, and decomposition.

use chrono::NaiveDate;

/// Errors from building, aggregating, gap-filling, or decomposing a daily series.
#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    /// Returned when the date and value vectors have different lengths.
    #[error("series has {n_dates} dates but {n_values} values")]
    LengthMismatch {
        /// Number of dates supplied.
        n_dates: usize,
        /// Number of values supplied.
        n_values: usize,
    },

    /// Returned when dates are not strictly increasing.
    #[error("dates must be strictly increasing: {previous} is followed by {next} at index {index}")]
    UnorderedDates {
        /// The date preceding the violation.
        previous: NaiveDate,
        /// The offending date.
        next: NaiveDate,
        /// Position of the offending date.
        index: usize,
    },

    /// Returned when a present value is NaN or infinite.
    #[error("non-finite value on {date}")]
    NonFiniteValue {
        /// Date carrying the non-finite value.
        date: NaiveDate,
    },

    /// Returned when the quality threshold lies outside [0, 1].
    #[error("quality threshold must be in [0, 1], got {threshold}")]
    InvalidThreshold {
        /// The invalid threshold.
        threshold: f64,
    },

    /// Returned when observations and quality flags share no (date, pixel) key.
    #[error("no observation matched a quality flag ({n_observations} observations, {n_flags} flags)")]
    DataJoin {
        /// Number of observations supplied.
        n_observations: usize,
        /// Number of quality flags supplied.
        n_flags: usize,
    },

    /// Returned when the seasonal period is below 2.
    #[error("period must be at least 2, got {period}")]
    InvalidPeriod {
        /// The invalid period.
        period: usize,
    },

    /// Returned when decomposition is requested on a series with no entries,
    /// typically because no observation met the quality threshold.
    #[error("cannot decompose an empty series (no observation survived quality filtering)")]
    EmptySeries,

    /// Returned when the series is shorter than two full seasonal cycles.
    #[error("decomposition with period {period} needs at least {required} observations, got {len}")]
    InsufficientData {
        /// Number of entries in the series.
        len: usize,
        /// The seasonal period.
        period: usize,
        /// Minimum length (`2 * period`).
        required: usize,
    },

    /// Returned when consecutive dates are not exactly one day apart.
    #[error("series is not daily-regular: {previous} is followed by {next}")]
    IrregularSeries {
        /// The date preceding the gap.
        previous: NaiveDate,
        /// The date following the gap.
        next: NaiveDate,
    },

    /// Returned when decomposition meets a date with no value.
    #[error("missing value on {date}; fill gaps before decomposing")]
    MissingValue {
        /// The valueless date.
        date: NaiveDate,
    },

    /// Returned when multiplicative decomposition meets a value <= 0.
    #[error("multiplicative decomposition requires positive values, got {value} on {date}")]
    NonPositiveValue {
        /// Date of the offending value.
        date: NaiveDate,
        /// The offending value.
        value: f64,
    },
}
