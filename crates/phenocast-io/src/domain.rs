//! Domain types shared by the readers, the aligner, and the writers.

use chrono::NaiveDate;
use phenocast_series::DecompositionRow;

use crate::IoError;

/// One productivity measurement, the regression target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductivityRecord {
    /// Measurement date.
    pub date: NaiveDate,
    /// Productivity value.
    pub productivity: f64,
}

/// One row of a processed decomposition table.
///
/// Components are `None` where the table cell was blank, which happens near
/// the series boundaries where the centred trend is undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecompositionRecord {
    /// Calendar date.
    pub date: NaiveDate,
    /// Observed (gap-filled NDVI) value.
    pub observed: f64,
    /// Trend component.
    pub trend: Option<f64>,
    /// Seasonal component.
    pub seasonal: Option<f64>,
    /// Residual component.
    pub resid: Option<f64>,
}

impl DecompositionRecord {
    /// Return `[observed, trend, seasonal, resid]` if every component is defined.
    #[must_use]
    pub fn complete_features(&self) -> Option<[f64; 4]> {
        Some([self.observed, self.trend?, self.seasonal?, self.resid?])
    }
}

impl From<DecompositionRow> for DecompositionRecord {
    fn from(row: DecompositionRow) -> Self {
        Self {
            date: row.date,
            observed: row.observed,
            trend: row.trend,
            seasonal: Some(row.seasonal),
            resid: row.resid,
        }
    }
}

/// A validated experiment name used as the report file prefix.
///
/// Must be non-empty and contain only `[a-zA-Z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, IoError> {
        let name = name.into();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ExperimentName {
    fn default() -> Self {
        Self("phenocast".to_string())
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
