//! Raw per-pixel observation records.

use std::fmt;

use chrono::NaiveDate;

/// A pixel identifier from the raw observation grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelId(String);

impl PixelId {
    /// Create a new pixel ID. Callers guarantee the string is non-empty.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        debug_assert!(!id.is_empty(), "pixel ID must not be empty");
        Self(id)
    }

    /// Return the pixel ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PixelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One vegetation-index reading for a pixel on a date.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Acquisition date.
    pub date: NaiveDate,
    /// Pixel the reading belongs to.
    pub pixel_id: PixelId,
    /// NDVI value.
    pub ndvi: f64,
}

/// Quality score for a pixel on a date, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityFlag {
    /// Acquisition date.
    pub date: NaiveDate,
    /// Pixel the score belongs to.
    pub pixel_id: PixelId,
    /// Quality score; higher is better.
    pub quality: f64,
}
