//! Daily NDVI series: quality-gated aggregation, gap filling, and seasonal decomposition.
//!
//! Pure math library with zero I/O. Reduces per-pixel observations to one daily
//! series, reindexes it onto a regular calendar with time-weighted linear
//! interpolation, and splits it into trend, seasonal, and residual components
//! with a classical moving-average decomposition.

mod aggregate;
mod decompose;
mod error;
mod gapfill;
mod observation;
mod series;

pub use aggregate::{AggregationConfig, AggregationSummary};
pub use decompose::{Decomposition, DecompositionConfig, DecompositionMode, DecompositionRow};
pub use error::SeriesError;
pub use gapfill::{GapFillSummary, fill_gaps};
pub use observation::{Observation, PixelId, QualityFlag};
pub use series::DailySeries;
