//! I/O layer for the phenocast pipeline.
//!
//! Reads raw observation, quality, and productivity CSVs plus the processed
//! decomposition table, aligns decomposition components with productivity by
//! date, and writes the clean series, the decomposition, and the JSON
//! evaluation report.

mod align;
mod domain;
mod error;
mod reader;
mod report;
mod writer;

pub use align::{AlignedData, FEATURE_NAMES, align};
pub use domain::{DecompositionRecord, ExperimentName, ProductivityRecord};
pub use error::IoError;
pub use reader::{DecompositionReader, ObservationReader, ProductivityReader, QualityReader};
pub use report::EvaluationReport;
pub use writer::{CLEAN_SERIES_FILE, DECOMPOSITION_FILE, ResultWriter};
