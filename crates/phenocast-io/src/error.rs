use std::path::PathBuf;

/// Errors from reading raw and processed CSV inputs, aligning them, and
/// writing results.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or cannot be opened.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a CSV record is malformed.
    #[error("CSV parse error in {path} at byte {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset of the error.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a required column is absent from the header row.
    #[error("{path} has no `{column}` column")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// Name of the missing column.
        column: &'static str,
    },

    /// Returned when the CSV has a header but zero data rows.
    #[error("empty dataset: {path} has no data rows")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a date cell is not `YYYY-MM-DD` (optionally followed by a time).
    #[error("invalid date {raw:?} in {path} at row {row_index}")]
    InvalidDate {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// The raw cell content.
        raw: String,
    },

    /// Returned when a numeric cell is NaN, Inf, or unparseable.
    #[error("non-finite value in {path} at row {row_index}, column `{column}`: {raw:?}")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// Column name.
        column: &'static str,
        /// The raw cell content.
        raw: String,
    },

    /// Returned when a quality score lies outside `[0, 1]`.
    #[error("quality {value} out of range [0, 1] in {path} at row {row_index}")]
    QualityOutOfRange {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// The offending score.
        value: f64,
    },

    /// Returned when a pixel ID cell is blank.
    #[error("empty pixel_id in {path} at row {row_index}")]
    EmptyPixelId {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
    },

    /// Returned when a key that must be unique appears twice.
    #[error("duplicate key {key} in {path} (rows {first_row} and {second_row})")]
    DuplicateKey {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated key, rendered for display.
        key: String,
        /// Row index of first occurrence.
        first_row: usize,
        /// Row index of second occurrence.
        second_row: usize,
    },

    /// Returned when decomposition and productivity rows share no date.
    #[error(
        "no decomposition row matched a productivity date \
         ({n_decomposition} usable decomposition rows, {n_productivity} productivity rows)"
    )]
    DataJoin {
        /// Decomposition rows with fully defined components.
        n_decomposition: usize,
        /// Productivity records supplied.
        n_productivity: usize,
    },

    /// Returned when the experiment name contains invalid characters.
    #[error("invalid experiment name: {name:?} (must match [a-zA-Z0-9_-]+)")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("failed to create output directory: {path}")]
    OutputDirCreate {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a CSV row cannot be written.
    #[error("failed to write CSV to {path}")]
    CsvWrite {
        /// Output file path.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the report cannot be serialized.
    #[error("failed to serialize report for {path}")]
    Serialize {
        /// Output file path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when an output file cannot be written.
    #[error("failed to write file: {path}")]
    WriteFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
