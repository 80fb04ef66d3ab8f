//! CSV readers for raw observations, quality flags, productivity, and the
//! processed decomposition table, with full input validation.
//!
//! Every reader locates its columns by header name, so column order is free
//! and extra columns are ignored. Dates are `YYYY-MM-DD`; a trailing time
//! component (`2023-04-01 00:00:00`) is accepted and truncated.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use phenocast_series::{Observation, PixelId, QualityFlag};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{DecompositionRecord, ProductivityRecord};

/// An open CSV file with its required columns resolved.
struct Table {
    path: PathBuf,
    reader: csv::Reader<File>,
    columns: Vec<usize>,
}

impl Table {
    fn open(path: &Path, required: &[&'static str]) -> Result<Self, IoError> {
        let file = File::open(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        // flexible(true) lets short rows through so a missing cell surfaces
        // as a value error naming the column instead of a bare CsvParse.
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = reader.headers().map_err(|e| csv_error(path, e))?;
        let columns = required
            .iter()
            .map(|&column| {
                header
                    .iter()
                    .position(|h| h == column)
                    .ok_or_else(|| IoError::MissingColumn {
                        path: path.to_path_buf(),
                        column,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(n_header = header.len(), ?required, "resolved CSV columns");

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            columns,
        })
    }

    /// Visit every data row as the resolved cells, in `required` order.
    fn for_each_row(
        mut self,
        mut visit: impl FnMut(&Path, usize, &[&str]) -> Result<(), IoError>,
    ) -> Result<usize, IoError> {
        let mut n_rows = 0usize;
        for (row_index, result) in self.reader.records().enumerate() {
            let record = result.map_err(|e| csv_error(&self.path, e))?;
            let cells: Vec<&str> = self
                .columns
                .iter()
                .map(|&c| record.get(c).unwrap_or(""))
                .collect();
            visit(&self.path, row_index, &cells)?;
            n_rows += 1;
        }
        if n_rows == 0 {
            return Err(IoError::EmptyDataset { path: self.path });
        }
        Ok(n_rows)
    }
}

fn csv_error(path: &Path, e: csv::Error) -> IoError {
    IoError::CsvParse {
        path: path.to_path_buf(),
        offset: e.position().map_or(0, |p| p.byte()),
        source: e,
    }
}

/// Parse a `YYYY-MM-DD` date, ignoring anything after the first space or `T`.
fn parse_date(path: &Path, row_index: usize, raw: &str) -> Result<NaiveDate, IoError> {
    let day = raw.split([' ', 'T']).next().unwrap_or("");
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| IoError::InvalidDate {
        path: path.to_path_buf(),
        row_index,
        raw: raw.to_string(),
    })
}

fn parse_finite(
    path: &Path,
    row_index: usize,
    column: &'static str,
    raw: &str,
) -> Result<f64, IoError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(IoError::NonFiniteValue {
            path: path.to_path_buf(),
            row_index,
            column,
            raw: raw.to_string(),
        }),
    }
}

/// Like [`parse_finite`], but a blank cell means "undefined".
fn parse_optional(
    path: &Path,
    row_index: usize,
    column: &'static str,
    raw: &str,
) -> Result<Option<f64>, IoError> {
    if raw.is_empty() {
        return Ok(None);
    }
    parse_finite(path, row_index, column, raw).map(Some)
}

fn parse_pixel_id(path: &Path, row_index: usize, raw: &str) -> Result<PixelId, IoError> {
    if raw.is_empty() {
        return Err(IoError::EmptyPixelId {
            path: path.to_path_buf(),
            row_index,
        });
    }
    Ok(PixelId::new(raw))
}

/// Reject the second occurrence of a key, naming both rows.
fn check_unique<K: std::hash::Hash + Eq>(
    seen: &mut HashMap<K, usize>,
    key: K,
    row_index: usize,
    path: &Path,
    render: impl FnOnce() -> String,
) -> Result<(), IoError> {
    if let Some(&first_row) = seen.get(&key) {
        return Err(IoError::DuplicateKey {
            path: path.to_path_buf(),
            key: render(),
            first_row,
            second_row: row_index,
        });
    }
    seen.insert(key, row_index);
    Ok(())
}

/// Reads per-pixel NDVI observations.
///
/// Required columns: `date`, `pixel_id`, `ndvi`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | A required column is absent |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InvalidDate`] | Unparseable date cell |
/// | [`IoError::EmptyPixelId`] | Blank `pixel_id` cell |
/// | [`IoError::NonFiniteValue`] | `ndvi` is NaN, Inf, or unparseable |
pub struct ObservationReader {
    path: PathBuf,
}

impl ObservationReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<Observation>, IoError> {
        let mut observations = Vec::new();
        Table::open(&self.path, &["date", "pixel_id", "ndvi"])?.for_each_row(
            |path, row_index, cells| {
                observations.push(Observation {
                    date: parse_date(path, row_index, cells[0])?,
                    pixel_id: parse_pixel_id(path, row_index, cells[1])?,
                    ndvi: parse_finite(path, row_index, "ndvi", cells[2])?,
                });
                Ok(())
            },
        )?;
        info!(n_observations = observations.len(), "observations loaded");
        Ok(observations)
    }
}

/// Reads per-pixel quality scores.
///
/// Required columns: `date`, `pixel_id`, `quality`. Each `(date, pixel_id)`
/// pair may appear once.
///
/// # Errors
///
/// Everything [`ObservationReader`] returns, plus:
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::QualityOutOfRange`] | `quality` outside `[0, 1]` |
/// | [`IoError::DuplicateKey`] | A `(date, pixel_id)` pair repeats |
pub struct QualityReader {
    path: PathBuf,
}

impl QualityReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<QualityFlag>, IoError> {
        let mut flags = Vec::new();
        let mut seen: HashMap<(NaiveDate, String), usize> = HashMap::new();
        Table::open(&self.path, &["date", "pixel_id", "quality"])?.for_each_row(
            |path, row_index, cells| {
                let date = parse_date(path, row_index, cells[0])?;
                let pixel_id = parse_pixel_id(path, row_index, cells[1])?;
                let quality = parse_finite(path, row_index, "quality", cells[2])?;
                if !(0.0..=1.0).contains(&quality) {
                    return Err(IoError::QualityOutOfRange {
                        path: path.to_path_buf(),
                        row_index,
                        value: quality,
                    });
                }
                check_unique(
                    &mut seen,
                    (date, pixel_id.as_str().to_string()),
                    row_index,
                    path,
                    || format!("({date}, {pixel_id})"),
                )?;
                flags.push(QualityFlag {
                    date,
                    pixel_id,
                    quality,
                });
                Ok(())
            },
        )?;
        info!(n_flags = flags.len(), "quality flags loaded");
        Ok(flags)
    }
}

/// Reads the productivity history.
///
/// Required columns: `date`, `productivity`. Each date may appear once.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | A required column is absent |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InvalidDate`] | Unparseable date cell |
/// | [`IoError::NonFiniteValue`] | `productivity` is NaN, Inf, or unparseable |
/// | [`IoError::DuplicateKey`] | A date repeats |
pub struct ProductivityReader {
    path: PathBuf,
}

impl ProductivityReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<ProductivityRecord>, IoError> {
        let mut records = Vec::new();
        let mut seen: HashMap<NaiveDate, usize> = HashMap::new();
        Table::open(&self.path, &["date", "productivity"])?.for_each_row(
            |path, row_index, cells| {
                let date = parse_date(path, row_index, cells[0])?;
                let productivity = parse_finite(path, row_index, "productivity", cells[1])?;
                check_unique(&mut seen, date, row_index, path, || date.to_string())?;
                records.push(ProductivityRecord { date, productivity });
                Ok(())
            },
        )?;
        info!(n_records = records.len(), "productivity history loaded");
        Ok(records)
    }
}

/// Reads a processed decomposition table as written by
/// [`ResultWriter::write_decomposition`](crate::ResultWriter::write_decomposition).
///
/// Required columns: `date`, `observed`, `trend`, `seasonal`, `resid`. Blank
/// component cells mean the component is undefined on that date; `observed`
/// must always be present. Each date may appear once.
///
/// # Errors
///
/// Same table as [`ProductivityReader`], applied to these columns.
pub struct DecompositionReader {
    path: PathBuf,
}

impl DecompositionReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<DecompositionRecord>, IoError> {
        let mut records = Vec::new();
        let mut seen: HashMap<NaiveDate, usize> = HashMap::new();
        Table::open(
            &self.path,
            &["date", "observed", "trend", "seasonal", "resid"],
        )?
        .for_each_row(|path, row_index, cells| {
            let date = parse_date(path, row_index, cells[0])?;
            check_unique(&mut seen, date, row_index, path, || date.to_string())?;
            records.push(DecompositionRecord {
                date,
                observed: parse_finite(path, row_index, "observed", cells[1])?,
                trend: parse_optional(path, row_index, "trend", cells[2])?,
                seasonal: parse_optional(path, row_index, "seasonal", cells[3])?,
                resid: parse_optional(path, row_index, "resid", cells[4])?,
            });
            Ok(())
        })?;
        let n_undefined = records
            .iter()
            .filter(|r| r.complete_features().is_none())
            .count();
        info!(n_rows = records.len(), n_undefined, "decomposition table loaded");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, month, day).unwrap()
    }

    #[test]
    fn read_observations() {
        let csv = "date,pixel_id,ndvi\n2023-04-01,p1,0.41\n2023-04-01,p2,0.39\n2023-04-02,p1,0.45\n";
        let f = write_csv(csv);
        let obs = ObservationReader::new(f.path()).read().unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].date, d(4, 1));
        assert_eq!(obs[1].pixel_id.as_str(), "p2");
        assert!((obs[2].ndvi - 0.45).abs() < 1e-12);
    }

    #[test]
    fn columns_located_by_name_and_extras_ignored() {
        let csv = "ndvi,sensor,pixel_id,date\n0.5,S2,p7,2023-05-10\n";
        let f = write_csv(csv);
        let obs = ObservationReader::new(f.path()).read().unwrap();
        assert_eq!(obs[0].date, d(5, 10));
        assert_eq!(obs[0].pixel_id.as_str(), "p7");
        assert!((obs[0].ndvi - 0.5).abs() < 1e-12);
    }

    #[test]
    fn timestamp_suffix_is_truncated() {
        let csv = "date,productivity\n2023-06-01 00:00:00,3.2\n2023-06-02T12:30:00,3.4\n";
        let f = write_csv(csv);
        let records = ProductivityReader::new(f.path()).read().unwrap();
        assert_eq!(records[0].date, d(6, 1));
        assert_eq!(records[1].date, d(6, 2));
    }

    #[test]
    fn error_file_not_found() {
        let result = ObservationReader::new(Path::new("/nonexistent/ndvi.csv")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_missing_column() {
        let f = write_csv("date,pixel,ndvi\n2023-04-01,p1,0.4\n");
        let result = ObservationReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::MissingColumn { column: "pixel_id", .. })
        ));
    }

    #[test]
    fn error_empty_dataset() {
        let f = write_csv("date,productivity\n");
        let result = ProductivityReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn error_invalid_date() {
        let f = write_csv("date,productivity\n2023-04-01,1.0\n04/02/2023,1.1\n");
        let result = ProductivityReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::InvalidDate { row_index: 1, .. })));
    }

    #[test]
    fn error_non_finite_ndvi() {
        for bad in ["NaN", "inf", "abc", ""] {
            let f = write_csv(&format!("date,pixel_id,ndvi\n2023-04-01,p1,{bad}\n"));
            let result = ObservationReader::new(f.path()).read();
            assert!(
                matches!(result, Err(IoError::NonFiniteValue { column: "ndvi", .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn error_empty_pixel_id() {
        let f = write_csv("date,pixel_id,ndvi\n2023-04-01,,0.4\n");
        let result = ObservationReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyPixelId { row_index: 0, .. })));
    }

    #[test]
    fn quality_bounds_are_inclusive() {
        let f = write_csv("date,pixel_id,quality\n2023-04-01,p1,0.0\n2023-04-01,p2,1.0\n");
        let flags = QualityReader::new(f.path()).read().unwrap();
        assert_eq!(flags.len(), 2);
    }

    #[test]
    fn error_quality_out_of_range() {
        let f = write_csv("date,pixel_id,quality\n2023-04-01,p1,1.2\n");
        let result = QualityReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::QualityOutOfRange { .. })));
    }

    #[test]
    fn error_duplicate_quality_key() {
        let csv = "date,pixel_id,quality\n2023-04-01,p1,0.9\n2023-04-01,p2,0.9\n2023-04-01,p1,0.5\n";
        let f = write_csv(csv);
        let result = QualityReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::DuplicateKey {
                first_row: 0,
                second_row: 2,
                ..
            })
        ));
    }

    #[test]
    fn same_pixel_on_different_dates_is_not_duplicate() {
        let f = write_csv("date,pixel_id,quality\n2023-04-01,p1,0.9\n2023-04-02,p1,0.9\n");
        assert_eq!(QualityReader::new(f.path()).read().unwrap().len(), 2);
    }

    #[test]
    fn error_duplicate_productivity_date() {
        let f = write_csv("date,productivity\n2023-04-01,1.0\n2023-04-01 00:00:00,2.0\n");
        let result = ProductivityReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::DuplicateKey { .. })));
    }

    #[test]
    fn decomposition_blank_cells_are_undefined() {
        let csv = "date,observed,trend,seasonal,resid\n\
                   2023-04-01,0.40,,0.01,\n\
                   2023-04-02,0.42,0.40,0.015,0.005\n";
        let f = write_csv(csv);
        let rows = DecompositionReader::new(f.path()).read().unwrap();
        assert_eq!(rows[0].trend, None);
        assert_eq!(rows[0].resid, None);
        assert_eq!(rows[0].seasonal, Some(0.01));
        assert_eq!(rows[1].complete_features(), Some([0.42, 0.40, 0.015, 0.005]));
    }

    #[test]
    fn decomposition_observed_is_required() {
        let f = write_csv("date,observed,trend,seasonal,resid\n2023-04-01,,0.4,0.0,0.0\n");
        let result = DecompositionReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::NonFiniteValue { column: "observed", .. })
        ));
    }
}
