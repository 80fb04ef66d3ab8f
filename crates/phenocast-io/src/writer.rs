//! CSV and JSON writers for processed series, decompositions, and reports.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use phenocast_series::{DailySeries, Decomposition};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;
use crate::report::EvaluationReport;

/// File name of the gap-filled daily series.
pub const CLEAN_SERIES_FILE: &str = "ndvi_clean.csv";
/// File name of the decomposition table.
pub const DECOMPOSITION_FILE: &str = "decomposition.csv";

/// Writes pipeline outputs into one directory.
///
/// Creates the output directory on construction if it does not exist.
/// Processed series go to [`CLEAN_SERIES_FILE`] and [`DECOMPOSITION_FILE`];
/// the report goes to `{experiment}_evaluate.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Return the experiment name.
    #[must_use]
    pub fn experiment(&self) -> &ExperimentName {
        &self.experiment
    }

    /// Write the daily series to [`CLEAN_SERIES_FILE`] as `date,ndvi`.
    ///
    /// A date with no value gets an empty `ndvi` cell.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] or [`IoError::CsvWrite`] if the file
    /// cannot be written.
    #[instrument(skip_all, fields(n_rows = series.len()))]
    pub fn write_daily_series(&self, series: &DailySeries) -> Result<PathBuf, IoError> {
        let path = self.output_dir.join(CLEAN_SERIES_FILE);
        write_rows(
            &path,
            series.iter().map(|(date, ndvi)| CleanRow { date, ndvi }),
        )?;
        info!(path = %path.display(), "clean series written");
        Ok(path)
    }

    /// Write the decomposition to [`DECOMPOSITION_FILE`] as
    /// `date,observed,trend,seasonal,resid`.
    ///
    /// Undefined trend and residual cells are left empty.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] or [`IoError::CsvWrite`] if the file
    /// cannot be written.
    #[instrument(skip_all, fields(n_rows = decomposition.len(), period = decomposition.period()))]
    pub fn write_decomposition(&self, decomposition: &Decomposition) -> Result<PathBuf, IoError> {
        let path = self.output_dir.join(DECOMPOSITION_FILE);
        write_rows(
            &path,
            decomposition.rows().map(|r| DecompositionCsvRow {
                date: r.date,
                observed: r.observed,
                trend: r.trend,
                seasonal: r.seasonal,
                resid: r.resid,
            }),
        )?;
        info!(path = %path.display(), "decomposition written");
        Ok(path)
    }

    /// Write the evaluation report to `{experiment}_evaluate.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all)]
    pub fn write_report(&self, report: &EvaluationReport) -> Result<PathBuf, IoError> {
        let path = self.report_path();
        let json = serde_json::to_string_pretty(report).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "evaluation report written");
        Ok(path)
    }

    /// Return the path of the report file.
    ///
    /// Does not write anything.
    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_evaluate.json", self.experiment.as_str()))
    }
}

fn write_rows<R: Serialize>(path: &Path, rows: impl Iterator<Item = R>) -> Result<(), IoError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| IoError::CsvWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    for row in rows {
        wtr.serialize(row).map_err(|e| IoError::CsvWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    wtr.flush().map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

// --- Row structs for CSV serialization ---

#[derive(Serialize)]
struct CleanRow {
    date: NaiveDate,
    ndvi: Option<f64>,
}

#[derive(Serialize)]
struct DecompositionCsvRow {
    date: NaiveDate,
    observed: f64,
    trend: Option<f64>,
    seasonal: f64,
    resid: Option<f64>,
}
