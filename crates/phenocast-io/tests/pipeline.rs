//! End-to-end integration tests: raw CSV -> preprocess -> CSV -> align ->
//! evaluate/search -> JSON -> deserialize.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use phenocast_io::{
    DECOMPOSITION_FILE, DecompositionReader, EvaluationReport, ExperimentName, IoError,
    ObservationReader, ProductivityReader, QualityReader, ResultWriter, align,
};
use phenocast_rf::{AdaptiveEvaluator, GridSearch, ModelSpec, ParamGrid};
use phenocast_series::{AggregationConfig, DecompositionConfig, fill_gaps};
use tempfile::TempDir;

const PERIOD: usize = 16;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
}

fn date(day: usize) -> NaiveDate {
    start() + Days::new(day as u64)
}

fn ndvi(day: usize, pixel: usize) -> f64 {
    let phase = 2.0 * std::f64::consts::PI * (day % PERIOD) as f64 / PERIOD as f64;
    0.4 + 0.001 * day as f64 + 0.15 * phase.sin() + 0.005 * pixel as f64
}

/// Write raw inputs: 3 pixels every 2 days, one pixel always low quality,
/// and a productivity record every 4th day.
fn write_raw_inputs(dir: &Path, n_days: usize) -> (PathBuf, PathBuf, PathBuf) {
    let mut obs = String::from("date,pixel_id,ndvi\n");
    let mut quality = String::from("date,pixel_id,quality\n");
    for day in (0..n_days).step_by(2) {
        for pixel in 0..3 {
            writeln!(obs, "{},p{pixel},{}", date(day), ndvi(day, pixel)).unwrap();
            let q = if pixel == 2 { 0.3 } else { 0.95 };
            writeln!(quality, "{} 00:00:00,p{pixel},{q}", date(day)).unwrap();
        }
    }
    let mut productivity = String::from("date,productivity\n");
    for day in (0..n_days).step_by(4) {
        let target = 10.0 * ndvi(day, 0) + 0.01 * day as f64;
        writeln!(productivity, "{},{target}", date(day)).unwrap();
    }

    let paths = (
        dir.join("ndvi_timeseries.csv"),
        dir.join("quality_flags.csv"),
        dir.join("productivity_history.csv"),
    );
    fs::write(&paths.0, obs).unwrap();
    fs::write(&paths.1, quality).unwrap();
    fs::write(&paths.2, productivity).unwrap();
    paths
}

/// Run the preprocessing half and return the decomposition CSV path.
fn preprocess(raw: &Path, processed: &Path, n_days: usize) -> PathBuf {
    let (obs_path, quality_path, _) = write_raw_inputs(raw, n_days);
    let observations = ObservationReader::new(&obs_path).read().unwrap();
    let flags = QualityReader::new(&quality_path).read().unwrap();

    let (series, summary) = AggregationConfig::default()
        .aggregate(&observations, &flags)
        .unwrap();
    assert_eq!(summary.n_below_threshold, summary.n_matched / 3);
    let (filled, _) = fill_gaps(&series);
    let decomposition = DecompositionConfig::new(PERIOD)
        .unwrap()
        .decompose(&filled)
        .unwrap();

    let writer = ResultWriter::new(processed, ExperimentName::default()).unwrap();
    writer.write_daily_series(&filled).unwrap();
    writer.write_decomposition(&decomposition).unwrap()
}

#[test]
fn preprocess_then_train_round_trip() {
    let raw = TempDir::new().unwrap();
    let processed = TempDir::new().unwrap();
    let n_days = 161;
    let decomposition_path = preprocess(raw.path(), processed.path(), n_days);
    assert_eq!(decomposition_path, processed.path().join(DECOMPOSITION_FILE));

    // Clean series: one row per calendar day over the observed range.
    let clean = fs::read_to_string(processed.path().join("ndvi_clean.csv")).unwrap();
    assert_eq!(clean.lines().count(), 1 + n_days);

    // Train half, reading back what preprocessing wrote.
    let records = DecompositionReader::new(&decomposition_path).read().unwrap();
    let productivity = ProductivityReader::new(&raw.path().join("productivity_history.csv"))
        .read()
        .unwrap();
    let aligned = align(&records, &productivity).unwrap();

    // Boundary rows (first and last PERIOD / 2 days) carry no trend and drop out.
    let half = PERIOD / 2;
    assert!(aligned.dates().iter().all(|d| *d >= date(half) && *d < date(n_days - half)));
    assert!(aligned.dates().windows(2).all(|w| w[0] < w[1]));

    let spec = ModelSpec {
        n_estimators: 20,
        max_depth: None,
        seed: 42,
    };
    let base = AdaptiveEvaluator::new(spec)
        .unwrap()
        .evaluate(aligned.features(), aligned.targets(), aligned.feature_names())
        .unwrap();
    let grid = ParamGrid::new(vec![10, 20], vec![Some(4), None]).unwrap();
    let search = GridSearch::new(grid)
        .run(
            aligned.features(),
            aligned.targets(),
            aligned.feature_names(),
            &base.split,
            42,
        )
        .unwrap();
    let report = EvaluationReport::new("round_trip", &base, Some(&search));

    let writer =
        ResultWriter::new(processed.path(), ExperimentName::new("round_trip").unwrap()).unwrap();
    let json_path = writer.write_report(&report).unwrap();
    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();

    assert_eq!(content["experiment"], "round_trip");
    assert_eq!(content["sample_count"].as_u64().unwrap(), aligned.len() as u64);
    assert_eq!(
        content["train_count"].as_u64().unwrap() + content["test_count"].as_u64().unwrap(),
        aligned.len() as u64
    );
    assert!(content["rmse"].as_f64().unwrap() >= 0.0);
    assert!(content["best_rmse"].as_f64().unwrap() >= 0.0);
    assert!(content["best_hyperparameters"]["n_estimators"].is_u64());
    let importances = content["feature_importances"].as_array().unwrap();
    assert_eq!(importances.len(), 4);
    let total: f64 = importances.iter().map(|f| f["importance"].as_f64().unwrap()).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn tiny_dataset_still_searches_with_one_row_folds() {
    let raw = TempDir::new().unwrap();
    let processed = TempDir::new().unwrap();
    // 40 days with PERIOD 16 leaves days 8..32 usable; productivity every 4th
    // day gives 6 aligned samples and 3 training rows.
    let decomposition_path = preprocess(raw.path(), processed.path(), 40);

    let records = DecompositionReader::new(&decomposition_path).read().unwrap();
    let productivity = ProductivityReader::new(&raw.path().join("productivity_history.csv"))
        .read()
        .unwrap();
    let aligned = align(&records, &productivity).unwrap();
    assert_eq!(aligned.len(), 6);

    let base = AdaptiveEvaluator::default()
        .evaluate(aligned.features(), aligned.targets(), aligned.feature_names())
        .unwrap();
    assert_eq!(base.split.n_train(), 3);
    assert_eq!(base.split.n_test(), 3);

    let search = GridSearch::default()
        .run(
            aligned.features(),
            aligned.targets(),
            aligned.feature_names(),
            &base.split,
            42,
        )
        .unwrap();
    let result = search.completed().expect("3 training rows allow 3 folds");
    assert_eq!(result.n_folds, 3);

    let report = EvaluationReport::new("tiny", &base, Some(&search));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["sample_count"], 6);
    assert!(json["best_hyperparameters"].is_object());
    assert!(json["best_r2"].is_number());
    assert!(json["diagnostics"].as_array().unwrap().is_empty());
}

#[test]
fn productivity_outside_decomposition_range_is_a_join_error() {
    let raw = TempDir::new().unwrap();
    let processed = TempDir::new().unwrap();
    let decomposition_path = preprocess(raw.path(), processed.path(), 64);
    let late = raw.path().join("late_productivity.csv");
    fs::write(&late, "date,productivity\n2030-01-01,4.2\n2030-01-02,4.4\n").unwrap();

    let records = DecompositionReader::new(&decomposition_path).read().unwrap();
    let productivity = ProductivityReader::new(&late).read().unwrap();
    let result = align(&records, &productivity);
    assert!(
        matches!(result, Err(IoError::DataJoin { n_productivity: 2, .. })),
        "expected DataJoin, got: {result:?}"
    );
}
