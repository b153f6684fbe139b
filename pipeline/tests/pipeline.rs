use elastictrack::tracking::{
    FileStore, InMemoryStore, Metric, RunInfo, RunRecord, RunStatus, Tracker, TrackingError,
    TrackingStore, TrackingUri,
};
use elastictrack_pipeline::{
    run, DataSource, DataUnavailableError, PipelineConfig, PipelineError, MODEL_ARTIFACT_PATH,
};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

const TEN_ROWS: &str = "\"fixed acidity\";\"alcohol\";\"quality\"\n\
    7.0;8.8;6\n\
    6.3;9.5;6\n\
    8.1;10.1;6\n\
    7.2;9.9;6\n\
    6.2;9.6;6\n\
    8.1;11.0;7\n\
    6.8;12.2;8\n\
    7.5;10.5;5\n\
    6.6;9.0;3\n\
    7.9;12.8;9\n";

fn write_csv(dir: &Path, contents: &str) -> DataSource {
    let path = dir.join("winequality.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    DataSource::Path(path)
}

fn config(data: DataSource) -> PipelineConfig {
    PipelineConfig::new(data)
        .with_alpha(0.5)
        .with_l1_ratio(0.5)
        .with_split_seed(42)
}

#[test]
fn test_ten_row_scenario_logs_one_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(write_csv(dir.path(), TEN_ROWS));
    let mut tracker = Tracker::new(InMemoryStore::new(), "Default");
    let mut out = Vec::new();

    let summary = run(&config, &mut tracker, &mut out).unwrap();

    assert_eq!(summary.n_train, 7);
    assert_eq!(summary.n_test, 3);
    let m = summary.metrics;
    assert!(m.rmse.is_finite() && m.rmse >= 0.0);
    assert!(m.mae.is_finite() && m.mae >= 0.0);
    assert!(m.r2.is_finite() && m.r2 <= 1.0);

    let report = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(
        lines,
        [
            "Elasticnet model (alpha = 0.500000), (l1_ratio = 0.500000)".to_string(),
            format!("  RMSE: {}", m.rmse),
            format!("  MAE: {}", m.mae),
            format!("  R2: {}", m.r2),
        ]
    );

    let store = tracker.into_store();
    assert_eq!(store.runs().len(), 1);
    let record = &store.runs()[0];
    assert_eq!(record.info.run_id, summary.run_id);
    assert_eq!(record.info.status, RunStatus::Finished);
    assert_eq!(record.params["alpha"], "0.5");
    assert_eq!(record.params["l1_ratio"], "0.5");
    let keys: Vec<&str> = record.metrics.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, ["rmse", "r2", "mae"]);
    assert!(record.metrics.iter().all(|m| m.step == 0));
    assert_eq!(record.metric("rmse"), Some(m.rmse));

    let artifacts = store.artifacts(&summary.run_id).unwrap();
    assert!(artifacts.contains_key(&format!("{MODEL_ARTIFACT_PATH}/MLmodel")));
    assert!(artifacts.contains_key(&format!("{MODEL_ARTIFACT_PATH}/model.bin")));
    let mlmodel = String::from_utf8(artifacts["model/MLmodel"].clone()).unwrap();
    assert!(mlmodel.contains("fixed acidity"));
    assert!(mlmodel.contains("quality"));
}

#[test]
fn test_unreachable_source_creates_no_run() {
    let config = config(DataSource::from("http://127.0.0.1:9/winequality-white.csv"));
    let mut tracker = Tracker::new(InMemoryStore::new(), "Default");
    let mut out = Vec::new();

    let err = run(&config, &mut tracker, &mut out).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::DataUnavailable(DataUnavailableError::Request { .. })
    ));
    assert!(out.is_empty());
    let store = tracker.into_store();
    assert!(store.runs().is_empty());
    assert!(store.experiments().is_empty());
}

#[test]
fn test_missing_file_creates_no_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(DataSource::Path(dir.path().join("absent.csv")));
    let mut tracker = Tracker::new(FileStore::new(dir.path().join("mlruns")).unwrap(), "Default");

    let err = run(&config, &mut tracker, &mut Vec::new()).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::DataUnavailable(DataUnavailableError::Io { .. })
    ));
    assert!(tracker.store().list_runs("0").unwrap().is_empty());
}

#[test]
fn test_same_seed_reproduces_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(write_csv(dir.path(), TEN_ROWS));

    let mut first = Tracker::new(InMemoryStore::new(), "Default");
    let mut second = Tracker::new(InMemoryStore::new(), "Default");
    let a = run(&config, &mut first, &mut Vec::new()).unwrap();
    let b = run(&config, &mut second, &mut Vec::new()).unwrap();

    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.diagnostics, b.diagnostics);
}

#[test]
fn test_file_store_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(write_csv(dir.path(), TEN_ROWS))
        .with_tracking_uri(TrackingUri::File(dir.path().join("mlruns")))
        .with_experiment("wine-quality")
        .with_run_name("smoke");
    let store = config.tracking.uri.open(None).unwrap();
    let mut tracker = Tracker::new(store, &config.tracking.experiment_name);

    let summary = run(&config, &mut tracker, &mut Vec::new()).unwrap();

    let record = tracker.get_run(&summary.run_id).unwrap();
    assert_eq!(record.info.status, RunStatus::Finished);
    assert_eq!(record.info.experiment_id, "1");
    assert_eq!(record.info.run_name.as_deref(), Some("smoke"));
    assert_eq!(record.metric("mae"), Some(summary.metrics.mae));

    let run_dir = dir
        .path()
        .join("mlruns")
        .join("1")
        .join(&summary.run_id);
    assert!(run_dir.join("artifacts/model/MLmodel").is_file());
    assert!(run_dir.join("artifacts/model/model.bin").is_file());
}

/// Delegates to an in-memory store but refuses artifact uploads.
struct NoArtifacts(InMemoryStore);

impl TrackingStore for NoArtifacts {
    fn get_or_create_experiment(&mut self, name: &str) -> Result<String, TrackingError> {
        self.0.get_or_create_experiment(name)
    }

    fn create_run(
        &mut self,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
        tags: &BTreeMap<String, String>,
    ) -> Result<RunInfo, TrackingError> {
        self.0.create_run(experiment_id, run_name, start_time, tags)
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<(), TrackingError> {
        self.0.log_param(run_id, key, value)
    }

    fn log_metric(&mut self, run_id: &str, metric: &Metric) -> Result<(), TrackingError> {
        self.0.log_metric(run_id, metric)
    }

    fn set_tag(&mut self, run_id: &str, key: &str, value: &str) -> Result<(), TrackingError> {
        self.0.set_tag(run_id, key, value)
    }

    fn log_artifacts(
        &mut self,
        _run_id: &str,
        _local_dir: &Path,
        _artifact_path: &str,
    ) -> Result<(), TrackingError> {
        Err(TrackingError::UnsupportedArtifactUri("s3://bucket".to_string()))
    }

    fn update_run(
        &mut self,
        run_id: &str,
        status: RunStatus,
        end_time: i64,
    ) -> Result<(), TrackingError> {
        self.0.update_run(run_id, status, end_time)
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord, TrackingError> {
        self.0.get_run(run_id)
    }
}

#[test]
fn test_failure_after_start_marks_run_failed() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(write_csv(dir.path(), TEN_ROWS));
    let mut tracker = Tracker::new(NoArtifacts(InMemoryStore::new()), "Default");

    let err = run(&config, &mut tracker, &mut Vec::new()).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Tracking(TrackingError::UnsupportedArtifactUri(_))
    ));
    let store = tracker.into_store().0;
    assert_eq!(store.runs().len(), 1);
    assert_eq!(store.runs()[0].info.status, RunStatus::Failed);
    assert!(store.runs()[0].info.end_time.is_some());
}

#[test]
fn test_invalid_config_is_rejected_before_loading() {
    let config = config(DataSource::from("http://127.0.0.1:9/unused.csv")).with_l1_ratio(2.0);
    let mut tracker = Tracker::new(InMemoryStore::new(), "Default");
    let err = run(&config, &mut tracker, &mut Vec::new()).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}
