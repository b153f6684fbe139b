//! Experiment tracking.
//!
//! A [`Tracker`] records runs (parameters, metrics, tags, model artifacts)
//! against an experiment held by a [`TrackingStore`]. Three stores ship with
//! the crate:
//!
//! - [`RestStore`]: an MLflow-compatible tracking server over HTTP;
//! - [`FileStore`]: a local directory tree;
//! - [`InMemoryStore`]: keeps everything in memory, for tests.
//!
//! [`TrackingUri`] picks the store from a URI, so the endpoint is always an
//! explicit value handed in by the caller.
//!
//! ```
//! use elastictrack::tracking::{InMemoryStore, RunStatus, Tracker};
//!
//! # fn main() -> Result<(), elastictrack::tracking::TrackingError> {
//! let mut tracker = Tracker::new(InMemoryStore::new(), "wine-quality");
//! let run = tracker.start_run(Some("baseline"))?;
//! tracker.log_param(&run.run_id, "alpha", "0.5")?;
//! tracker.log_metric(&run.run_id, "rmse", 0.79, 0)?;
//! tracker.end_run(&run.run_id, RunStatus::Finished)?;
//!
//! let record = tracker.get_run(&run.run_id)?;
//! assert_eq!(record.params["alpha"], "0.5");
//! assert_eq!(record.info.status, RunStatus::Finished);
//! # Ok(())
//! # }
//! ```

pub mod artifact;
mod file_store;
mod memory_store;
mod rest_store;
mod uri;


pub use artifact::{ColumnSpec, MlModel, ModelSignature};
pub use file_store::FileStore;
pub use memory_store::InMemoryStore;
pub use rest_store::{Credentials, RestStore};
pub use uri::{open_store, TrackingUri};

use crate::model::InferenceModel;
use crate::serialization::SerializationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from tracking stores and the [`Tracker`].
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("HTTP request to the tracking server failed")]
    Http(#[from] reqwest::Error),

    #[error("tracking server returned {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unsupported tracking URI '{0}'")]
    UnsupportedUri(String),

    #[error("unsupported artifact URI '{0}'")]
    UnsupportedArtifactUri(String),

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("experiment not found: {0}")]
    ExperimentNotFound(String),

    #[error("invalid key '{0}'")]
    InvalidKey(String),

    #[error("parameter '{key}' already logged as '{old}', refusing to change it to '{new}'")]
    ParamConflict {
        key: String,
        old: String,
        new: String,
    },

    #[error("tracking store I/O failed")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON from the tracking store")]
    Json(#[from] serde_json::Error),

    #[error("invalid MLmodel YAML")]
    Yaml(#[from] serde_yaml::Error),

    #[error("could not list artifact files")]
    Walk(#[from] walkdir::Error),

    #[error("model serialization failed")]
    Serialization(#[from] SerializationError),
}

pub type Result<T> = std::result::Result<T, TrackingError>;

/// Lifecycle state of a run, serialized the way MLflow spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    Killed,
}

/// Identity and lifecycle metadata of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    pub run_name: Option<String>,
    pub status: RunStatus,
    /// Unix time in milliseconds.
    pub start_time: i64,
    pub end_time: Option<i64>,
    /// Root under which the store keeps this run's artifacts.
    pub artifact_uri: String,
}

/// One metric observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub value: f64,
    /// Unix time in milliseconds.
    pub timestamp: i64,
    pub step: i64,
}

/// Everything a store knows about a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub info: RunInfo,
    pub params: BTreeMap<String, String>,
    /// Metric history in logging order. Remote stores only report the latest
    /// value per key.
    pub metrics: Vec<Metric>,
    pub tags: BTreeMap<String, String>,
}

impl RunRecord {
    /// Latest value logged for `key`.
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics
            .iter()
            .rev()
            .find(|m| m.key == key)
            .map(|m| m.value)
    }
}

/// Persistence backend for experiments and runs.
pub trait TrackingStore {
    /// Returns the id of experiment `name`, creating it when missing.
    fn get_or_create_experiment(&mut self, name: &str) -> Result<String>;

    fn create_run(
        &mut self,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
        tags: &BTreeMap<String, String>,
    ) -> Result<RunInfo>;

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()>;

    fn log_metric(&mut self, run_id: &str, metric: &Metric) -> Result<()>;

    fn set_tag(&mut self, run_id: &str, key: &str, value: &str) -> Result<()>;

    /// Uploads every file below `local_dir` to `<artifact root>/<artifact_path>/`.
    fn log_artifacts(&mut self, run_id: &str, local_dir: &Path, artifact_path: &str)
        -> Result<()>;

    fn update_run(&mut self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()>;

    fn get_run(&self, run_id: &str) -> Result<RunRecord>;
}

impl<S: TrackingStore + ?Sized> TrackingStore for Box<S> {
    fn get_or_create_experiment(&mut self, name: &str) -> Result<String> {
        (**self).get_or_create_experiment(name)
    }

    fn create_run(
        &mut self,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
        tags: &BTreeMap<String, String>,
    ) -> Result<RunInfo> {
        (**self).create_run(experiment_id, run_name, start_time, tags)
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        (**self).log_param(run_id, key, value)
    }

    fn log_metric(&mut self, run_id: &str, metric: &Metric) -> Result<()> {
        (**self).log_metric(run_id, metric)
    }

    fn set_tag(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        (**self).set_tag(run_id, key, value)
    }

    fn log_artifacts(
        &mut self,
        run_id: &str,
        local_dir: &Path,
        artifact_path: &str,
    ) -> Result<()> {
        (**self).log_artifacts(run_id, local_dir, artifact_path)
    }

    fn update_run(&mut self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()> {
        (**self).update_run(run_id, status, end_time)
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        (**self).get_run(run_id)
    }
}

pub const TAG_RUN_NAME: &str = "mlflow.runName";
pub const TAG_SOURCE_NAME: &str = "mlflow.source.name";
pub const TAG_USER: &str = "mlflow.user";

/// Records runs for one named experiment.
///
/// The experiment is resolved lazily on the first [`start_run`](Self::start_run)
/// and cached afterwards.
#[derive(Debug)]
pub struct Tracker<S: TrackingStore> {
    store: S,
    experiment_name: String,
    experiment_id: Option<String>,
    tags: BTreeMap<String, String>,
}

impl<S: TrackingStore> Tracker<S> {
    pub fn new(store: S, experiment_name: impl Into<String>) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(TAG_SOURCE_NAME.to_string(), env!("CARGO_PKG_NAME").to_string());
        Self {
            store,
            experiment_name: experiment_name.into(),
            experiment_id: None,
            tags,
        }
    }

    /// Sets the `mlflow.source.name` tag attached to new runs.
    pub fn with_source_name(mut self, source: impl Into<String>) -> Self {
        self.tags.insert(TAG_SOURCE_NAME.to_string(), source.into());
        self
    }

    /// Sets the `mlflow.user` tag attached to new runs.
    pub fn with_user(mut self, user: Option<String>) -> Self {
        match user {
            Some(user) => self.tags.insert(TAG_USER.to_string(), user),
            None => self.tags.remove(TAG_USER),
        };
        self
    }

    /// Adds a tag copied onto every run started afterwards.
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn experiment_id(&mut self) -> Result<String> {
        if let Some(id) = &self.experiment_id {
            return Ok(id.clone());
        }
        let id = self.store.get_or_create_experiment(&self.experiment_name)?;
        log::debug!("experiment '{}' has id {id}", self.experiment_name);
        self.experiment_id = Some(id.clone());
        Ok(id)
    }

    /// Opens a new run in state [`RunStatus::Running`].
    pub fn start_run(&mut self, run_name: Option<&str>) -> Result<RunInfo> {
        let experiment_id = self.experiment_id()?;
        let mut tags = self.tags.clone();
        if let Some(name) = run_name {
            tags.insert(TAG_RUN_NAME.to_string(), name.to_string());
        }
        let info = self
            .store
            .create_run(&experiment_id, run_name, now_ms(), &tags)?;
        log::info!(
            "started run {} in experiment '{}'",
            info.run_id,
            self.experiment_name
        );
        Ok(info)
    }

    pub fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.store.log_param(run_id, key, value)
    }

    pub fn log_metric(&mut self, run_id: &str, key: &str, value: f64, step: i64) -> Result<()> {
        let metric = Metric {
            key: key.to_string(),
            value,
            timestamp: now_ms(),
            step,
        };
        self.store.log_metric(run_id, &metric)
    }

    pub fn set_tag(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.store.set_tag(run_id, key, value)
    }

    /// Uploads a local directory tree as artifacts of the run.
    pub fn log_artifacts(
        &mut self,
        run_id: &str,
        local_dir: &Path,
        artifact_path: &str,
    ) -> Result<()> {
        self.store.log_artifacts(run_id, local_dir, artifact_path)
    }

    /// Packages `model` as an `MLmodel` directory and stores it under
    /// `artifact_path`. The store decides where the bytes end up.
    pub fn log_model<M: InferenceModel>(
        &mut self,
        run_id: &str,
        artifact_path: &str,
        model: &M,
        signature: Option<&ModelSignature>,
    ) -> Result<MlModel> {
        let staging = tempfile::tempdir()?;
        let mlmodel = artifact::write_model_dir(staging.path(), artifact_path, run_id, model, signature)?;
        self.store.log_artifacts(run_id, staging.path(), artifact_path)?;
        log::info!("logged {} model to '{artifact_path}'", model.model_type());
        Ok(mlmodel)
    }

    pub fn end_run(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        self.store.update_run(run_id, status, now_ms())?;
        log::info!("run {run_id} ended with status {status:?}");
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        self.store.get_run(run_id)
    }
}

/// Current Unix time in milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Rejects keys that are empty or could escape a store's directory.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        Err(TrackingError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}
