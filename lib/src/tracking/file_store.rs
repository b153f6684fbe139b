//! Local directory store.
//!
//! ```text
//! <root>/<experiment_id>/meta.json
//! <root>/<experiment_id>/<run_id>/meta.json
//! <root>/<experiment_id>/<run_id>/params/<key>      value
//! <root>/<experiment_id>/<run_id>/metrics/<key>     "<timestamp> <value> <step>" per line
//! <root>/<experiment_id>/<run_id>/tags/<key>        value
//! <root>/<experiment_id>/<run_id>/artifacts/...
//! ```
//!
//! Experiment `0` is `Default` and always exists.

use super::artifact::local_files;
use super::{
    now_ms, validate_key, Metric, Result, RunInfo, RunRecord, RunStatus, TrackingError,
    TrackingStore,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const META_FILE: &str = "meta.json";
const DEFAULT_EXPERIMENT: &str = "Default";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExperimentMeta {
    experiment_id: String,
    name: String,
    artifact_location: String,
    lifecycle_stage: String,
    creation_time: i64,
}

/// Store writing experiments and runs under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        let store = Self {
            root: fs::canonicalize(root.as_ref())?,
        };
        if !store.root.join("0").join(META_FILE).exists() {
            store.write_experiment("0", DEFAULT_EXPERIMENT)?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn experiments(&self) -> Result<Vec<ExperimentMeta>> {
        let mut experiments = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let meta = entry?.path().join(META_FILE);
            if meta.is_file() {
                experiments.push(read_json::<ExperimentMeta>(&meta)?);
            }
        }
        Ok(experiments)
    }

    fn write_experiment(&self, id: &str, name: &str) -> Result<ExperimentMeta> {
        let dir = self.root.join(id);
        fs::create_dir_all(&dir)?;
        let meta = ExperimentMeta {
            experiment_id: id.to_string(),
            name: name.to_string(),
            artifact_location: format!("file://{}", dir.display()),
            lifecycle_stage: "active".to_string(),
            creation_time: now_ms(),
        };
        write_json(&dir.join(META_FILE), &meta)?;
        Ok(meta)
    }

    fn run_dir(&self, run_id: &str) -> Result<PathBuf> {
        if run_id.is_empty() || run_id.contains(['/', '\\', '.']) {
            return Err(TrackingError::RunNotFound(run_id.to_string()));
        }
        for experiment in self.experiments()? {
            let dir = self.root.join(&experiment.experiment_id).join(run_id);
            if dir.join(META_FILE).is_file() {
                return Ok(dir);
            }
        }
        Err(TrackingError::RunNotFound(run_id.to_string()))
    }

    /// Runs of one experiment, ordered by start time.
    pub fn list_runs(&self, experiment_id: &str) -> Result<Vec<RunInfo>> {
        let dir = self.root.join(experiment_id);
        if !dir.join(META_FILE).is_file() {
            return Err(TrackingError::ExperimentNotFound(experiment_id.to_string()));
        }
        let mut runs = Vec::new();
        for entry in fs::read_dir(dir)? {
            let meta = entry?.path().join(META_FILE);
            if meta.is_file() {
                runs.push(read_json::<RunInfo>(&meta)?);
            }
        }
        runs.sort_by_key(|r| r.start_time);
        Ok(runs)
    }

    /// Local directory holding a run's artifacts.
    pub fn artifact_dir(&self, run_id: &str) -> Result<PathBuf> {
        Ok(self.run_dir(run_id)?.join("artifacts"))
    }
}

impl TrackingStore for FileStore {
    fn get_or_create_experiment(&mut self, name: &str) -> Result<String> {
        let experiments = self.experiments()?;
        if let Some(existing) = experiments.iter().find(|e| e.name == name) {
            return Ok(existing.experiment_id.clone());
        }
        let next = experiments
            .iter()
            .filter_map(|e| e.experiment_id.parse::<u64>().ok())
            .max()
            .map_or(0, |id| id + 1);
        let meta = self.write_experiment(&next.to_string(), name)?;
        log::info!("created experiment '{name}' with id {}", meta.experiment_id);
        Ok(meta.experiment_id)
    }

    fn create_run(
        &mut self,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
        tags: &BTreeMap<String, String>,
    ) -> Result<RunInfo> {
        let experiment_dir = self.root.join(experiment_id);
        if experiment_id.contains(['/', '\\', '.']) || !experiment_dir.join(META_FILE).is_file() {
            return Err(TrackingError::ExperimentNotFound(experiment_id.to_string()));
        }

        let run_id = Uuid::new_v4().simple().to_string();
        let run_dir = experiment_dir.join(&run_id);
        for sub in ["params", "metrics", "tags", "artifacts"] {
            fs::create_dir_all(run_dir.join(sub))?;
        }

        let info = RunInfo {
            artifact_uri: format!("file://{}", run_dir.join("artifacts").display()),
            run_id,
            experiment_id: experiment_id.to_string(),
            run_name: run_name.map(String::from),
            status: RunStatus::Running,
            start_time,
            end_time: None,
        };
        write_json(&run_dir.join(META_FILE), &info)?;
        for (key, value) in tags {
            validate_key(key)?;
            write_value(&run_dir.join("tags").join(key), value)?;
        }
        Ok(info)
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.run_dir(run_id)?.join("params").join(key);
        if path.is_file() {
            let old = fs::read_to_string(&path)?;
            if old != value {
                return Err(TrackingError::ParamConflict {
                    key: key.to_string(),
                    old,
                    new: value.to_string(),
                });
            }
        }
        write_value(&path, value)
    }

    fn log_metric(&mut self, run_id: &str, metric: &Metric) -> Result<()> {
        validate_key(&metric.key)?;
        let path = self.run_dir(run_id)?.join("metrics").join(&metric.key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{} {} {}", metric.timestamp, metric.value, metric.step)?;
        Ok(())
    }

    fn set_tag(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.run_dir(run_id)?.join("tags").join(key);
        write_value(&path, value)
    }

    fn log_artifacts(
        &mut self,
        run_id: &str,
        local_dir: &Path,
        artifact_path: &str,
    ) -> Result<()> {
        validate_key(artifact_path)?;
        let dest_root = self.artifact_dir(run_id)?.join(artifact_path);
        for (source, relative) in local_files(local_dir)? {
            let dest = dest_root.join(&relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&source, &dest)?;
            log::debug!("copied {} to {}", source.display(), dest.display());
        }
        Ok(())
    }

    fn update_run(&mut self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()> {
        let meta = self.run_dir(run_id)?.join(META_FILE);
        let mut info: RunInfo = read_json(&meta)?;
        info.status = status;
        info.end_time = Some(end_time);
        write_json(&meta, &info)
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        let dir = self.run_dir(run_id)?;
        let info = read_json(&dir.join(META_FILE))?;

        let mut metrics = Vec::new();
        for (path, key) in local_files(&dir.join("metrics"))? {
            for line in fs::read_to_string(path)?.lines() {
                metrics.push(parse_metric_line(&key, line)?);
            }
        }

        Ok(RunRecord {
            info,
            params: read_values(&dir.join("params"))?,
            metrics,
            tags: read_values(&dir.join("tags"))?,
        })
    }
}

fn parse_metric_line(key: &str, line: &str) -> Result<Metric> {
    let invalid = || {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("malformed metric line for '{key}': {line}"),
        )
    };
    let mut parts = line.split_whitespace();
    let timestamp = parts.next().and_then(|t| t.parse().ok()).ok_or_else(invalid)?;
    let value = parts.next().and_then(|v| v.parse().ok()).ok_or_else(invalid)?;
    let step = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    Ok(Metric {
        key: key.to_string(),
        value,
        timestamp,
        step,
    })
}

fn read_values(dir: &Path) -> Result<BTreeMap<String, String>> {
    local_files(dir)?
        .into_iter()
        .map(|(path, key)| -> Result<(String, String)> { Ok((key, fs::read_to_string(path)?)) })
        .collect()
}

fn write_value(path: &Path, value: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, value)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}
