use super::artifact::local_files;
use super::{
    validate_key, Metric, Result, RunInfo, RunRecord, RunStatus, TrackingError, TrackingStore,
};
use std::collections::BTreeMap;
use std::path::Path;

/// Store that keeps experiments, runs and artifact bytes in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    experiments: Vec<String>,
    runs: Vec<RunRecord>,
    artifacts: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Experiment names, indexed by id.
    pub fn experiments(&self) -> &[String] {
        &self.experiments
    }

    /// Every run created so far, in creation order.
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    /// Artifact files of a run keyed by path relative to the artifact root.
    pub fn artifacts(&self, run_id: &str) -> Option<&BTreeMap<String, Vec<u8>>> {
        self.artifacts.get(run_id)
    }

    fn run_mut(&mut self, run_id: &str) -> Result<&mut RunRecord> {
        self.runs
            .iter_mut()
            .find(|r| r.info.run_id == run_id)
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))
    }
}

impl TrackingStore for InMemoryStore {
    fn get_or_create_experiment(&mut self, name: &str) -> Result<String> {
        let id = match self.experiments.iter().position(|e| e == name) {
            Some(id) => id,
            None => {
                self.experiments.push(name.to_string());
                self.experiments.len() - 1
            }
        };
        Ok(id.to_string())
    }

    fn create_run(
        &mut self,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
        tags: &BTreeMap<String, String>,
    ) -> Result<RunInfo> {
        let known = experiment_id
            .parse::<usize>()
            .is_ok_and(|id| id < self.experiments.len());
        if !known {
            return Err(TrackingError::ExperimentNotFound(experiment_id.to_string()));
        }

        let run_id = format!("run-{}", self.runs.len() + 1);
        let info = RunInfo {
            artifact_uri: format!("memory://{experiment_id}/{run_id}/artifacts"),
            run_id,
            experiment_id: experiment_id.to_string(),
            run_name: run_name.map(String::from),
            status: RunStatus::Running,
            start_time,
            end_time: None,
        };
        self.runs.push(RunRecord {
            info: info.clone(),
            params: BTreeMap::new(),
            metrics: Vec::new(),
            tags: tags.clone(),
        });
        Ok(info)
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let run = self.run_mut(run_id)?;
        if let Some(old) = run.params.get(key) {
            if old != value {
                return Err(TrackingError::ParamConflict {
                    key: key.to_string(),
                    old: old.clone(),
                    new: value.to_string(),
                });
            }
        }
        run.params.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn log_metric(&mut self, run_id: &str, metric: &Metric) -> Result<()> {
        validate_key(&metric.key)?;
        self.run_mut(run_id)?.metrics.push(metric.clone());
        Ok(())
    }

    fn set_tag(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.run_mut(run_id)?
            .tags
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn log_artifacts(
        &mut self,
        run_id: &str,
        local_dir: &Path,
        artifact_path: &str,
    ) -> Result<()> {
        validate_key(artifact_path)?;
        self.run_mut(run_id)?;
        let files = local_files(local_dir)?;
        let stored = self.artifacts.entry(run_id.to_string()).or_default();
        for (path, relative) in files {
            stored.insert(format!("{artifact_path}/{relative}"), std::fs::read(path)?);
        }
        Ok(())
    }

    fn update_run(&mut self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()> {
        let run = self.run_mut(run_id)?;
        run.info.status = status;
        run.info.end_time = Some(end_time);
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        self.runs
            .iter()
            .find(|r| r.info.run_id == run_id)
            .cloned()
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))
    }
}
