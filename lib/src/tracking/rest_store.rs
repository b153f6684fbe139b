//! MLflow REST API client.

use super::artifact::local_files;
use super::{Metric, Result, RunInfo, RunRecord, RunStatus, TrackingError, TrackingStore};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::time::Duration;

const API_PREFIX: &str = "api/2.0/mlflow";
const ARTIFACTS_PREFIX: &str = "api/2.0/mlflow-artifacts/artifacts";
const TIMEOUT: Duration = Duration::from_secs(30);
const RESOURCE_DOES_NOT_EXIST: &str = "RESOURCE_DOES_NOT_EXIST";

/// Authentication for a tracking server.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, password: String },
    Bearer(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"***").finish(),
        }
    }
}

impl Credentials {
    /// Reads `MLFLOW_TRACKING_TOKEN`, or else `MLFLOW_TRACKING_USERNAME` and
    /// `MLFLOW_TRACKING_PASSWORD`, from the process environment.
    pub fn from_env() -> Option<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        if let Some(token) = lookup("MLFLOW_TRACKING_TOKEN").filter(|t| !t.is_empty()) {
            return Some(Self::Bearer(token));
        }
        match (
            lookup("MLFLOW_TRACKING_USERNAME"),
            lookup("MLFLOW_TRACKING_PASSWORD"),
        ) {
            (Some(username), Some(password)) if !username.is_empty() => {
                Some(Self::Basic { username, password })
            }
            _ => None,
        }
    }
}

/// Store backed by an MLflow tracking server.
#[derive(Debug)]
pub struct RestStore {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
    artifact_uris: HashMap<String, String>,
}

impl RestStore {
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self> {
        let client = Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            artifact_uris: HashMap::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{API_PREFIX}/{path}", self.base_url)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = match &self.credentials {
            Some(Credentials::Basic { username, password }) => {
                request.basic_auth(username, Some(password))
            }
            Some(Credentials::Bearer(token)) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        Ok(serde_json::from_str(body)?)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T> {
        log::debug!("POST {path}");
        self.send(self.client.post(self.endpoint(path)).json(body))
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        log::debug!("GET {path}");
        self.send(self.client.get(self.endpoint(path)).query(query))
    }

    fn artifact_uri(&mut self, run_id: &str) -> Result<String> {
        if let Some(uri) = self.artifact_uris.get(run_id) {
            return Ok(uri.clone());
        }
        let uri = self.get_run(run_id)?.info.artifact_uri;
        self.artifact_uris.insert(run_id.to_string(), uri.clone());
        Ok(uri)
    }
}

impl TrackingStore for RestStore {
    fn get_or_create_experiment(&mut self, name: &str) -> Result<String> {
        match self.get::<ExperimentResponse>(
            "experiments/get-by-name",
            &[("experiment_name", name)],
        ) {
            Ok(found) => Ok(found.experiment.experiment_id),
            Err(TrackingError::Api { code, .. }) if code == RESOURCE_DOES_NOT_EXIST => {
                let created: CreateExperimentResponse =
                    self.post("experiments/create", &json!({ "name": name }))?;
                log::info!("created experiment '{name}' with id {}", created.experiment_id);
                Ok(created.experiment_id)
            }
            Err(e) => Err(e),
        }
    }

    fn create_run(
        &mut self,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
        tags: &BTreeMap<String, String>,
    ) -> Result<RunInfo> {
        let tags: Vec<KeyValue> = tags
            .iter()
            .map(|(key, value)| KeyValue {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        let response: RunResponse = self.post(
            "runs/create",
            &json!({
                "experiment_id": experiment_id,
                "run_name": run_name,
                "start_time": start_time,
                "tags": tags,
            }),
        )?;
        let info = RunInfo::from(response.run.info);
        self.artifact_uris
            .insert(info.run_id.clone(), info.artifact_uri.clone());
        Ok(info)
    }

    fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        let _: Empty = self.post(
            "runs/log-parameter",
            &json!({ "run_id": run_id, "key": key, "value": value }),
        )?;
        Ok(())
    }

    fn log_metric(&mut self, run_id: &str, metric: &Metric) -> Result<()> {
        let _: Empty = self.post(
            "runs/log-metric",
            &json!({
                "run_id": run_id,
                "key": metric.key,
                "value": metric.value,
                "timestamp": metric.timestamp,
                "step": metric.step,
            }),
        )?;
        Ok(())
    }

    fn set_tag(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        let _: Empty = self.post(
            "runs/set-tag",
            &json!({ "run_id": run_id, "key": key, "value": value }),
        )?;
        Ok(())
    }

    fn log_artifacts(
        &mut self,
        run_id: &str,
        local_dir: &Path,
        artifact_path: &str,
    ) -> Result<()> {
        let root = artifact_root(&self.artifact_uri(run_id)?)?;
        for (source, relative) in local_files(local_dir)? {
            let dest = [root.as_str(), artifact_path.trim_matches('/'), relative.as_str()]
                .iter()
                .filter(|part| !part.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join("/");
            let url = format!("{}/{ARTIFACTS_PREFIX}/{dest}", self.base_url);
            log::debug!("PUT {dest}");
            let bytes = std::fs::read(&source)?;
            let _: Empty = self.send(self.client.put(url).body(bytes))?;
        }
        Ok(())
    }

    fn update_run(&mut self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()> {
        let _: Empty = self.post(
            "runs/update",
            &json!({ "run_id": run_id, "status": status, "end_time": end_time }),
        )?;
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        let response: RunResponse = self.get("runs/get", &[("run_id", run_id)])?;
        let WireRun { info, data } = response.run;
        Ok(RunRecord {
            info: info.into(),
            params: data.params.into_iter().map(|kv| (kv.key, kv.value)).collect(),
            metrics: data
                .metrics
                .into_iter()
                .map(|m| Metric {
                    key: m.key,
                    value: m.value,
                    timestamp: m.timestamp,
                    step: m.step,
                })
                .collect(),
            tags: data.tags.into_iter().map(|kv| (kv.key, kv.value)).collect(),
        })
    }
}

/// Path below the artifact proxy for an `mlflow-artifacts:` URI.
///
/// `mlflow-artifacts:/0/abc/artifacts` and
/// `mlflow-artifacts://host:5000/0/abc/artifacts` both map to `0/abc/artifacts`;
/// the authority, if any, is ignored in favour of the configured server.
fn artifact_root(uri: &str) -> Result<String> {
    let rest = uri
        .strip_prefix("mlflow-artifacts:")
        .ok_or_else(|| TrackingError::UnsupportedArtifactUri(uri.to_string()))?;
    let path = match rest.strip_prefix("//") {
        Some(with_authority) => with_authority
            .find('/')
            .map_or("", |i| &with_authority[i..]),
        None => rest,
    };
    Ok(path.trim_matches('/').to_string())
}

fn api_error(status: u16, body: &str) -> TrackingError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error_code: Option<String>,
        message: Option<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => TrackingError::Api {
            status,
            code: parsed.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
            message: parsed.message.unwrap_or_default(),
        },
        Err(_) => TrackingError::Api {
            status,
            code: "UNKNOWN".to_string(),
            message: body.trim().chars().take(200).collect(),
        },
    }
}

#[derive(Debug, Deserialize)]
struct Empty {}

#[derive(Debug, Deserialize)]
struct ExperimentResponse {
    experiment: WireExperiment,
}

#[derive(Debug, Deserialize)]
struct WireExperiment {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    run: WireRun,
}

#[derive(Debug, Deserialize)]
struct WireRun {
    info: WireRunInfo,
    #[serde(default)]
    data: WireRunData,
}

#[derive(Debug, Deserialize)]
struct WireRunInfo {
    run_id: String,
    experiment_id: String,
    #[serde(default)]
    run_name: Option<String>,
    status: RunStatus,
    #[serde(deserialize_with = "lenient_i64")]
    start_time: i64,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    end_time: Option<i64>,
    #[serde(default)]
    artifact_uri: String,
}

impl From<WireRunInfo> for RunInfo {
    fn from(wire: WireRunInfo) -> Self {
        Self {
            run_id: wire.run_id,
            experiment_id: wire.experiment_id,
            run_name: wire.run_name.filter(|n| !n.is_empty()),
            status: wire.status,
            start_time: wire.start_time,
            end_time: wire.end_time,
            artifact_uri: wire.artifact_uri,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WireRunData {
    #[serde(default)]
    metrics: Vec<WireMetric>,
    #[serde(default)]
    params: Vec<KeyValue>,
    #[serde(default)]
    tags: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
struct WireMetric {
    key: String,
    value: f64,
    #[serde(deserialize_with = "lenient_i64")]
    timestamp: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    step: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct KeyValue {
    key: String,
    value: String,
}

/// int64 fields arrive as JSON numbers or, from protobuf-JSON, as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    String(String),
}

impl NumberOrString {
    fn into_i64<E: de::Error>(self) -> std::result::Result<i64, E> {
        match self {
            Self::Number(n) => Ok(n),
            Self::String(s) => s.parse().map_err(E::custom),
        }
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    NumberOrString::deserialize(deserializer)?.into_i64()
}

fn lenient_opt_i64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error> {
    Option::<NumberOrString>::deserialize(deserializer)?
        .map(NumberOrString::into_i64)
        .transpose()
}
