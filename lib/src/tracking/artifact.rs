//! `MLmodel` packaging for fitted models.
//!
//! A model directory holds two files:
//!
//! ```text
//! MLmodel     YAML descriptor (flavor, data file, signature)
//! model.bin   bincode-encoded parameters
//! ```

use super::Result;
use crate::model::InferenceModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub const MLMODEL_FILE: &str = "MLmodel";
pub const MODEL_DATA_FILE: &str = "model.bin";
pub const FLAVOR: &str = "elastictrack";

/// One named, typed column of a model signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub dtype: String,
}

impl ColumnSpec {
    pub fn double(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            dtype: "double".to_string(),
        }
    }
}

/// Input and output schema of a model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelSignature {
    pub inputs: Vec<ColumnSpec>,
    pub outputs: Vec<ColumnSpec>,
}

impl ModelSignature {
    /// Signature of a regressor over numeric features producing one numeric target.
    pub fn infer<S: AsRef<str>>(feature_names: &[S], target_name: &str) -> Self {
        Self {
            inputs: feature_names
                .iter()
                .map(|n| ColumnSpec::double(n.as_ref()))
                .collect(),
            outputs: vec![ColumnSpec::double(target_name)],
        }
    }
}

/// Signature as written in `MLmodel`: each side is a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub inputs: String,
    pub outputs: String,
}

impl SignatureEntry {
    fn encode(signature: &ModelSignature) -> Result<Self> {
        Ok(Self {
            inputs: serde_json::to_string(&signature.inputs)?,
            outputs: serde_json::to_string(&signature.outputs)?,
        })
    }

    pub fn decode(&self) -> Result<ModelSignature> {
        Ok(ModelSignature {
            inputs: serde_json::from_str(&self.inputs)?,
            outputs: serde_json::from_str(&self.outputs)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flavor {
    pub model_type: String,
    pub data: String,
    pub format: String,
    pub n_features: usize,
    pub version: String,
}

/// Contents of an `MLmodel` descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlModel {
    pub artifact_path: String,
    pub flavors: BTreeMap<String, Flavor>,
    pub run_id: String,
    pub utc_time_created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureEntry>,
}

impl MlModel {
    pub fn load(dir: &Path) -> Result<Self> {
        let file = File::open(dir.join(MLMODEL_FILE))?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn flavor(&self) -> Option<&Flavor> {
        self.flavors.get(FLAVOR)
    }
}

/// Writes `MLmodel` and the parameter file for `model` into `dir`.
pub fn write_model_dir<M: InferenceModel>(
    dir: &Path,
    artifact_path: &str,
    run_id: &str,
    model: &M,
    signature: Option<&ModelSignature>,
) -> Result<MlModel> {
    std::fs::create_dir_all(dir)?;
    model.save_to_file(dir.join(MODEL_DATA_FILE))?;

    let flavor = Flavor {
        model_type: model.model_type().to_string(),
        data: MODEL_DATA_FILE.to_string(),
        format: "bincode".to_string(),
        n_features: model.n_features(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let mlmodel = MlModel {
        artifact_path: artifact_path.to_string(),
        flavors: BTreeMap::from([(FLAVOR.to_string(), flavor)]),
        run_id: run_id.to_string(),
        utc_time_created: chrono::Utc::now()
            .format("%Y-%m-%d %H:%M:%S%.6f")
            .to_string(),
        signature: signature.map(SignatureEntry::encode).transpose()?,
    };

    let writer = BufWriter::new(File::create(dir.join(MLMODEL_FILE))?);
    serde_yaml::to_writer(writer, &mlmodel)?;
    Ok(mlmodel)
}

/// Restores a model from a directory written by [`write_model_dir`].
pub fn load_model<M: InferenceModel>(dir: &Path) -> Result<M> {
    let mlmodel = MlModel::load(dir)?;
    let data = mlmodel
        .flavor()
        .map(|f| f.data.clone())
        .unwrap_or_else(|| MODEL_DATA_FILE.to_string());
    Ok(M::load_from_file(dir.join(data))?)
}

/// Files below `root` paired with their `/`-separated paths relative to it.
pub(crate) fn local_files(root: &Path) -> Result<Vec<(std::path::PathBuf, String)>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((entry.path().to_path_buf(), relative));
    }
    Ok(files)
}
