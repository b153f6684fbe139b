//! Linear models with compile-time training state.
//!
//! Models are generic over a state marker ([`Unfitted`] / [`Fitted`]). Fitting
//! consumes the unfitted model and returns a fitted one, so a model that has never
//! seen data cannot be asked for predictions.

pub mod elastic_net;
pub mod state;

pub use elastic_net::{ElasticNet, ElasticNetConfig, ElasticNetParams, FitDiagnostics};
pub use state::{Fitted, Unfitted};

use crate::serialization::{SerializableParams, SerializationError};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::Path;

/// Errors raised while configuring, fitting or querying a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid alpha {0}: must be finite and non-negative")]
    InvalidAlpha(f64),

    #[error("invalid l1_ratio {0}: must lie in [0, 1]")]
    InvalidL1Ratio(f64),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("shape mismatch: X has {x_rows} rows but y has {y_len} values")]
    ShapeMismatch { x_rows: usize, y_len: usize },

    #[error("feature mismatch: model expects {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("input contains NaN or infinite values")]
    NonFinite,
}

/// Result alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Prediction and persistence interface of a trained model.
pub trait InferenceModel {
    /// Plain-data representation of the learned parameters.
    type Params: Serialize + DeserializeOwned;

    /// Short identifier written into model artifacts (e.g. `"elastic_net"`).
    fn model_type(&self) -> &'static str;

    /// Number of input features the model was trained on.
    fn n_features(&self) -> usize;

    /// Predict a single sample.
    fn predict(&self, row: ArrayView1<f64>) -> Result<f64>;

    /// Predict every row of `x`.
    fn predict_batch(&self, x: ArrayView2<f64>) -> Result<Array1<f64>>;

    fn extract_params(&self) -> Self::Params;

    fn from_params(params: Self::Params) -> Result<Self>
    where
        Self: Sized;

    /// Write the learned parameters to `path` as bincode.
    fn save_to_file(&self, path: impl AsRef<Path>) -> std::result::Result<(), SerializationError> {
        let bytes = self.extract_params().to_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Restore a model previously written with [`save_to_file`](Self::save_to_file).
    fn load_from_file(path: impl AsRef<Path>) -> std::result::Result<Self, SerializationError>
    where
        Self: Sized,
    {
        let bytes = fs::read(path)?;
        let params = Self::Params::from_bytes(&bytes)?;
        Ok(Self::from_params(params)?)
    }
}

/// Reject matrices or vectors holding NaN or infinities.
pub(crate) fn ensure_finite<'a>(values: impl IntoIterator<Item = &'a f64>) -> Result<()> {
    if values.into_iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ModelError::NonFinite)
    }
}
