//! Serialization of fitted model parameters.
//!
//! Parameters are plain numerical records (`Vec<f64>`, scalars) that any
//! `serde` type can provide; this module turns them into bytes and back without
//! coupling models to a particular file format.

use crate::model::ModelError;
use serde::{de::DeserializeOwned, Serialize};

/// Errors raised while encoding or decoding parameters and artifacts.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("bincode encoding failed")]
    Bincode(#[from] bincode::Error),

    #[error("JSON encoding failed")]
    Json(#[from] serde_json::Error),

    #[error("YAML encoding failed")]
    Yaml(#[from] serde_yaml::Error),

    #[error("parameter file I/O failed")]
    Io(#[from] std::io::Error),

    #[error("decoded parameters are invalid")]
    InvalidParams(#[from] ModelError),
}

/// Parameter representations that can be serialized to and from bytes.
pub trait SerializableParams: Sized {
    /// Serialize the parameters into a byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, SerializationError>;

    /// Deserialize the parameters from a byte buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError>;
}

impl<T> SerializableParams for T
where
    T: Serialize + DeserializeOwned,
{
    fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        Ok(bincode::serialize(self)?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Weights {
        coef: Vec<f64>,
        intercept: f64,
    }

    #[test]
    fn test_bytes_roundtrip() {
        let w = Weights {
            coef: vec![0.25, -1.5],
            intercept: 5.0,
        };
        let bytes = w.to_bytes().unwrap();
        assert_eq!(Weights::from_bytes(&bytes).unwrap(), w);
    }

    #[test]
    fn test_truncated_bytes_fail() {
        let bytes = Weights {
            coef: vec![1.0, 2.0, 3.0],
            intercept: 0.0,
        }
        .to_bytes()
        .unwrap();
        let err = Weights::from_bytes(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, SerializationError::Bincode(_)));
    }
}
