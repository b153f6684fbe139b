use super::{Credentials, FileStore, RestStore, Result, TrackingError, TrackingStore};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where runs are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingUri {
    /// An MLflow tracking server, `http://` or `https://`.
    Rest(String),
    /// A local directory, `file://<path>` or a bare path.
    File(PathBuf),
}

impl TrackingUri {
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(TrackingError::UnsupportedUri(uri.to_string()));
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(Self::Rest(uri.trim_end_matches('/').to_string()));
        }
        if let Some(path) = uri.strip_prefix("file://") {
            if path.is_empty() {
                return Err(TrackingError::UnsupportedUri(uri.to_string()));
            }
            return Ok(Self::File(PathBuf::from(path)));
        }
        if has_scheme(uri) {
            return Err(TrackingError::UnsupportedUri(uri.to_string()));
        }
        Ok(Self::File(PathBuf::from(uri)))
    }

    /// Opens the store this URI points at.
    pub fn open(&self, credentials: Option<Credentials>) -> Result<Box<dyn TrackingStore>> {
        match self {
            Self::Rest(url) => {
                log::info!("tracking to server {url}");
                Ok(Box::new(RestStore::new(url, credentials)?))
            }
            Self::File(path) => {
                log::info!("tracking to directory {}", path.display());
                Ok(Box::new(FileStore::new(path)?))
            }
        }
    }
}

impl FromStr for TrackingUri {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TrackingUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rest(url) => f.write_str(url),
            Self::File(path) => write!(f, "file://{}", path.display()),
        }
    }
}

/// Parses `uri` and opens the matching store.
pub fn open_store(uri: &str, credentials: Option<Credentials>) -> Result<Box<dyn TrackingStore>> {
    TrackingUri::parse(uri)?.open(credentials)
}

/// `scheme:` prefix per RFC 3986. Single letters are Windows drive letters.
fn has_scheme(uri: &str) -> bool {
    match uri.split_once(':') {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}
