//! Training data retrieval.

use elastictrack::dataset::{read_csv, CsvOptions, Dataset, DatasetError};
use reqwest::blocking::Client;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

/// Public white-wine quality dataset (semicolon-delimited, 11 features + `quality`).
pub const DEFAULT_DATA_URL: &str =
    "https://raw.githubusercontent.com/mlflow/mlflow/master/tests/datasets/winequality-white.csv";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// The training data could not be obtained or understood.
#[derive(Debug, thiserror::Error)]
pub enum DataUnavailableError {
    #[error("failed to download {url}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{location} is not a usable dataset")]
    Parse {
        location: String,
        #[source]
        source: DatasetError,
    },
}

/// Where the CSV comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Url(String),
    Path(PathBuf),
}

impl From<&str> for DataSource {
    fn from(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            Self::Url(s.to_string())
        } else {
            Self::Path(PathBuf::from(s))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Downloads or opens `source` and parses it as a CSV dataset.
pub fn fetch(source: &DataSource, options: &CsvOptions) -> Result<Dataset, DataUnavailableError> {
    match source {
        DataSource::Url(url) => {
            let request_err = |source: reqwest::Error| DataUnavailableError::Request {
                url: url.clone(),
                source,
            };
            let client = Client::builder()
                .timeout(DOWNLOAD_TIMEOUT)
                .build()
                .map_err(request_err)?;
            log::debug!("GET {url}");
            let response = client.get(url).send().map_err(request_err)?;
            let status = response.status();
            if !status.is_success() {
                return Err(DataUnavailableError::Status {
                    url: url.clone(),
                    status: status.as_u16(),
                });
            }
            let body = response.bytes().map_err(request_err)?;
            log::debug!("downloaded {} bytes", body.len());
            read_csv(body.as_ref(), options).map_err(|source| DataUnavailableError::Parse {
                location: url.clone(),
                source,
            })
        }
        DataSource::Path(path) => {
            let file = File::open(path).map_err(|source| DataUnavailableError::Io {
                path: path.clone(),
                source,
            })?;
            read_csv(BufReader::new(file), options).map_err(|source| {
                DataUnavailableError::Parse {
                    location: path.display().to_string(),
                    source,
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_source_from_str() {
        assert_eq!(
            DataSource::from(DEFAULT_DATA_URL),
            DataSource::Url(DEFAULT_DATA_URL.to_string())
        );
        assert_eq!(
            DataSource::from("data/wine.csv"),
            DataSource::Path(PathBuf::from("data/wine.csv"))
        );
        assert_eq!(DataSource::from("data/wine.csv").to_string(), "data/wine.csv");
    }

    #[test]
    fn test_fetch_local_file() {
        let file = csv_file("alcohol;pH;quality\n9.4;3.51;5\n9.8;3.2;5\n10.0;3.26;6\n");
        let source = DataSource::Path(file.path().to_path_buf());
        let dataset = fetch(&source, &CsvOptions::default()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.feature_names(), ["alcohol", "pH"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = DataSource::from("/definitely/not/here.csv");
        let err = fetch(&source, &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, DataUnavailableError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }

    #[test]
    fn test_malformed_csv_is_parse_error() {
        let file = csv_file("alcohol;pH\n9.4;3.51\n");
        let source = DataSource::Path(file.path().to_path_buf());
        let err = fetch(&source, &CsvOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            DataUnavailableError::Parse {
                source: DatasetError::MissingColumn(_),
                ..
            }
        ));
    }

    #[test]
    fn test_unreachable_url_is_request_error() {
        let source = DataSource::from("http://127.0.0.1:9/winequality-white.csv");
        let err = fetch(&source, &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, DataUnavailableError::Request { .. }));
    }
}
