use super::{Dataset, DatasetError, Result};
use ::csv::{ReaderBuilder, StringRecord, Trim};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// How to read a delimited text table into a [`Dataset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOptions {
    /// Field separator. Defaults to `;`.
    pub delimiter: u8,
    /// Header name of the target column. Defaults to `quality`.
    pub target: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            target: "quality".to_string(),
        }
    }
}

impl CsvOptions {
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

/// Reads a CSV table with a header row. Every column other than the target
/// becomes a feature, in header order.
pub fn read_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let target_idx = headers
        .iter()
        .position(|h| h == options.target)
        .ok_or_else(|| DatasetError::MissingColumn(options.target.clone()))?;
    let feature_names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != target_idx)
        .map(|(_, h)| h.to_string())
        .collect();
    if feature_names.is_empty() {
        return Err(DatasetError::NoFeatures);
    }

    let mut values = Vec::new();
    let mut target = Vec::new();
    let mut record = StringRecord::new();
    let mut row = 0;
    while rdr.read_record(&mut record)? {
        row += 1;
        if record.len() != headers.len() {
            return Err(DatasetError::Ragged {
                row,
                expected: headers.len(),
                got: record.len(),
            });
        }
        for (i, field) in record.iter().enumerate() {
            let value = parse_cell(field, row, &headers[i])?;
            if i == target_idx {
                target.push(value);
            } else {
                values.push(value);
            }
        }
    }
    if target.is_empty() {
        return Err(DatasetError::Empty);
    }

    log::debug!(
        "parsed {} rows x {} features, target '{}'",
        target.len(),
        feature_names.len(),
        options.target
    );
    let x = Array2::from_shape_vec((target.len(), feature_names.len()), values)
        .map_err(|_| DatasetError::ShapeMismatch {
            x_rows: target.len(),
            y_len: target.len(),
            x_cols: feature_names.len(),
            names: feature_names.len(),
        })?;
    Dataset::new(feature_names, options.target.clone(), x, Array1::from(target))
}

/// Reads a CSV file from disk.
pub fn load_csv(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Dataset> {
    let file = File::open(path)?;
    read_csv(BufReader::new(file), options)
}

fn parse_cell(field: &str, row: usize, column: &str) -> Result<f64> {
    field.parse::<f64>().map_err(|_| DatasetError::Parse {
        row,
        column: column.to_string(),
        value: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const WINE: &str = "\"fixed acidity\";\"volatile acidity\";\"alcohol\";\"quality\"\n\
                        7;0.27;8.8;6\n\
                        6.3;0.3;9.5;6\n\
                        8.1;0.28;10.1;6\n\
                        7.2;0.23;9.9;6\n";

    #[test]
    fn test_read_quoted_semicolon_header() {
        let ds = read_csv(WINE.as_bytes(), &CsvOptions::default()).unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(
            ds.feature_names(),
            ["fixed acidity", "volatile acidity", "alcohol"]
        );
        assert_eq!(ds.target_name(), "quality");
        assert_eq!(ds.x()[[1, 2]], 9.5);
        assert_eq!(ds.y().to_vec(), vec![6.0; 4]);
    }

    #[test]
    fn test_target_in_middle_column() {
        let data = "a,target,b\n1,10,2\n3,20,4\n";
        let options = CsvOptions::default().delimiter(b',').target("target");
        let ds = read_csv(data.as_bytes(), &options).unwrap();
        assert_eq!(ds.feature_names(), ["a", "b"]);
        assert_eq!(ds.x().row(1).to_vec(), vec![3.0, 4.0]);
        assert_eq!(ds.y().to_vec(), vec![10.0, 20.0]);
    }

    #[test]
    fn test_missing_target_column() {
        let err = read_csv("a;b\n1;2\n".as_bytes(), &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(c) if c == "quality"));
    }

    #[test]
    fn test_target_only_has_no_features() {
        let err = read_csv("quality\n5\n".as_bytes(), &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, DatasetError::NoFeatures));
    }

    #[test]
    fn test_unparsable_cell_reports_location() {
        let data = "a;quality\n1;5\nabc;6\n";
        let err = read_csv(data.as_bytes(), &CsvOptions::default()).unwrap_err();
        match err {
            DatasetError::Parse { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "a");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ragged_row() {
        let data = "a;b;quality\n1;2;5\n1;5\n";
        let err = read_csv(data.as_bytes(), &CsvOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Ragged {
                row: 2,
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn test_header_only_is_empty() {
        let err = read_csv("a;quality\n".as_bytes(), &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, DatasetError::Empty));
    }

    #[test]
    fn test_load_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(WINE.as_bytes()).unwrap();
        let ds = load_csv(file.path(), &CsvOptions::default()).unwrap();
        assert_eq!(ds.n_features(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_csv("/nonexistent/winequality.csv", &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, DatasetError::Io(_)));
    }
}
