//! Tabular regression datasets.
//!
//! A [`Dataset`] is an immutable `(X, y)` pair with named feature columns and a
//! named target. Datasets are built from CSV via [`read_csv`] / [`load_csv`] and
//! split with [`train_test_split`].
//!
//! ```rust
//! use elastictrack::dataset::{read_csv, train_test_split, CsvOptions, SplitOptions};
//!
//! let data = "a;b;quality\n1;2;5\n2;1;6\n3;3;7\n4;0;5\n";
//! let dataset = read_csv(data.as_bytes(), &CsvOptions::default()).unwrap();
//! assert_eq!(dataset.feature_names(), ["a", "b"]);
//!
//! let (train, test) = train_test_split(&dataset, &SplitOptions::default().seed(1)).unwrap();
//! assert_eq!((train.len(), test.len()), (3, 1));
//! ```

mod csv;
mod split;

pub use self::csv::{load_csv, read_csv, CsvOptions};
pub use self::split::{train_test_split, SplitOptions};

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Errors raised while loading, validating or splitting a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("malformed CSV")]
    Csv(#[from] ::csv::Error),

    #[error("could not read dataset")]
    Io(#[from] std::io::Error),

    #[error("target column '{0}' not found in header")]
    MissingColumn(String),

    #[error("no feature columns besides the target")]
    NoFeatures,

    #[error("row {row}, column '{column}': cannot parse '{value}' as a number")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row} has {got} fields, header has {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("dataset has no rows")]
    Empty,

    #[error("shape mismatch: {x_rows} feature rows, {y_len} targets, {x_cols} columns for {names} names")]
    ShapeMismatch {
        x_rows: usize,
        y_len: usize,
        x_cols: usize,
        names: usize,
    },

    #[error("dataset contains NaN or infinite values")]
    NonFinite,

    #[error("invalid split: {0}")]
    InvalidSplit(String),

    #[error("unknown feature '{0}'")]
    UnknownFeature(String),
}

/// Result alias for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

/// Numeric features plus one numeric target, row-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    feature_names: Vec<String>,
    target_name: String,
    x: Array2<f64>,
    y: Array1<f64>,
}

impl Dataset {
    /// Builds a dataset after checking that shapes agree, there is at least one
    /// row and one feature, and every value is finite.
    pub fn new(
        feature_names: Vec<String>,
        target_name: impl Into<String>,
        x: Array2<f64>,
        y: Array1<f64>,
    ) -> Result<Self> {
        if x.nrows() != y.len() || x.ncols() != feature_names.len() {
            return Err(DatasetError::ShapeMismatch {
                x_rows: x.nrows(),
                y_len: y.len(),
                x_cols: x.ncols(),
                names: feature_names.len(),
            });
        }
        if x.ncols() == 0 {
            return Err(DatasetError::NoFeatures);
        }
        if y.is_empty() {
            return Err(DatasetError::Empty);
        }
        if !x.iter().chain(y.iter()).all(|v| v.is_finite()) {
            return Err(DatasetError::NonFinite);
        }
        Ok(Self {
            feature_names,
            target_name: target_name.into(),
            x,
            y,
        })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Feature matrix, shape `(n_samples, n_features)`.
    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView1<'_, f64> {
        self.y.view()
    }

    /// Keeps only the named feature columns, in the order given.
    pub fn select_features<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.feature_names
                    .iter()
                    .position(|f| f == name)
                    .ok_or_else(|| DatasetError::UnknownFeature(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        if indices.is_empty() {
            return Err(DatasetError::NoFeatures);
        }

        Ok(Self {
            feature_names: indices
                .iter()
                .map(|&i| self.feature_names[i].clone())
                .collect(),
            target_name: self.target_name.clone(),
            x: self.x.select(Axis(1), &indices),
            y: self.y.clone(),
        })
    }

    /// Rows at `indices`, in that order.
    pub(crate) fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
        }
    }
}
