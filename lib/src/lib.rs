//! # elastictrack
//!
//! Elastic-net linear regression with experiment tracking.
//!
//! ## Core Design Principles
//!
//! - **Stateful Type Safety**: models carry their training state in the type system
//!   (`Unfitted` vs `Fitted`); only fitted models predict or serialize.
//! - **Training/Inference Separation**: a fitted model holds coefficients and an
//!   intercept. The coordinate-descent solver and penalty live in `solver` and
//!   `regularizers`.
//! - **Explicit endpoints**: the tracking store is a value built from a URI and
//!   passed in, never process-wide state.
//!
//! ## Quick Start
//!
//! ```rust
//! use elastictrack::dataset::{read_csv, train_test_split, CsvOptions, SplitOptions};
//! use elastictrack::metrics::Metrics;
//! use elastictrack::model::{ElasticNet, InferenceModel};
//! use elastictrack::tracking::{InMemoryStore, RunStatus, Tracker};
//!
//! let csv = "alcohol;pH;quality\n9.0;3.0;5\n9.5;3.1;5\n10.0;3.2;6\n10.5;3.3;6\n\
//!            11.0;3.1;7\n11.5;3.0;7\n12.0;3.4;8\n12.5;3.2;8\n";
//! let dataset = read_csv(csv.as_bytes(), &CsvOptions::default()).unwrap();
//! let (train, test) = train_test_split(&dataset, &SplitOptions::default().seed(7)).unwrap();
//!
//! let model = ElasticNet::new(0.1, 0.5).fit(train.x(), train.y()).unwrap();
//! let predictions = model.predict_batch(test.x()).unwrap();
//! let metrics = Metrics::calculate_all(test.y(), predictions.view()).unwrap();
//!
//! let mut tracker = Tracker::new(InMemoryStore::new(), "wine");
//! let run = tracker.start_run(None).unwrap();
//! tracker.log_metric(&run.run_id, "rmse", metrics.rmse, 0).unwrap();
//! tracker.log_model(&run.run_id, "model", &model, None).unwrap();
//! tracker.end_run(&run.run_id, RunStatus::Finished).unwrap();
//! ```
//!
//! ## Module Structure
//!
//! - `dataset`: CSV loading, feature selection, train/test split
//! - `model`: `ElasticNet` with stateful type parameters
//! - `solver`: coordinate descent with duality-gap stopping
//! - `regularizers`: L1, L2 and elastic-net penalties
//! - `metrics`: RMSE, MAE, R²
//! - `serialization`: parameter encoding
//! - `tracking`: runs, parameters, metrics and model artifacts

/// Tabular datasets and train/test splitting.
pub mod dataset;

/// Regression metrics.
pub mod metrics;

/// Machine learning models with compile-time state safety.
pub mod model;

/// Weight regularization strategies.
pub mod regularizers;

/// Model persistence.
pub mod serialization;

/// Coordinate-descent optimization for penalized least squares.
pub mod solver;

/// Experiment tracking client and stores.
pub mod tracking;

pub use dataset::{Dataset, DatasetError};
pub use metrics::{Metrics, MetricsError, RegressionMetrics};
pub use model::{ElasticNet, ElasticNetConfig, Fitted, InferenceModel, ModelError, Unfitted};
pub use tracking::{RunStatus, Tracker, TrackingError, TrackingStore, TrackingUri};
