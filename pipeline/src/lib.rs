//! Wine-quality training pipeline.
//!
//! Loads a semicolon-delimited CSV, holds out a test split, fits an elastic-net
//! model, prints RMSE/MAE/R² and records the run (parameters, metrics and the
//! model artifact) with an experiment tracking store.
//!
//! ```no_run
//! use elastictrack::tracking::{TrackingUri, Tracker};
//! use elastictrack_pipeline::{run, DataSource, PipelineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::new(DataSource::from("winequality-white.csv"))
//!     .with_tracking_uri(TrackingUri::parse("./mlruns")?)
//!     .with_split_seed(42);
//! let store = config.tracking.uri.open(None)?;
//! let mut tracker = Tracker::new(store, &config.tracking.experiment_name);
//! let summary = run(&config, &mut tracker, &mut std::io::stdout())?;
//! println!("logged run {}", summary.run_id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod pipeline;

pub use config::{
    load_dotenv, Cli, ConfigError, PipelineConfig, SplitConfig, TrackingConfig, TrainConfig,
};
pub use data::{fetch, DataSource, DataUnavailableError, DEFAULT_DATA_URL};
pub use pipeline::{run, write_report, PipelineError, RunSummary, MODEL_ARTIFACT_PATH};
