//! Command-line arguments and the resolved pipeline configuration.
//!
//! [`Cli`] is what the user typed (plus `MLFLOW_*` environment fallbacks);
//! [`PipelineConfig`] is the validated value the pipeline runs from. The
//! environment is only read while converting one into the other.

use crate::data::{DataSource, DEFAULT_DATA_URL};
use clap::{Parser, ValueEnum};
use elastictrack::dataset::CsvOptions;
use elastictrack::solver::Selection;
use elastictrack::tracking::{Credentials, TrackingError, TrackingUri};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("alpha must be a finite number >= 0, got {0}")]
    InvalidAlpha(f64),

    #[error("l1_ratio must lie in [0, 1], got {0}")]
    InvalidL1Ratio(f64),

    #[error("test size must lie strictly between 0 and 1, got {0}")]
    InvalidTestSize(f64),

    #[error("tolerance must be a finite number >= 0, got {0}")]
    InvalidTolerance(f64),

    #[error("max_iter must be at least 1")]
    InvalidMaxIter,

    #[error("invalid tracking URI")]
    TrackingUri(#[from] TrackingError),
}

/// Train an elastic-net model on the wine-quality data and record the run.
#[derive(Debug, Parser)]
#[command(name = "train", version)]
pub struct Cli {
    /// Overall regularization strength
    #[arg(default_value_t = 0.5, allow_negative_numbers = true)]
    pub alpha: f64,

    /// Share of the penalty that is L1, between 0 and 1
    #[arg(default_value_t = 0.5, allow_negative_numbers = true)]
    pub l1_ratio: f64,

    /// CSV source, an http(s) URL or a local path
    #[arg(long, default_value = DEFAULT_DATA_URL)]
    pub data: String,

    /// Tracking server URL, file:// URI or directory
    #[arg(long, env = "MLFLOW_TRACKING_URI", default_value = "./mlruns")]
    pub tracking_uri: String,

    /// Experiment to record the run under
    #[arg(long, env = "MLFLOW_EXPERIMENT_NAME", default_value = "Default")]
    pub experiment: String,

    /// Human-readable run name
    #[arg(long)]
    pub run_name: Option<String>,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value_t = 0.25)]
    pub test_size: f64,

    /// Seed for the train/test shuffle (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum coordinate-descent sweeps
    #[arg(long, default_value_t = 1000)]
    pub max_iter: usize,

    /// Duality-gap tolerance
    #[arg(long, default_value_t = 1e-4)]
    pub tol: f64,

    /// Coefficient update order
    #[arg(long, value_enum, default_value_t = SelectionArg::Cyclic)]
    pub selection: SelectionArg,

    /// Log debug output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectionArg {
    Cyclic,
    Random,
}

impl From<SelectionArg> for Selection {
    fn from(arg: SelectionArg) -> Self {
        match arg {
            SelectionArg::Cyclic => Selection::Cyclic,
            SelectionArg::Random => Selection::Random,
        }
    }
}

/// Model hyperparameters and solver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub alpha: f64,
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub selection: Selection,
    pub random_state: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            l1_ratio: 0.5,
            max_iter: 1000,
            tol: 1e-4,
            selection: Selection::Cyclic,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    pub test_size: f64,
    pub seed: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.25,
            seed: None,
        }
    }
}

/// Where and how the run is recorded.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub uri: TrackingUri,
    pub experiment_name: String,
    pub run_name: Option<String>,
    pub credentials: Option<Credentials>,
    /// Value of the `mlflow.user` tag.
    pub user: Option<String>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            uri: TrackingUri::File(PathBuf::from("./mlruns")),
            experiment_name: "Default".to_string(),
            run_name: None,
            credentials: None,
            user: None,
        }
    }
}

/// Everything one pipeline run needs, resolved up front.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data: DataSource,
    pub csv: CsvOptions,
    pub train: TrainConfig,
    pub split: SplitConfig,
    pub tracking: TrackingConfig,
}

impl PipelineConfig {
    /// Default settings reading from `data`.
    pub fn new(data: DataSource) -> Self {
        Self {
            data,
            csv: CsvOptions::default(),
            train: TrainConfig::default(),
            split: SplitConfig::default(),
            tracking: TrackingConfig::default(),
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.train.alpha = alpha;
        self
    }

    pub fn with_l1_ratio(mut self, l1_ratio: f64) -> Self {
        self.train.l1_ratio = l1_ratio;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.train.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.train.tol = tol;
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.train.selection = selection;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.split.test_size = test_size;
        self
    }

    pub fn with_split_seed(mut self, seed: u64) -> Self {
        self.split.seed = Some(seed);
        self
    }

    pub fn with_csv_options(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    pub fn with_tracking_uri(mut self, uri: TrackingUri) -> Self {
        self.tracking.uri = uri;
        self
    }

    pub fn with_experiment(mut self, name: impl Into<String>) -> Self {
        self.tracking.experiment_name = name.into();
        self
    }

    pub fn with_run_name(mut self, name: impl Into<String>) -> Self {
        self.tracking.run_name = Some(name.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let train = &self.train;
        if !train.alpha.is_finite() || train.alpha < 0.0 {
            return Err(ConfigError::InvalidAlpha(train.alpha));
        }
        if !(0.0..=1.0).contains(&train.l1_ratio) {
            return Err(ConfigError::InvalidL1Ratio(train.l1_ratio));
        }
        if !train.tol.is_finite() || train.tol < 0.0 {
            return Err(ConfigError::InvalidTolerance(train.tol));
        }
        if train.max_iter == 0 {
            return Err(ConfigError::InvalidMaxIter);
        }
        if !(self.split.test_size > 0.0 && self.split.test_size < 1.0) {
            return Err(ConfigError::InvalidTestSize(self.split.test_size));
        }
        Ok(())
    }
}

impl TryFrom<Cli> for PipelineConfig {
    type Error = ConfigError;

    /// Resolves CLI arguments. Tracking credentials and the `USER` tag value are
    /// read from the environment here and nowhere else.
    fn try_from(cli: Cli) -> Result<Self, ConfigError> {
        let config = Self {
            data: DataSource::from(cli.data.as_str()),
            csv: CsvOptions::default(),
            train: TrainConfig {
                alpha: cli.alpha,
                l1_ratio: cli.l1_ratio,
                max_iter: cli.max_iter,
                tol: cli.tol,
                selection: cli.selection.into(),
                ..TrainConfig::default()
            },
            split: SplitConfig {
                test_size: cli.test_size,
                seed: cli.seed,
            },
            tracking: TrackingConfig {
                uri: TrackingUri::parse(&cli.tracking_uri)?,
                experiment_name: cli.experiment,
                run_name: cli.run_name,
                credentials: Credentials::from_env(),
                user: std::env::var("USER").ok().filter(|u| !u.is_empty()),
            },
        };
        config.validate()?;
        Ok(config)
    }
}

/// Loads `KEY=value` pairs from a `.env` file in the working directory or one
/// of its parents, so `MLFLOW_*` settings kept there reach [`Cli`]. Variables
/// already set in the environment keep their value.
///
/// Must run before [`Cli::parse`]. Returns the file that was read, if any.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
