//! load → split → fit → evaluate → report → log.

use crate::config::{ConfigError, PipelineConfig};
use crate::data::{self, DataUnavailableError};
use elastictrack::dataset::{train_test_split, Dataset, DatasetError, SplitOptions};
use elastictrack::metrics::{Metrics, MetricsError, RegressionMetrics};
use elastictrack::model::{
    ElasticNet, ElasticNetConfig, FitDiagnostics, InferenceModel, ModelError,
};
use elastictrack::tracking::{ModelSignature, RunStatus, Tracker, TrackingError, TrackingStore};
use std::io::{self, Write};

/// Artifact path the fitted model is logged under.
pub const MODEL_ARTIFACT_PATH: &str = "model";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    #[error("training data unavailable")]
    DataUnavailable(#[from] DataUnavailableError),

    #[error("dataset could not be split")]
    Dataset(#[from] DatasetError),

    #[error("model fit failed")]
    Model(#[from] ModelError),

    #[error("evaluation failed")]
    Metrics(#[from] MetricsError),

    #[error("tracking failed")]
    Tracking(#[from] TrackingError),

    #[error("could not write report")]
    Report(#[from] io::Error),
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub alpha: f64,
    pub l1_ratio: f64,
    pub metrics: RegressionMetrics,
    pub n_train: usize,
    pub n_test: usize,
    pub diagnostics: Option<FitDiagnostics>,
}

/// Runs the whole pipeline once, writing the evaluation report to `out`.
///
/// A data source that cannot be fetched aborts before any run is created. Once
/// the run exists, any later failure marks it `FAILED` before the error is
/// returned.
pub fn run<S, W>(
    config: &PipelineConfig,
    tracker: &mut Tracker<S>,
    out: &mut W,
) -> Result<RunSummary, PipelineError>
where
    S: TrackingStore,
    W: Write,
{
    config.validate()?;

    log::info!("loading data from {}", config.data);
    let dataset = data::fetch(&config.data, &config.csv).map_err(|e| {
        log::error!("Unable to load training data: {e}");
        e
    })?;
    log::info!(
        "loaded {} rows with {} features",
        dataset.len(),
        dataset.n_features()
    );

    let split = SplitOptions {
        test_size: config.split.test_size,
        seed: config.split.seed,
        shuffle: true,
    };
    let (train, test) = train_test_split(&dataset, &split)?;

    let run = tracker.start_run(config.tracking.run_name.as_deref())?;
    match fit_and_log(config, tracker, &run.run_id, &train, &test, out) {
        Ok(summary) => {
            tracker.end_run(&run.run_id, RunStatus::Finished)?;
            Ok(summary)
        }
        Err(e) => {
            log::error!("run {} failed: {e}", run.run_id);
            if let Err(end_err) = tracker.end_run(&run.run_id, RunStatus::Failed) {
                log::warn!("could not mark run {} as failed: {end_err}", run.run_id);
            }
            Err(e)
        }
    }
}

fn fit_and_log<S: TrackingStore, W: Write>(
    config: &PipelineConfig,
    tracker: &mut Tracker<S>,
    run_id: &str,
    train: &Dataset,
    test: &Dataset,
    out: &mut W,
) -> Result<RunSummary, PipelineError> {
    let params = &config.train;
    let model = ElasticNet::with_config(ElasticNetConfig {
        alpha: params.alpha,
        l1_ratio: params.l1_ratio,
        fit_intercept: true,
        max_iter: params.max_iter,
        tol: params.tol,
        selection: params.selection,
        random_state: params.random_state,
    })
    .fit(train.x(), train.y())?;

    let predicted = model.predict_batch(test.x())?;
    let metrics = Metrics::calculate_all(test.y(), predicted.view())?;

    write_report(out, params.alpha, params.l1_ratio, &metrics)?;

    tracker.log_param(run_id, "alpha", &format!("{:?}", params.alpha))?;
    tracker.log_param(run_id, "l1_ratio", &format!("{:?}", params.l1_ratio))?;
    tracker.log_metric(run_id, "rmse", metrics.rmse, 0)?;
    tracker.log_metric(run_id, "r2", metrics.r2, 0)?;
    tracker.log_metric(run_id, "mae", metrics.mae, 0)?;

    let signature = ModelSignature::infer(train.feature_names(), train.target_name());
    tracker.log_model(run_id, MODEL_ARTIFACT_PATH, &model, Some(&signature))?;

    Ok(RunSummary {
        run_id: run_id.to_string(),
        alpha: params.alpha,
        l1_ratio: params.l1_ratio,
        metrics,
        n_train: train.len(),
        n_test: test.len(),
        diagnostics: model.diagnostics().copied(),
    })
}

/// Writes the evaluation report:
///
/// ```text
/// Elasticnet model (alpha = 0.500000), (l1_ratio = 0.500000)
///   RMSE: 0.7931640229276851
///   MAE: 0.6271946374319586
///   R2: 0.10862644997792614
/// ```
pub fn write_report<W: Write>(
    out: &mut W,
    alpha: f64,
    l1_ratio: f64,
    metrics: &RegressionMetrics,
) -> io::Result<()> {
    writeln!(
        out,
        "Elasticnet model (alpha = {alpha:.6}), (l1_ratio = {l1_ratio:.6})"
    )?;
    writeln!(out, "  RMSE: {}", metrics.rmse)?;
    writeln!(out, "  MAE: {}", metrics.mae)?;
    writeln!(out, "  R2: {}", metrics.r2)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_format() {
        let metrics = RegressionMetrics {
            mse: 0.25,
            rmse: 0.5,
            mae: 0.375,
            r2: -0.125,
        };
        let mut out = Vec::new();
        write_report(&mut out, 0.5, 1.0, &metrics).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Elasticnet model (alpha = 0.500000), (l1_ratio = 1.000000)\n\
             \x20 RMSE: 0.5\n\
             \x20 MAE: 0.375\n\
             \x20 R2: -0.125\n"
        );
    }

    #[test]
    fn test_error_chain_names_each_cause_once() {
        let err = PipelineError::from(DataUnavailableError::Io {
            path: "wine.csv".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        });
        let chain = format!("{:#}", anyhow::Error::new(err));
        assert_eq!(
            chain,
            "training data unavailable: failed to read wine.csv: no such file"
        );
    }

    #[test]
    fn test_param_formatting_keeps_decimal_point() {
        assert_eq!(format!("{:?}", 1.0f64), "1.0");
        assert_eq!(format!("{:?}", 0.5f64), "0.5");
    }
}
