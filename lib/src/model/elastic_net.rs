//! Elastic-net linear regression.
//!
//! [`ElasticNet<Unfitted>`] carries hyperparameters only; [`ElasticNet::fit`]
//! runs coordinate descent with an [`ElasticNetPenalty`] and returns an
//! [`ElasticNet<Fitted>`] holding the learned coefficients.
//!
//! ```rust
//! use elastictrack::model::{ElasticNet, InferenceModel};
//! use ndarray::array;
//!
//! let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 3.0]];
//! let y = array![3.0, 4.0, 6.0, 14.0];
//!
//! let fitted = ElasticNet::new(0.01, 0.5).fit(x.view(), y.view()).unwrap();
//! let predictions = fitted.predict_batch(x.view()).unwrap();
//! assert_eq!(predictions.len(), 4);
//! ```

use super::{ensure_finite, Fitted, InferenceModel, ModelError, Result, Unfitted};
use crate::regularizers::ElasticNetPenalty;
use crate::solver::{CoordinateDescent, Selection};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Hyperparameters of an elastic-net model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetConfig {
    /// Overall regularization strength, `>= 0`.
    pub alpha: f64,
    /// L1 share of the penalty, in `[0, 1]`.
    pub l1_ratio: f64,
    pub fit_intercept: bool,
    pub max_iter: usize,
    pub tol: f64,
    pub selection: Selection,
    /// Seed for random coordinate selection.
    pub random_state: u64,
}

impl Default for ElasticNetConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            l1_ratio: 0.5,
            fit_intercept: true,
            max_iter: 1000,
            tol: 1e-4,
            selection: Selection::Cyclic,
            random_state: 42,
        }
    }
}

impl ElasticNetConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(ModelError::InvalidAlpha(self.alpha));
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(ModelError::InvalidL1Ratio(self.l1_ratio));
        }
        Ok(())
    }
}

/// Serializable learned parameters: `y = coef . x + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetParams {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

/// Solver report attached to a freshly fitted model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub n_iter: usize,
    pub dual_gap: f64,
    pub converged: bool,
}

/// Elastic-net regressor with its training state encoded in the type.
#[derive(Debug, Clone)]
pub struct ElasticNet<S> {
    config: ElasticNetConfig,
    coef: Array1<f64>,
    intercept: f64,
    diagnostics: Option<FitDiagnostics>,
    _state: PhantomData<S>,
}

impl ElasticNet<Unfitted> {
    /// Creates an unfitted model with the given penalty and default solver settings.
    pub fn new(alpha: f64, l1_ratio: f64) -> Self {
        Self::with_config(ElasticNetConfig {
            alpha,
            l1_ratio,
            ..ElasticNetConfig::default()
        })
    }

    pub fn with_config(config: ElasticNetConfig) -> Self {
        Self {
            config,
            coef: Array1::zeros(0),
            intercept: 0.0,
            diagnostics: None,
            _state: PhantomData,
        }
    }

    pub fn fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.config.fit_intercept = fit_intercept;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.config.tol = tol;
        self
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.config.selection = selection;
        self
    }

    pub fn random_state(mut self, seed: u64) -> Self {
        self.config.random_state = seed;
        self
    }

    /// Fits the model on `(x, y)` and returns the trained model.
    ///
    /// # Errors
    /// Invalid hyperparameters, mismatched or empty inputs, and non-finite values
    /// are rejected before the solver runs.
    pub fn fit(self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<ElasticNet<Fitted>> {
        self.config.validate()?;
        ensure_finite(x.iter())?;
        ensure_finite(y.iter())?;

        let penalty = ElasticNetPenalty::new(self.config.alpha, self.config.l1_ratio);
        let solver = CoordinateDescent::builder(penalty)
            .max_iter(self.config.max_iter)
            .tol(self.config.tol)
            .selection(self.config.selection)
            .random_state(self.config.random_state)
            .fit_intercept(self.config.fit_intercept)
            .build();

        let solution = solver.fit(x, y)?;
        log::info!(
            "elastic net (alpha = {}, l1_ratio = {}) fitted in {} iterations, {} non-zero coefficients",
            self.config.alpha,
            self.config.l1_ratio,
            solution.n_iter,
            solution.coef.iter().filter(|&&w| w != 0.0).count()
        );

        Ok(ElasticNet {
            config: self.config,
            coef: solution.coef,
            intercept: solution.intercept,
            diagnostics: Some(FitDiagnostics {
                n_iter: solution.n_iter,
                dual_gap: solution.dual_gap,
                converged: solution.converged,
            }),
            _state: PhantomData,
        })
    }
}

impl<S> ElasticNet<S> {
    /// Hyperparameters the model was built with. Models restored through
    /// [`InferenceModel::from_params`] report the defaults.
    pub fn config(&self) -> &ElasticNetConfig {
        &self.config
    }
}

impl ElasticNet<Fitted> {
    pub fn coef(&self) -> ArrayView1<'_, f64> {
        self.coef.view()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Solver report, `None` for models restored from saved parameters.
    pub fn diagnostics(&self) -> Option<&FitDiagnostics> {
        self.diagnostics.as_ref()
    }
}

impl InferenceModel for ElasticNet<Fitted> {
    type Params = ElasticNetParams;

    fn model_type(&self) -> &'static str {
        "elastic_net"
    }

    fn n_features(&self) -> usize {
        self.coef.len()
    }

    fn predict(&self, row: ArrayView1<f64>) -> Result<f64> {
        if row.len() != self.coef.len() {
            return Err(ModelError::FeatureMismatch {
                expected: self.coef.len(),
                got: row.len(),
            });
        }
        Ok(self.coef.dot(&row) + self.intercept)
    }

    fn predict_batch(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.coef.len() {
            return Err(ModelError::FeatureMismatch {
                expected: self.coef.len(),
                got: x.ncols(),
            });
        }
        Ok(x.dot(&self.coef) + self.intercept)
    }

    fn extract_params(&self) -> ElasticNetParams {
        ElasticNetParams {
            coef: self.coef.to_vec(),
            intercept: self.intercept,
        }
    }

    fn from_params(params: ElasticNetParams) -> Result<Self> {
        if params.coef.is_empty() {
            return Err(ModelError::EmptyInput("no coefficients"));
        }
        ensure_finite(params.coef.iter().chain(std::iter::once(&params.intercept)))?;
        Ok(Self {
            config: ElasticNetConfig::default(),
            coef: Array1::from(params.coef),
            intercept: params.intercept,
            diagnostics: None,
            _state: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2, Axis};

    fn sample_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [7.0, 0.27],
            [6.3, 0.30],
            [8.1, 0.28],
            [7.2, 0.23],
            [6.2, 0.32],
            [8.1, 0.22],
            [6.8, 0.26],
            [7.5, 0.35],
            [6.6, 0.16],
            [7.9, 0.18]
        ];
        let y = array![6.0, 6.0, 6.0, 6.0, 6.0, 6.0, 5.0, 7.0, 4.0, 8.0];
        (x, y)
    }

    #[test]
    fn test_default_config() {
        let config = ElasticNetConfig::default();
        assert_eq!(config.alpha, 1.0);
        assert_eq!(config.l1_ratio, 0.5);
        assert!(config.fit_intercept);
        assert_eq!(config.max_iter, 1000);
        assert_eq!(config.random_state, 42);
    }

    #[test]
    fn test_builder_setters() {
        let model = ElasticNet::new(0.3, 0.2)
            .fit_intercept(false)
            .max_iter(10)
            .tol(1e-3)
            .selection(Selection::Random)
            .random_state(7);
        let config = model.config();
        assert_eq!(config.alpha, 0.3);
        assert_eq!(config.l1_ratio, 0.2);
        assert!(!config.fit_intercept);
        assert_eq!(config.max_iter, 10);
        assert_eq!(config.tol, 1e-3);
        assert_eq!(config.selection, Selection::Random);
        assert_eq!(config.random_state, 7);
    }

    #[test]
    fn test_invalid_alpha() {
        let (x, y) = sample_data();
        let err = ElasticNet::new(-0.1, 0.5).fit(x.view(), y.view()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidAlpha(_)));

        let err = ElasticNet::new(f64::NAN, 0.5)
            .fit(x.view(), y.view())
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidAlpha(_)));
    }

    #[test]
    fn test_invalid_l1_ratio() {
        let (x, y) = sample_data();
        for ratio in [-0.01, 1.01, f64::NAN] {
            let err = ElasticNet::new(0.5, ratio).fit(x.view(), y.view()).unwrap_err();
            assert!(matches!(err, ModelError::InvalidL1Ratio(_)));
        }
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let (mut x, y) = sample_data();
        x[[3, 1]] = f64::NAN;
        let err = ElasticNet::new(0.5, 0.5).fit(x.view(), y.view()).unwrap_err();
        assert!(matches!(err, ModelError::NonFinite));
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = sample_data();
        let a = ElasticNet::new(0.5, 0.5).fit(x.view(), y.view()).unwrap();
        let b = ElasticNet::new(0.5, 0.5).fit(x.view(), y.view()).unwrap();
        assert_eq!(a.coef(), b.coef());
        assert_eq!(a.intercept(), b.intercept());
    }

    #[test]
    fn test_random_selection_fixed_seed_is_deterministic() {
        let (x, y) = sample_data();
        let fit = || {
            ElasticNet::new(0.1, 0.5)
                .selection(Selection::Random)
                .fit(x.view(), y.view())
                .unwrap()
        };
        assert_eq!(fit().coef(), fit().coef());
    }

    #[test]
    fn test_alpha_zero_is_ordinary_least_squares() {
        // y = 0.5 * x1 - 2 * x2 + 3, exactly linear
        let x = array![
            [1.0, 2.0],
            [2.0, 1.0],
            [3.0, 5.0],
            [4.0, 3.0],
            [5.0, 4.0],
            [6.0, 0.5]
        ];
        let y = x.map_axis(Axis(1), |r| 0.5 * r[0] - 2.0 * r[1] + 3.0);
        let fitted = ElasticNet::new(0.0, 0.5)
            .max_iter(10_000)
            .tol(1e-12)
            .fit(x.view(), y.view())
            .unwrap();

        assert_abs_diff_eq!(fitted.coef()[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(fitted.coef()[1], -2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fitted.intercept(), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_strong_alpha_predicts_mean() {
        let (x, y) = sample_data();
        let fitted = ElasticNet::new(100.0, 1.0).fit(x.view(), y.view()).unwrap();
        assert!(fitted.coef().iter().all(|&w| w == 0.0));
        let preds = fitted.predict_batch(x.view()).unwrap();
        let mean = y.mean().unwrap();
        assert!(preds.iter().all(|&p| (p - mean).abs() < 1e-12));
    }

    #[test]
    fn test_predict_single_matches_batch() {
        let (x, y) = sample_data();
        let fitted = ElasticNet::new(0.05, 0.5).fit(x.view(), y.view()).unwrap();
        let batch = fitted.predict_batch(x.view()).unwrap();
        for (i, row) in x.rows().into_iter().enumerate() {
            assert_abs_diff_eq!(fitted.predict(row).unwrap(), batch[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_predict_feature_mismatch() {
        let (x, y) = sample_data();
        let fitted = ElasticNet::new(0.5, 0.5).fit(x.view(), y.view()).unwrap();
        let wide = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            fitted.predict_batch(wide.view()),
            Err(ModelError::FeatureMismatch { expected: 2, got: 3 })
        ));
        assert!(matches!(
            fitted.predict(array![1.0].view()),
            Err(ModelError::FeatureMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_diagnostics_present_after_fit() {
        let (x, y) = sample_data();
        let fitted = ElasticNet::new(0.5, 0.5).fit(x.view(), y.view()).unwrap();
        let diagnostics = fitted.diagnostics().unwrap();
        assert!(diagnostics.n_iter >= 1);
        assert!(diagnostics.dual_gap.is_finite());
    }

    #[test]
    fn test_params_roundtrip_through_file() {
        let (x, y) = sample_data();
        let fitted = ElasticNet::new(0.05, 0.5).fit(x.view(), y.view()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        fitted.save_to_file(&path).unwrap();
        let restored = ElasticNet::<Fitted>::load_from_file(&path).unwrap();

        assert_eq!(restored.extract_params(), fitted.extract_params());
        assert!(restored.diagnostics().is_none());
        assert_eq!(
            restored.predict_batch(x.view()).unwrap(),
            fitted.predict_batch(x.view()).unwrap()
        );
    }

    #[test]
    fn test_from_params_rejects_empty_coefficients() {
        let err = ElasticNet::<Fitted>::from_params(ElasticNetParams {
            coef: vec![],
            intercept: 1.0,
        })
        .unwrap_err();
        assert!(matches!(err, ModelError::EmptyInput(_)));
    }
}
