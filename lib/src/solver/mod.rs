//! Coordinate-descent solver for penalized least squares.
//!
//! Minimises
//!
//! ```text
//! (1 / (2 * n_samples)) * ||y - X w - b||^2 + penalty(w)
//! ```
//!
//! for any [`Regularizer`]. The intercept `b` is handled by centering `X` and `y`
//! before the sweeps. Convergence follows the scikit-learn scheme: a sweep whose
//! largest coefficient change is small relative to the largest coefficient
//! triggers a duality-gap check, and the solver stops once the gap falls below
//! `tol * ||y_centered||^2`.
//!
//! Once built via [`CoordinateDescentBuilder`], a solver is immutable and can be
//! reused across datasets.

use crate::model::{ModelError, Result};
use crate::regularizers::Regularizer;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Order in which coefficients are visited during a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// Visit features `0..n_features` in order.
    #[default]
    Cyclic,
    /// Draw a feature uniformly at random for every update, seeded by `random_state`.
    Random,
}

/// Output of a coordinate-descent run.
#[derive(Debug, Clone)]
pub struct Solution {
    pub coef: Array1<f64>,
    pub intercept: f64,
    /// Number of full sweeps performed.
    pub n_iter: usize,
    /// Duality gap at the last check, divided by the sample count.
    pub dual_gap: f64,
    pub converged: bool,
}

/// Coordinate-descent solver.
///
/// Defaults (via [`CoordinateDescentBuilder`]):
/// - `max_iter`: 1000
/// - `tol`: 1e-4
/// - `selection`: [`Selection::Cyclic`]
/// - `random_state`: 42
/// - `fit_intercept`: true
#[derive(Debug, Clone)]
pub struct CoordinateDescent<R: Regularizer> {
    pub(crate) max_iter: usize,
    pub(crate) tol: f64,
    pub(crate) selection: Selection,
    pub(crate) random_state: u64,
    pub(crate) fit_intercept: bool,
    pub(crate) regularizer: R,
}

/// Fluent builder for [`CoordinateDescent`].
#[derive(Debug, Clone)]
pub struct CoordinateDescentBuilder<R: Regularizer> {
    max_iter: usize,
    tol: f64,
    selection: Selection,
    random_state: u64,
    fit_intercept: bool,
    regularizer: R,
}

impl<R: Regularizer> CoordinateDescentBuilder<R> {
    pub fn new(regularizer: R) -> Self {
        Self {
            max_iter: 1000,
            tol: 1e-4,
            selection: Selection::Cyclic,
            random_state: 42,
            fit_intercept: true,
            regularizer,
        }
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Seed for [`Selection::Random`]. Cyclic sweeps are deterministic regardless.
    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn build(self) -> CoordinateDescent<R> {
        CoordinateDescent {
            max_iter: self.max_iter,
            tol: self.tol,
            selection: self.selection,
            random_state: self.random_state,
            fit_intercept: self.fit_intercept,
            regularizer: self.regularizer,
        }
    }
}

impl<R: Regularizer> CoordinateDescent<R> {
    /// Convenience constructor that starts the builder pattern.
    pub fn builder(regularizer: R) -> CoordinateDescentBuilder<R> {
        CoordinateDescentBuilder::new(regularizer)
    }

    pub fn regularizer(&self) -> &R {
        &self.regularizer
    }

    /// Fits coefficients and intercept to `(x, y)`.
    ///
    /// # Errors
    /// - `x` and `y` disagree on the number of samples
    /// - there are no samples or no features
    /// - `max_iter` is zero or `tol` is negative / non-finite
    ///
    /// Running out of iterations is not an error: the returned solution has
    /// `converged == false` and a warning is logged.
    pub fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<Solution> {
        let (n_samples, n_features) = x.dim();
        if n_samples != y.len() {
            return Err(ModelError::ShapeMismatch {
                x_rows: n_samples,
                y_len: y.len(),
            });
        }
        if n_samples == 0 {
            return Err(ModelError::EmptyInput("no samples"));
        }
        if n_features == 0 {
            return Err(ModelError::EmptyInput("no features"));
        }
        if self.max_iter == 0 {
            return Err(ModelError::InvalidParameter(
                "max_iter must be at least 1".into(),
            ));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(ModelError::InvalidParameter(format!(
                "tol must be finite and non-negative, got {}",
                self.tol
            )));
        }

        let (x_offset, y_offset) = if self.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .ok_or(ModelError::EmptyInput("no samples"))?;
            let y_mean = y.mean().ok_or(ModelError::EmptyInput("no samples"))?;
            (x_mean, y_mean)
        } else {
            (Array1::zeros(n_features), 0.0)
        };
        let xc = &x - &x_offset;
        let yc = &y - y_offset;

        let n = n_samples as f64;
        let col_norms: Array1<f64> = xc.map_axis(Axis(0), |col| col.dot(&col));
        let mut coef = Array1::<f64>::zeros(n_features);
        let mut residual = yc.clone();
        let gap_tol = self.tol * yc.dot(&yc);
        let mut rng = StdRng::seed_from_u64(self.random_state);

        let mut dual_gap = f64::INFINITY;
        let mut converged = false;
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;
            let mut w_max = 0.0_f64;
            let mut d_w_max = 0.0_f64;

            for f_iter in 0..n_features {
                let j = match self.selection {
                    Selection::Cyclic => f_iter,
                    Selection::Random => rng.random_range(0..n_features),
                };
                if col_norms[j] == 0.0 {
                    continue;
                }

                let column = xc.column(j);
                let w_old = coef[j];
                if w_old != 0.0 {
                    residual.scaled_add(w_old, &column);
                }

                let rho = column.dot(&residual);
                let w_new = self.regularizer.coordinate_update(rho / n, col_norms[j] / n);
                coef[j] = w_new;

                if w_new != 0.0 {
                    residual.scaled_add(-w_new, &column);
                }

                d_w_max = d_w_max.max((w_new - w_old).abs());
                w_max = w_max.max(w_new.abs());
            }

            log::debug!(
                "sweep {}: max |dw| = {:.3e}, max |w| = {:.3e}",
                n_iter,
                d_w_max,
                w_max
            );

            if w_max == 0.0 || d_w_max / w_max < self.tol || iter + 1 == self.max_iter {
                dual_gap = self.duality_gap(xc.view(), yc.view(), residual.view(), coef.view());
                if dual_gap < gap_tol {
                    converged = true;
                    break;
                }
            }
        }

        if !converged {
            log::warn!(
                "coordinate descent did not converge after {} iterations \
                 (duality gap {:.3e}, tolerance {:.3e}); consider increasing max_iter",
                n_iter,
                dual_gap,
                gap_tol
            );
        }

        let intercept = if self.fit_intercept {
            y_offset - x_offset.dot(&coef)
        } else {
            0.0
        };

        Ok(Solution {
            coef,
            intercept,
            n_iter,
            dual_gap: dual_gap / n,
            converged,
        })
    }

    /// Duality gap of the (sample-count scaled) primal problem at `coef`.
    fn duality_gap(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        residual: ArrayView1<f64>,
        coef: ArrayView1<f64>,
    ) -> f64 {
        let n = x.nrows() as f64;
        let l1 = self.regularizer.l1_strength() * n;
        let l2 = self.regularizer.l2_strength() * n;

        let xt_r = x.t().dot(&residual) - &(&coef * l2);
        let dual_norm = xt_r.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let r_norm_sq = residual.dot(&residual);
        let w_norm_sq = coef.dot(&coef);

        let (scale, mut gap) = if dual_norm > l1 {
            let scale = l1 / dual_norm;
            (scale, 0.5 * (r_norm_sq + r_norm_sq * scale * scale))
        } else {
            (1.0, r_norm_sq)
        };

        let l1_norm: f64 = coef.iter().map(|w| w.abs()).sum();
        gap += l1 * l1_norm - scale * residual.dot(&y) + 0.5 * l2 * (1.0 + scale * scale) * w_norm_sq;
        gap
    }
}
