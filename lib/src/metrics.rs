//! Regression metrics over `f64` arrays.
//!
//! Every function checks that `y_true` and `y_pred` have the same non-zero
//! length and returns [`MetricsError`] otherwise.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Why a set of predictions could not be scored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricsError {
    /// `y_true` and `y_pred` differ in length.
    #[error("length mismatch: {y_true} true values, {y_pred} predictions")]
    LengthMismatch { y_true: usize, y_pred: usize },

    /// Both inputs are empty.
    #[error("cannot score an empty prediction set")]
    Empty,
}

pub type Result<T> = std::result::Result<T, MetricsError>;

/// Metrics for evaluating regression models.
pub struct Metrics;

impl Metrics {
    /// Calculate Mean Squared Error (MSE).
    ///
    /// MSE = mean((y_true - y_pred)^2)
    ///
    /// # Arguments
    ///
    /// * `y_true` - Ground truth values
    /// * `y_pred` - Predicted values, same length as `y_true`
    ///
    /// # Returns
    ///
    /// The MSE value (lower is better)
    pub fn mse(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<f64> {
        let n = check_lengths(y_true, y_pred)?;
        let sum_sq: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).powi(2))
            .sum();
        Ok(sum_sq / n as f64)
    }

    /// Calculate Root Mean Squared Error (RMSE).
    ///
    /// RMSE = sqrt(MSE)
    ///
    /// # Arguments
    ///
    /// * `y_true` - Ground truth values
    /// * `y_pred` - Predicted values, same length as `y_true`
    ///
    /// # Returns
    ///
    /// The RMSE value (lower is better, in the same units as the target)
    pub fn rmse(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<f64> {
        Ok(Self::mse(y_true, y_pred)?.sqrt())
    }

    /// Calculate Mean Absolute Error (MAE).
    ///
    /// MAE = mean(|y_true - y_pred|)
    ///
    /// # Arguments
    ///
    /// * `y_true` - Ground truth values
    /// * `y_pred` - Predicted values, same length as `y_true`
    ///
    /// # Returns
    ///
    /// The MAE value (lower is better)
    pub fn mae(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<f64> {
        let n = check_lengths(y_true, y_pred)?;
        let sum_abs: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).abs())
            .sum();
        Ok(sum_abs / n as f64)
    }

    /// Calculate R² (coefficient of determination).
    ///
    /// R² = 1 - (SS_res / SS_tot)
    ///
    /// where:
    /// - SS_res = sum((y_true - y_pred)^2)  (residual sum of squares)
    /// - SS_tot = sum((y_true - mean(y_true))^2)  (total sum of squares)
    ///
    /// At most 1, and negative when the model does worse than predicting the
    /// mean. A constant `y_true` (`SS_tot = 0`) scores 1.0 on an exact fit and
    /// 0.0 otherwise.
    ///
    /// # Arguments
    ///
    /// * `y_true` - Ground truth values
    /// * `y_pred` - Predicted values, same length as `y_true`
    ///
    /// # Returns
    ///
    /// The R² value (higher is better)
    pub fn r_squared(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<f64> {
        let n = check_lengths(y_true, y_pred)?;
        let mean_true = y_true.sum() / n as f64;

        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).powi(2))
            .sum();
        let ss_tot: f64 = y_true.iter().map(|&t| (t - mean_true).powi(2)).sum();

        if ss_tot == 0.0 {
            return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
        }
        Ok(1.0 - ss_res / ss_tot)
    }

    /// Calculate all metrics at once.
    ///
    /// # Arguments
    ///
    /// * `y_true` - Ground truth values
    /// * `y_pred` - Predicted values, same length as `y_true`
    ///
    /// # Returns
    ///
    /// A [`RegressionMetrics`] with MSE, RMSE, MAE and R²
    ///
    /// # Examples
    ///
    /// ```
    /// use elastictrack::metrics::{Metrics, MetricsError};
    /// use ndarray::array;
    ///
    /// let y_true = array![3.0, 5.0, 7.0];
    /// let y_pred = array![4.0, 5.0, 6.0];
    /// let m = Metrics::calculate_all(y_true.view(), y_pred.view()).unwrap();
    /// assert!((m.mae - 2.0 / 3.0).abs() < 1e-12);
    /// assert!((m.rmse * m.rmse - m.mse).abs() < 1e-12);
    /// assert!((m.r2 - 0.75).abs() < 1e-12);
    ///
    /// let short = array![4.0];
    /// assert_eq!(
    ///     Metrics::calculate_all(y_true.view(), short.view()),
    ///     Err(MetricsError::LengthMismatch { y_true: 3, y_pred: 1 })
    /// );
    /// ```
    pub fn calculate_all(
        y_true: ArrayView1<f64>,
        y_pred: ArrayView1<f64>,
    ) -> Result<RegressionMetrics> {
        let mse = Self::mse(y_true, y_pred)?;
        Ok(RegressionMetrics {
            mse,
            rmse: mse.sqrt(),
            mae: Self::mae(y_true, y_pred)?,
            r2: Self::r_squared(y_true, y_pred)?,
        })
    }
}

/// Struct to hold all regression metrics for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// R² score
    pub r2: f64,
}

fn check_lengths(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<usize> {
    if y_true.len() != y_pred.len() {
        return Err(MetricsError::LengthMismatch {
            y_true: y_true.len(),
            y_pred: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(MetricsError::Empty);
    }
    Ok(y_true.len())
}
