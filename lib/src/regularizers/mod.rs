//! Weight penalties for linear models.
//!
//! Every penalty is expressed as a blend of an L1 and an L2 term:
//!
//! ```text
//! penalty(w) = l1 * ||w||_1 + 0.5 * l2 * ||w||_2^2
//! ```
//!
//! which is the form used by the coordinate-descent solver in [`crate::solver`].
//! The solver never inspects the concrete penalty type; it only asks for the two
//! strengths and for the closed-form single-coordinate update.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// A separable penalty usable by coordinate descent.
pub trait Regularizer {
    /// Weight of the `||w||_1` term.
    fn l1_strength(&self) -> f64;

    /// Weight of the `0.5 * ||w||_2^2` term.
    fn l2_strength(&self) -> f64;

    /// Value of the penalty at `coef`.
    fn penalty(&self, coef: ArrayView1<f64>) -> f64 {
        let l1_norm: f64 = coef.iter().map(|w| w.abs()).sum();
        let l2_norm_sq = coef.dot(&coef);
        self.l1_strength() * l1_norm + 0.5 * self.l2_strength() * l2_norm_sq
    }

    /// Minimiser of the one-dimensional subproblem for a single coefficient.
    ///
    /// `rho` is the correlation of the feature column with the partial residual
    /// and `col_norm` the squared column norm, both divided by the sample count.
    fn coordinate_update(&self, rho: f64, col_norm: f64) -> f64 {
        let denom = col_norm + self.l2_strength();
        if denom == 0.0 {
            return 0.0;
        }
        soft_threshold(rho, self.l1_strength()) / denom
    }
}

/// Soft-thresholding operator `sign(x) * max(|x| - threshold, 0)`.
pub fn soft_threshold(x: f64, threshold: f64) -> f64 {
    if x > threshold {
        x - threshold
    } else if x < -threshold {
        x + threshold
    } else {
        0.0
    }
}

/// No penalty: coordinate descent reduces to ordinary least squares.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoRegularizer;

impl Regularizer for NoRegularizer {
    fn l1_strength(&self) -> f64 {
        0.0
    }

    fn l2_strength(&self) -> f64 {
        0.0
    }
}

/// Pure L1 (lasso) penalty `lambda * ||w||_1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct L1 {
    lambda: f64,
}

impl L1 {
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }
}

impl Regularizer for L1 {
    fn l1_strength(&self) -> f64 {
        self.lambda
    }

    fn l2_strength(&self) -> f64 {
        0.0
    }
}

/// Pure L2 (ridge) penalty `0.5 * lambda * ||w||_2^2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct L2 {
    lambda: f64,
}

impl L2 {
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }
}

impl Regularizer for L2 {
    fn l1_strength(&self) -> f64 {
        0.0
    }

    fn l2_strength(&self) -> f64 {
        self.lambda
    }
}

/// Elastic-net penalty parameterized the scikit-learn way:
///
/// ```text
/// alpha * l1_ratio * ||w||_1 + 0.5 * alpha * (1 - l1_ratio) * ||w||_2^2
/// ```
///
/// `alpha = 0` disables regularization and `l1_ratio = 1` leaves a pure L1 term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetPenalty {
    alpha: f64,
    l1_ratio: f64,
}

impl ElasticNetPenalty {
    pub fn new(alpha: f64, l1_ratio: f64) -> Self {
        Self { alpha, l1_ratio }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn l1_ratio(&self) -> f64 {
        self.l1_ratio
    }
}

impl Regularizer for ElasticNetPenalty {
    fn l1_strength(&self) -> f64 {
        self.alpha * self.l1_ratio
    }

    fn l2_strength(&self) -> f64 {
        self.alpha * (1.0 - self.l1_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
        assert_eq!(soft_threshold(-1.0, 1.0), 0.0);
        assert_eq!(soft_threshold(2.0, 0.0), 2.0);
    }

    #[test]
    fn test_no_regularizer_is_free() {
        let w = array![1.0, -2.0, 3.0];
        assert_eq!(NoRegularizer.penalty(w.view()), 0.0);
        // Plain least-squares coordinate step: rho / col_norm
        assert_relative_eq!(NoRegularizer.coordinate_update(2.0, 4.0), 0.5);
    }

    #[test]
    fn test_l1_penalty() {
        let w = array![1.0, -2.0, 3.0];
        assert_relative_eq!(L1::new(0.5).penalty(w.view()), 3.0);
    }

    #[test]
    fn test_l2_penalty() {
        let w = array![1.0, -2.0, 3.0];
        // 0.5 * 2.0 * (1 + 4 + 9)
        assert_relative_eq!(L2::new(2.0).penalty(w.view()), 14.0);
    }

    #[test]
    fn test_elastic_net_blend() {
        let w = array![1.0, -1.0];
        let penalty = ElasticNetPenalty::new(1.0, 0.5);
        // 0.5 * 2 + 0.5 * 0.5 * 2
        assert_relative_eq!(penalty.penalty(w.view()), 1.5);
        assert_relative_eq!(penalty.l1_strength(), 0.5);
        assert_relative_eq!(penalty.l2_strength(), 0.5);
    }

    #[test]
    fn test_elastic_net_alpha_zero_matches_no_regularizer() {
        let penalty = ElasticNetPenalty::new(0.0, 0.7);
        assert_eq!(penalty.l1_strength(), 0.0);
        assert_eq!(penalty.l2_strength(), 0.0);
        assert_relative_eq!(
            penalty.coordinate_update(1.3, 0.4),
            NoRegularizer.coordinate_update(1.3, 0.4)
        );
    }

    #[test]
    fn test_elastic_net_l1_ratio_one_is_pure_l1() {
        let penalty = ElasticNetPenalty::new(0.8, 1.0);
        let lasso = L1::new(0.8);
        assert_eq!(penalty.l2_strength(), 0.0);
        let w = array![0.3, -1.2, 2.0];
        assert_relative_eq!(penalty.penalty(w.view()), lasso.penalty(w.view()));
        assert_relative_eq!(
            penalty.coordinate_update(2.0, 1.5),
            lasso.coordinate_update(2.0, 1.5)
        );
    }

    #[test]
    fn test_coordinate_update_zeroes_small_correlations() {
        let penalty = ElasticNetPenalty::new(1.0, 1.0);
        assert_eq!(penalty.coordinate_update(0.9, 1.0), 0.0);
    }

    #[test]
    fn test_coordinate_update_degenerate_column() {
        assert_eq!(NoRegularizer.coordinate_update(1.0, 0.0), 0.0);
    }
}
