/// A marker type indicating that a model is **not yet trained**.
///
/// Used as the state parameter of [`ElasticNet`](super::ElasticNet):
/// - `fit` is only available on `ElasticNet<Unfitted>`.
/// - Prediction and serialization are **not available** until fitting produces
///   an `ElasticNet<Fitted>`.
#[derive(Debug, Clone, Copy)]
pub struct Unfitted;

/// A marker type indicating that a model has been **fully trained**.
///
/// A `Fitted` model implements [`InferenceModel`](super::InferenceModel) and
/// carries only the coefficients and intercept it needs for prediction, plus
/// the solver diagnostics of the fit that produced it.
#[derive(Debug, Clone, Copy)]
pub struct Fitted;
