//! Forecaster trait defining the common interface for the models.

use crate::core::{Forecast, MonthlySeries};
use crate::error::Result;

/// Common interface for forecasting models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to a monthly series.
    fn fit(&mut self, series: &MonthlySeries) -> Result<()>;

    /// Point predictions for the next `horizon` months.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// Predictions with two-sided intervals at confidence `level`.
    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let _ = level;
        self.predict(horizon)
    }

    /// One-step-ahead residuals of the fit.
    fn residuals(&self) -> Option<&[f64]>;

    /// Model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.residuals().is_some()
    }
}

/// Type alias for boxed forecaster trait objects.
pub type BoxedForecaster = Box<dyn Forecaster>;
