//! Forecasting models.

pub mod sarima;
pub mod traits;

pub use sarima::{AutoSarima, FittedSarima, Sarima, SarimaConfig, SarimaForecaster, SarimaOrder};
pub use traits::{BoxedForecaster, Forecaster};
