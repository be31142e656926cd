//! # autoprod-forecast
//!
//! Seasonal ARIMA analysis of monthly production series.
//!
//! The crate loads a monthly CSV vintage, log-transforms and differences
//! it, inspects ACF/PACF and stationarity diagnostics, fits a
//! `SARIMA(p,d,q)(P,D,Q)[s]` model by exact maximum likelihood, forecasts
//! with confidence intervals, compares the forecast with a later vintage,
//! and reruns the fit with smoothed outlier months.
//!
//! # Example
//!
//! ```
//! use autoprod_forecast::prelude::*;
//!
//! let start = Month::new(2010, 1).unwrap();
//! let values: Vec<f64> = (0..120)
//!     .map(|i| {
//!         let season = (i as f64 * std::f64::consts::PI / 6.0).sin();
//!         (4.5 + 0.002 * i as f64 + 0.1 * season + 0.01 * ((i * 37 % 11) as f64 - 5.0)).exp()
//!     })
//!     .collect();
//! let series = MonthlySeries::new(start, values);
//!
//! let config = SarimaConfig::default()
//!     .with_order(SarimaOrder::new(0, 1, 1, 0, 1, 1, 12))
//!     .with_allow_nonconverged(true);
//! let fit = Sarima::with_config(config).fit(&series.log().unwrap()).unwrap();
//! let forecast = fit.forecast(12, 0.95).unwrap().to_raw_scale().unwrap();
//! assert_eq!(forecast.points()[0].month, Month::new(2020, 1).unwrap());
//! ```

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod compare;
pub mod config;
pub mod core;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod smoothing;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::compare::{compare, Comparison, PercentError};
    pub use crate::config::PipelineConfig;
    pub use crate::core::{Forecast, ForecastPoint, Month, MonthlySeries, Scale};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::sarima::{
        AutoSarima, FittedSarima, Sarima, SarimaConfig, SarimaForecaster, SarimaOrder,
    };
    pub use crate::models::{BoxedForecaster, Forecaster};
    pub use crate::pipeline::{AnalysisReport, Pipeline};
}
