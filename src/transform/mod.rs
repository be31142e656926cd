//! Variance stabilisation and differencing.
//!
//! Every transform is pure and returns a new [`MonthlySeries`](crate::core::MonthlySeries)
//! whose [`Scale`](crate::core::Scale) records what was applied.
//!
//! # Example
//!
//! ```
//! use autoprod_forecast::core::{Month, MonthlySeries};
//!
//! let start = Month::new(2020, 1).unwrap();
//! let series = MonthlySeries::new(start, (1..=36).map(|i| 100.0 + i as f64).collect());
//!
//! // log first, then simple and seasonal differencing
//! let stationary = series.log().unwrap().difference(1).unwrap().difference(12).unwrap();
//! assert_eq!(stationary.len(), 36 - 13);
//! assert_eq!(stationary.scale().to_string(), "diff12(diff1(log))");
//! ```

pub mod diff;
pub mod log;

pub use diff::{
    difference, difference_lag, differencing_polynomial, integrate, seasonal_difference,
};
pub use log::{exp_values, log_values};
