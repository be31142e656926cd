//! Descriptive correlation diagnostics for choosing model orders.

pub mod autocorrelation;
pub mod correlogram;

pub use autocorrelation::{acf, autocorrelation, durbin_levinson, pacf};
pub use correlogram::{Correlogram, DEFAULT_LAGS};
