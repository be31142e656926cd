//! Seasonal ARIMA: order, estimation, forecasting and automatic order search.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`order`] | `(p,d,q)(P,D,Q)[s]` specification |
//! | [`polynomial`] | Lag polynomials and parameter constraints |
//! | [`state_space`] | Kalman filter likelihood |
//! | [`model`] | Estimator and fitted model |
//! | [`auto`] | Stepwise and exhaustive order selection |
//! | [`forecaster`] | `Forecaster` implementation |

pub mod auto;
pub mod forecaster;
pub mod model;
pub mod order;
pub mod polynomial;
pub mod state_space;

pub use auto::{AutoSarima, AutoSarimaConfig, AutoSarimaResult, CandidateScore, Criterion, Differencing};
pub use forecaster::SarimaForecaster;
pub use model::{CoefficientSummary, FittedSarima, Sarima, SarimaConfig};
pub use order::SarimaOrder;
