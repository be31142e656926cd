//! [`Forecaster`] adapter over the fixed-order and searched estimators.

use crate::core::{Forecast, MonthlySeries};
use crate::error::{ForecastError, Result};
use crate::models::sarima::auto::{AutoSarima, AutoSarimaConfig, CandidateScore};
use crate::models::sarima::model::{FittedSarima, Sarima, SarimaConfig};
use crate::models::traits::Forecaster;

/// Level of the intervals returned by [`Forecaster::predict`].
const DEFAULT_LEVEL: f64 = 0.95;

#[derive(Debug, Clone)]
enum Estimator {
    Fixed(Sarima),
    Search(AutoSarima),
}

/// Stateful SARIMA forecaster: fit once, then predict.
///
/// # Example
/// ```
/// use autoprod_forecast::core::{Month, MonthlySeries};
/// use autoprod_forecast::models::sarima::{SarimaConfig, SarimaForecaster, SarimaOrder};
/// use autoprod_forecast::models::Forecaster;
///
/// let values: Vec<f64> = (0..60).map(|i| 10.0 + (i as f64 * 0.7).sin() + 0.05 * i as f64).collect();
/// let series = MonthlySeries::new(Month::new(2018, 1).unwrap(), values);
///
/// let mut model = SarimaForecaster::fixed(
///     SarimaConfig::default()
///         .with_order(SarimaOrder::arima(1, 1, 0))
///         .with_allow_nonconverged(true),
/// );
/// assert!(!model.is_fitted());
/// model.fit(&series).unwrap();
/// let forecast = model.predict(6).unwrap();
/// assert_eq!(forecast.points()[0].month, Month::new(2023, 1).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct SarimaForecaster {
    estimator: Estimator,
    fitted: Option<FittedSarima>,
    candidates: Vec<CandidateScore>,
}

impl SarimaForecaster {
    /// Forecaster for a fixed order.
    pub fn fixed(config: SarimaConfig) -> Self {
        Self {
            estimator: Estimator::Fixed(Sarima::with_config(config)),
            fitted: None,
            candidates: Vec::new(),
        }
    }

    /// Forecaster that picks its order with [`AutoSarima`].
    pub fn automatic(config: AutoSarimaConfig) -> Self {
        Self {
            estimator: Estimator::Search(AutoSarima::with_config(config)),
            fitted: None,
            candidates: Vec::new(),
        }
    }

    /// The fitted model, if any.
    pub fn fitted(&self) -> Option<&FittedSarima> {
        self.fitted.as_ref()
    }

    /// Candidates scored by the last automatic fit; empty for fixed orders.
    pub fn candidates(&self) -> &[CandidateScore] {
        &self.candidates
    }

    fn require_fitted(&self) -> Result<&FittedSarima> {
        self.fitted.as_ref().ok_or(ForecastError::FitRequired)
    }
}

impl Forecaster for SarimaForecaster {
    fn fit(&mut self, series: &MonthlySeries) -> Result<()> {
        let (fitted, candidates) = match &self.estimator {
            Estimator::Fixed(model) => (model.fit(series)?, Vec::new()),
            Estimator::Search(search) => {
                let result = search.fit(series)?;
                (result.best, result.candidates)
            }
        };
        self.fitted = Some(fitted);
        self.candidates = candidates;
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.predict_with_intervals(horizon, DEFAULT_LEVEL)
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        self.require_fitted()?.forecast(horizon, level)
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|fit| fit.residuals())
    }

    fn name(&self) -> &str {
        match self.estimator {
            Estimator::Fixed(_) => "SARIMA",
            Estimator::Search(_) => "AutoSARIMA",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Month;
    use crate::models::sarima::order::SarimaOrder;
    use crate::models::traits::BoxedForecaster;

    fn trending(n: usize) -> MonthlySeries {
        let values = (0..n)
            .map(|i| 20.0 + 0.1 * i as f64 + ((i * 7919) % 11) as f64 * 0.2)
            .collect();
        MonthlySeries::new(Month::new(2010, 1).unwrap(), values)
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = SarimaForecaster::fixed(SarimaConfig::default());
        assert!(!model.is_fitted());
        assert_eq!(model.predict(3), Err(ForecastError::FitRequired));
    }

    #[test]
    fn boxed_fixed_and_automatic_models() {
        let series = trending(72);
        let models: Vec<BoxedForecaster> = vec![
            Box::new(SarimaForecaster::fixed(
                SarimaConfig::default()
                    .with_order(SarimaOrder::arima(0, 1, 1))
                    .with_allow_nonconverged(true),
            )),
            Box::new(SarimaForecaster::automatic(
                AutoSarimaConfig::default()
                    .with_seasonal_period(0)
                    .with_differencing(1, 0)
                    .with_max_orders(1, 1)
                    .with_estimation(SarimaConfig::default().with_allow_nonconverged(true)),
            )),
        ];

        for mut model in models {
            model.fit(&series).unwrap();
            assert!(model.is_fitted());
            assert_eq!(model.residuals().unwrap().len(), 71);
            let forecast = model.predict_with_intervals(4, 0.8).unwrap();
            assert_eq!(forecast.horizon(), 4);
            assert_eq!(forecast.level(), 0.8);
            assert_eq!(forecast.points()[0].month, Month::new(2016, 1).unwrap());
        }
    }

    #[test]
    fn automatic_fit_keeps_candidates() {
        let mut model = SarimaForecaster::automatic(
            AutoSarimaConfig::default()
                .with_seasonal_period(0)
                .with_differencing(1, 0)
                .with_max_orders(1, 1)
                .with_estimation(SarimaConfig::default().with_allow_nonconverged(true)),
        );
        model.fit(&trending(60)).unwrap();
        assert_eq!(model.name(), "AutoSARIMA");
        assert!(!model.candidates().is_empty());
        assert_eq!(model.fitted().map(|f| f.order().d), Some(1));
    }
}
