//! Logarithmic variance stabilisation.

use crate::core::{MonthlySeries, Scale};
use crate::error::{ForecastError, Result};

/// Natural log of every value; fails on the first value `<= 0`.
pub fn log_values(series: &[f64]) -> Result<Vec<f64>> {
    series
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            // NaN fails the comparison too
            if value > 0.0 {
                Ok(value.ln())
            } else {
                Err(ForecastError::NonPositiveValue { index, value })
            }
        })
        .collect()
}

/// Exponentiate every value.
pub fn exp_values(series: &[f64]) -> Vec<f64> {
    series.iter().map(|v| v.exp()).collect()
}

impl MonthlySeries {
    /// Log-transform a raw, undifferenced series.
    pub fn log(&self) -> Result<MonthlySeries> {
        if !self.scale().is_raw() {
            return Err(ForecastError::InvalidTransform(format!(
                "log must be applied to a raw series, found scale {}",
                self.scale()
            )));
        }
        let values = log_values(self.values())?;
        Ok(self.derive(self.start(), values, Scale::log()))
    }

    /// Undo [`MonthlySeries::log`].
    pub fn exp(&self) -> Result<MonthlySeries> {
        if self.scale() != &Scale::log() {
            return Err(ForecastError::InvalidTransform(format!(
                "exp inverts an undifferenced log series, found scale {}",
                self.scale()
            )));
        }
        Ok(self.derive(self.start(), exp_values(self.values()), Scale::raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Month;
    use approx::assert_relative_eq;

    fn series(values: Vec<f64>) -> MonthlySeries {
        MonthlySeries::new(Month::new(1993, 1).unwrap(), values)
    }

    #[test]
    fn log_then_exp_round_trips() {
        let s = series(vec![1.0, 250.5, 1e6, 0.003]);
        let back = s.log().unwrap().exp().unwrap();
        assert!(back.scale().is_raw());
        for (a, b) in back.values().iter().zip(s.values()) {
            assert_relative_eq!(a, b, max_relative = 1e-12);
        }
    }

    #[test]
    fn log_rejects_non_positive() {
        let s = series(vec![3.0, 0.0, -1.0]);
        assert_eq!(
            s.log(),
            Err(ForecastError::NonPositiveValue {
                index: 1,
                value: 0.0
            })
        );
        assert!(log_values(&[f64::NAN]).is_err());
    }

    #[test]
    fn log_must_precede_differencing() {
        let s = series((1..=30).map(|i| i as f64).collect());
        let diffed = s.difference(1).unwrap();
        assert!(matches!(
            diffed.log(),
            Err(ForecastError::InvalidTransform(_))
        ));
        assert!(s.log().unwrap().log().is_err());
        assert!(s.exp().is_err());
    }
}
