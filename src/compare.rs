//! Forecast versus actual comparison.
//!
//! Forecasts and actuals are matched month by month over the explicit
//! intersection of their date ranges. A zero actual has no percent error;
//! that month is reported as [`PercentError::Undefined`] and the remaining
//! months are still compared.

use std::fmt;

use tracing::warn;

use crate::core::{Forecast, Month, MonthlySeries};
use crate::error::{ForecastError, Result};

/// Percent error of one forecast month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentError {
    Defined(f64),
    /// The actual was zero or missing.
    Undefined,
}

impl PercentError {
    pub fn value(&self) -> Option<f64> {
        match self {
            PercentError::Defined(v) => Some(*v),
            PercentError::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, PercentError::Defined(_))
    }
}

impl fmt::Display for PercentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentError::Defined(v) => write!(f, "{:.2}%", v),
            PercentError::Undefined => write!(f, "undefined"),
        }
    }
}

/// `(forecast - actual) / actual * 100`, undefined for a zero or non-finite actual.
pub fn percent_error(forecast: f64, actual: f64) -> PercentError {
    if actual == 0.0 || !actual.is_finite() {
        PercentError::Undefined
    } else {
        PercentError::Defined((forecast - actual) * 100.0 / actual)
    }
}

/// One month of the comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonRow {
    pub month: Month,
    pub forecast: f64,
    pub lower: f64,
    pub upper: f64,
    pub actual: f64,
    pub percent_error: PercentError,
}

impl ComparisonRow {
    /// Whether the actual lies inside the forecast interval.
    pub fn covered(&self) -> bool {
        self.actual >= self.lower && self.actual <= self.upper
    }
}

/// Accuracy over the months with a defined percent error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracySummary {
    /// Number of months summarised.
    pub count: usize,
    /// Mean absolute percentage error.
    pub mape: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean signed percent error (positive: forecasts too high).
    pub bias: f64,
    /// Share of actuals inside the interval.
    pub coverage: f64,
}

/// Month-by-month comparison of a raw-scale forecast with actuals.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    rows: Vec<ComparisonRow>,
    level: f64,
}

impl Comparison {
    pub fn rows(&self) -> &[ComparisonRow] {
        &self.rows
    }

    /// Confidence level of the compared intervals.
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Number of months with a defined percent error.
    pub fn defined_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.percent_error.is_defined())
            .count()
    }

    /// Months whose percent error is undefined.
    pub fn undefined_months(&self) -> Vec<Month> {
        self.rows
            .iter()
            .filter(|r| !r.percent_error.is_defined())
            .map(|r| r.month)
            .collect()
    }

    /// Percent errors in month order.
    pub fn percent_errors(&self) -> Vec<PercentError> {
        self.rows.iter().map(|r| r.percent_error).collect()
    }

    /// Summary over defined months; `None` if there are none.
    pub fn summary(&self) -> Option<AccuracySummary> {
        let defined: Vec<(&ComparisonRow, f64)> = self
            .rows
            .iter()
            .filter_map(|r| r.percent_error.value().map(|pe| (r, pe)))
            .collect();
        if defined.is_empty() {
            return None;
        }

        let n = defined.len() as f64;
        let mape = defined.iter().map(|(_, pe)| pe.abs()).sum::<f64>() / n;
        let bias = defined.iter().map(|(_, pe)| pe).sum::<f64>() / n;
        let mae = defined
            .iter()
            .map(|(r, _)| (r.forecast - r.actual).abs())
            .sum::<f64>()
            / n;
        let mse = defined
            .iter()
            .map(|(r, _)| (r.forecast - r.actual).powi(2))
            .sum::<f64>()
            / n;
        let covered = defined.iter().filter(|(r, _)| r.covered()).count();

        Some(AccuracySummary {
            count: defined.len(),
            mape,
            mae,
            rmse: mse.sqrt(),
            bias,
            coverage: covered as f64 / n,
        })
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<8} {:>12} {:>12} {:>12} {:>12} {:>10}",
            "month", "forecast", "lower", "upper", "actual", "pct err"
        )?;
        for r in &self.rows {
            writeln!(
                f,
                "{:<8} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>10}",
                r.month.to_string(),
                r.forecast,
                r.lower,
                r.upper,
                r.actual,
                r.percent_error.to_string()
            )?;
        }
        match self.summary() {
            Some(s) => write!(
                f,
                "MAPE {:.2}%  bias {:+.2}%  MAE {:.4}  RMSE {:.4}  {:.0}% interval coverage {}/{}",
                s.mape,
                s.bias,
                s.mae,
                s.rmse,
                self.level * 100.0,
                (s.coverage * s.count as f64).round() as usize,
                s.count
            ),
            None => write!(f, "no defined percent errors"),
        }
    }
}

/// Compare a raw-scale forecast with actuals over their common months.
///
/// # Errors
/// `InvalidTransform` if either side is not on the raw scale, `NoOverlap`
/// if they share no month.
///
/// # Example
///
/// ```
/// use autoprod_forecast::compare::{compare, PercentError};
/// use autoprod_forecast::core::{Forecast, Month, MonthlySeries, Scale};
///
/// let start = Month::new(2022, 10).unwrap();
/// let forecast = Forecast::from_parts(
///     start, vec![105.0, 110.0], vec![95.0, 98.0], vec![115.0, 122.0], 0.95, Scale::raw(),
/// ).unwrap();
/// let actual = MonthlySeries::new(start, vec![100.0, 100.0]);
///
/// let comparison = compare(&forecast, &actual).unwrap();
/// assert_eq!(
///     comparison.percent_errors(),
///     vec![PercentError::Defined(5.0), PercentError::Defined(10.0)]
/// );
/// ```
pub fn compare(forecast: &Forecast, actual: &MonthlySeries) -> Result<Comparison> {
    if !forecast.scale().is_raw() {
        return Err(ForecastError::InvalidTransform(format!(
            "forecast on scale {} must be back-transformed before comparison",
            forecast.scale()
        )));
    }
    if !actual.scale().is_raw() {
        return Err(ForecastError::InvalidTransform(format!(
            "actual series on scale {} is not in raw units",
            actual.scale()
        )));
    }

    let rows: Vec<ComparisonRow> = forecast
        .points()
        .iter()
        .filter_map(|p| {
            actual.get(p.month).map(|a| ComparisonRow {
                month: p.month,
                forecast: p.mean,
                lower: p.lower,
                upper: p.upper,
                actual: a,
                percent_error: percent_error(p.mean, a),
            })
        })
        .collect();

    if rows.is_empty() {
        return Err(ForecastError::NoOverlap);
    }

    for row in rows.iter().filter(|r| !r.percent_error.is_defined()) {
        warn!(month = %row.month, actual = row.actual, "percent error undefined, skipping month");
    }

    Ok(Comparison {
        rows,
        level: forecast.level(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Scale;
    use approx::assert_relative_eq;

    fn month(y: i32, m: u32) -> Month {
        Month::new(y, m).unwrap()
    }

    fn forecast(start: Month, mean: Vec<f64>) -> Forecast {
        let lower = mean.iter().map(|m| m - 10.0).collect();
        let upper = mean.iter().map(|m| m + 10.0).collect();
        Forecast::from_parts(start, mean, lower, upper, 0.95, Scale::raw()).unwrap()
    }

    #[test]
    fn percent_error_formula() {
        assert_eq!(percent_error(105.0, 100.0), PercentError::Defined(5.0));
        assert_eq!(percent_error(90.0, 100.0), PercentError::Defined(-10.0));
        assert_eq!(percent_error(5.0, 0.0), PercentError::Undefined);
        assert_eq!(percent_error(5.0, f64::NAN), PercentError::Undefined);
    }

    #[test]
    fn partial_overlap_uses_intersection() {
        // forecast Oct 2022 .. Sep 2023, actuals Jan 1993 .. May 2023
        let f = forecast(month(2022, 10), vec![100.0; 12]);
        let actual = MonthlySeries::new(month(1993, 1), vec![100.0; 365]);
        assert_eq!(actual.end(), Some(month(2023, 5)));

        let c = compare(&f, &actual).unwrap();
        assert_eq!(c.rows().len(), 8);
        assert_eq!(c.rows()[0].month, month(2022, 10));
        assert_eq!(c.rows()[7].month, month(2023, 5));
        assert_eq!(c.defined_count(), 8);
    }

    #[test]
    fn zero_actual_is_skipped() {
        let f = forecast(month(2022, 10), vec![100.0; 12]);
        let mut values = vec![110.0; 8];
        values[3] = 0.0;
        let actual = MonthlySeries::new(month(2022, 10), values);

        let c = compare(&f, &actual).unwrap();
        assert_eq!(c.rows().len(), 8);
        assert_eq!(c.defined_count(), 7);
        assert_eq!(c.undefined_months(), vec![month(2023, 1)]);

        let s = c.summary().unwrap();
        assert_eq!(s.count, 7);
        assert_relative_eq!(s.mape, 100.0 / 11.0, epsilon = 1e-10);
        assert_relative_eq!(s.bias, -100.0 / 11.0, epsilon = 1e-10);
        assert_relative_eq!(s.mae, 10.0);
        assert_relative_eq!(s.rmse, 10.0);
        assert_relative_eq!(s.coverage, 1.0);
    }

    #[test]
    fn no_overlap_and_scale_errors() {
        let f = forecast(month(2022, 10), vec![100.0; 3]);
        let earlier = MonthlySeries::new(month(2020, 1), vec![1.0; 12]);
        assert_eq!(compare(&f, &earlier), Err(ForecastError::NoOverlap));

        let log_forecast = Forecast::from_parts(
            month(2022, 10),
            vec![4.6],
            vec![4.5],
            vec![4.7],
            0.95,
            Scale::log(),
        )
        .unwrap();
        let actual = MonthlySeries::new(month(2022, 10), vec![100.0]);
        assert!(matches!(
            compare(&log_forecast, &actual),
            Err(ForecastError::InvalidTransform(_))
        ));
        let raw = log_forecast.to_raw_scale().unwrap();
        assert!(compare(&raw, &actual).is_ok());
    }

    #[test]
    fn summary_none_when_all_undefined() {
        let f = forecast(month(2022, 10), vec![1.0]);
        let actual = MonthlySeries::new(month(2022, 10), vec![0.0]);
        let c = compare(&f, &actual).unwrap();
        assert!(c.summary().is_none());
        assert!(c.to_string().contains("no defined percent errors"));
    }
}
