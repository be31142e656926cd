//! Forecast result structure for holding dated predictions.

use crate::core::month::Month;
use crate::core::series::{MonthlySeries, Scale};
use crate::error::{ForecastError, Result};

/// One forecast step: point estimate and two-sided interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub month: Month,
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ForecastPoint {
    /// Interval width (upper - lower).
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Whether `value` falls inside the interval.
    pub fn covers(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// A forecast: consecutive months immediately after the fitting series' end.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    points: Vec<ForecastPoint>,
    /// Confidence level of the intervals (e.g. 0.95).
    level: f64,
    scale: Scale,
}

impl Forecast {
    /// Build a forecast starting at `start` from parallel mean/lower/upper vectors.
    pub fn from_parts(
        start: Month,
        mean: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        level: f64,
        scale: Scale,
    ) -> Result<Self> {
        if lower.len() != mean.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: mean.len(),
                got: lower.len(),
            });
        }
        if upper.len() != mean.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: mean.len(),
                got: upper.len(),
            });
        }
        let points = mean
            .into_iter()
            .zip(lower)
            .zip(upper)
            .enumerate()
            .map(|(i, ((mean, lower), upper))| ForecastPoint {
                month: start.offset(i as i64),
                mean,
                lower,
                upper,
            })
            .collect();
        Ok(Self {
            points,
            level,
            scale,
        })
    }

    /// Get the forecast horizon (number of steps).
    pub fn horizon(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    /// Forecast months in order.
    pub fn months(&self) -> Vec<Month> {
        self.points.iter().map(|p| p.month).collect()
    }

    /// Point estimates in order.
    pub fn means(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean).collect()
    }

    /// Point for `month`, if forecast.
    pub fn get(&self, month: Month) -> Option<&ForecastPoint> {
        self.points.iter().find(|p| p.month == month)
    }

    /// Point estimates as a dated series on the forecast's scale.
    pub fn to_series(&self) -> Option<MonthlySeries> {
        let first = self.points.first()?;
        Some(MonthlySeries::with_scale(
            first.month,
            self.means(),
            self.scale.clone(),
        ))
    }

    /// Convert a log-scale forecast back to raw units by exponentiation.
    ///
    /// The exponentiated mean is the median of the implied log-normal
    /// forecast distribution; interval bounds map exactly. Raw-scale
    /// forecasts are returned unchanged.
    pub fn to_raw_scale(&self) -> Result<Forecast> {
        if self.scale.is_differenced() {
            return Err(ForecastError::InvalidTransform(format!(
                "cannot back-transform a forecast on scale {}",
                self.scale
            )));
        }
        if !self.scale.is_log() {
            return Ok(self.clone());
        }
        let points = self
            .points
            .iter()
            .map(|p| ForecastPoint {
                month: p.month,
                mean: p.mean.exp(),
                lower: p.lower.exp(),
                upper: p.upper.exp(),
            })
            .collect();
        Ok(Forecast {
            points,
            level: self.level,
            scale: Scale::raw(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn start() -> Month {
        Month::new(2022, 10).unwrap()
    }

    #[test]
    fn forecast_points_are_consecutive_months() {
        let f = Forecast::from_parts(
            start(),
            vec![1.0, 2.0, 3.0],
            vec![0.5, 1.5, 2.5],
            vec![1.5, 2.5, 3.5],
            0.95,
            Scale::raw(),
        )
        .unwrap();

        assert_eq!(f.horizon(), 3);
        assert_eq!(
            f.months(),
            vec![
                Month::new(2022, 10).unwrap(),
                Month::new(2022, 11).unwrap(),
                Month::new(2022, 12).unwrap()
            ]
        );
        assert_relative_eq!(f.points()[1].width(), 1.0);
        assert!(f.points()[2].covers(3.2));
        assert!(!f.points()[2].covers(3.6));
    }

    #[test]
    fn forecast_rejects_mismatched_bounds() {
        let result = Forecast::from_parts(
            start(),
            vec![1.0, 2.0],
            vec![0.5],
            vec![1.5, 2.5],
            0.95,
            Scale::raw(),
        );
        assert!(matches!(
            result,
            Err(ForecastError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn log_forecast_back_transforms() {
        let f = Forecast::from_parts(
            start(),
            vec![100f64.ln()],
            vec![90f64.ln()],
            vec![110f64.ln()],
            0.95,
            Scale::log(),
        )
        .unwrap();

        let raw = f.to_raw_scale().unwrap();
        assert!(raw.scale().is_raw());
        assert_relative_eq!(raw.points()[0].mean, 100.0, epsilon = 1e-9);
        assert_relative_eq!(raw.points()[0].lower, 90.0, epsilon = 1e-9);
        assert_relative_eq!(raw.points()[0].upper, 110.0, epsilon = 1e-9);
        assert_eq!(raw.months(), f.months());

        // Raw forecasts pass through
        assert_eq!(raw.to_raw_scale().unwrap(), raw);
    }

    #[test]
    fn differenced_forecast_cannot_back_transform() {
        let f = Forecast::from_parts(
            start(),
            vec![0.1],
            vec![0.0],
            vec![0.2],
            0.95,
            Scale::log().differenced(1),
        )
        .unwrap();
        assert!(f.to_raw_scale().is_err());
    }
}
