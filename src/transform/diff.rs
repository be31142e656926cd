//! Differencing and its inverse.

use crate::core::MonthlySeries;
use crate::error::{ForecastError, Result};

/// Apply lag-`lag` differencing `d[t] = y[t] - y[t-lag]`, `order` times.
///
/// Each pass drops `lag` leading points.
pub fn difference_lag(series: &[f64], lag: usize, order: usize) -> Vec<f64> {
    if order == 0 || lag == 0 {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..order {
        if result.len() <= lag {
            return vec![];
        }
        result = result
            .iter()
            .skip(lag)
            .zip(result.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// Apply first-order differencing `d` times.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    difference_lag(series, 1, d)
}

/// Apply seasonal differencing at `period`, `d` times.
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    difference_lag(series, period, d)
}

/// Coefficients of `(1-B)^d (1-B^s)^D` as a polynomial in `B`, constant term first.
pub fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = multiply(&poly, &[1.0, -1.0]);
    }
    if period > 0 {
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = -1.0;
        for _ in 0..seasonal_d {
            poly = multiply(&poly, &seasonal);
        }
    }
    poly
}

/// Product of two polynomials given as coefficient vectors, constant first.
pub(crate) fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return vec![];
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Integrate forecasts made on the differenced scale back to the level scale.
///
/// `history` is the undifferenced series the differences were taken from;
/// `delta` is the differencing polynomial from [`differencing_polynomial`].
/// Uses `y[t] = w[t] - sum_j delta[j] * y[t-j]`.
pub fn integrate(differenced: &[f64], history: &[f64], delta: &[f64]) -> Result<Vec<f64>> {
    let order = delta.len().saturating_sub(1);
    if order == 0 {
        return Ok(differenced.to_vec());
    }
    if history.len() < order {
        return Err(ForecastError::InsufficientData {
            needed: order,
            got: history.len(),
        });
    }

    let mut extended = history[history.len() - order..].to_vec();
    let mut result = Vec::with_capacity(differenced.len());
    for &w in differenced {
        let t = extended.len();
        let carried: f64 = (1..=order).map(|j| delta[j] * extended[t - j]).sum();
        let y = w - carried;
        extended.push(y);
        result.push(y);
    }
    Ok(result)
}

impl MonthlySeries {
    /// Difference at `lag`, advancing the start month by `lag`.
    pub fn difference(&self, lag: usize) -> Result<MonthlySeries> {
        if lag == 0 {
            return Err(ForecastError::InvalidParameter(
                "differencing lag must be positive".to_string(),
            ));
        }
        if self.len() <= lag {
            return Err(ForecastError::InsufficientData {
                needed: lag + 1,
                got: self.len(),
            });
        }
        let values = difference_lag(self.values(), lag, 1);
        Ok(self.derive(
            self.start().offset(lag as i64),
            values,
            self.scale().differenced(lag),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Month, Scale};
    use approx::assert_relative_eq;

    #[test]
    fn difference_order_0() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(difference(&series, 0), series);
    }

    #[test]
    fn difference_order_1_and_2() {
        let series = vec![1.0, 3.0, 6.0, 10.0, 15.0];
        assert_eq!(difference(&series, 1), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(difference(&series, 2), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn difference_empty_and_short() {
        assert!(difference(&[], 1).is_empty());
        assert!(seasonal_difference(&[1.0, 2.0], 1, 12).is_empty());
    }

    #[test]
    fn seasonal_difference_basic() {
        // Quarterly data: each quarter up by 10 year over year
        let series = vec![100.0, 120.0, 80.0, 90.0, 110.0, 130.0, 90.0, 100.0];
        assert_eq!(
            seasonal_difference(&series, 1, 4),
            vec![10.0, 10.0, 10.0, 10.0]
        );
    }

    #[test]
    fn differencing_polynomial_expands() {
        assert_eq!(differencing_polynomial(1, 0, 12), vec![1.0, -1.0]);
        assert_eq!(differencing_polynomial(2, 0, 0), vec![1.0, -2.0, 1.0]);

        let p = differencing_polynomial(1, 1, 4);
        // (1 - B)(1 - B^4) = 1 - B - B^4 + B^5
        assert_eq!(p, vec![1.0, -1.0, 0.0, 0.0, -1.0, 1.0]);
    }

    #[test]
    fn integrate_continues_first_difference() {
        let history = vec![10.0, 12.0, 15.0, 19.0, 24.0];
        let delta = differencing_polynomial(1, 0, 0);
        let integrated = integrate(&[6.0, 7.0], &history, &delta).unwrap();
        assert_relative_eq!(integrated[0], 30.0, epsilon = 1e-10);
        assert_relative_eq!(integrated[1], 37.0, epsilon = 1e-10);
    }

    #[test]
    fn integrate_inverts_seasonal_and_simple_differencing() {
        let full: Vec<f64> = (0..40)
            .map(|i| 100.0 + 0.7 * i as f64 + 5.0 * ((i % 4) as f64))
            .collect();
        let (history, future) = full.split_at(30);
        let diffed = seasonal_difference(&difference(&full, 1), 1, 4);
        // diffed[k] corresponds to full[k + 5]
        let future_w = &diffed[30 - 5..];
        let delta = differencing_polynomial(1, 1, 4);
        let rebuilt = integrate(future_w, history, &delta).unwrap();
        for (a, b) in rebuilt.iter().zip(future) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn integrate_requires_enough_history() {
        let delta = differencing_polynomial(1, 1, 12);
        assert!(matches!(
            integrate(&[1.0], &[1.0; 5], &delta),
            Err(ForecastError::InsufficientData { needed: 13, got: 5 })
        ));
    }

    #[test]
    fn series_difference_advances_start_and_tags_scale() {
        let start = Month::new(2020, 1).unwrap();
        let s = MonthlySeries::new(start, (0..30).map(|i| i as f64).collect());
        let d = s.difference(12).unwrap().difference(1).unwrap();
        assert_eq!(d.len(), 30 - 13);
        assert_eq!(d.start(), Month::new(2021, 2).unwrap());
        assert_eq!(d.scale(), &Scale::raw().differenced(12).differenced(1));
        assert!(d.values().iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn series_difference_rejects_bad_lag() {
        let s = MonthlySeries::new(Month::new(2020, 1).unwrap(), vec![1.0, 2.0]);
        assert!(s.difference(0).is_err());
        assert!(matches!(
            s.difference(12),
            Err(ForecastError::InsufficientData { .. })
        ));
    }
}
