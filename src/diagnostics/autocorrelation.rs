//! Sample autocorrelation and partial autocorrelation.

use crate::error::{ForecastError, Result};
use crate::utils::stats::mean;

/// Returns the autocorrelation at a specific lag.
///
/// Uses the biased estimator (denominator `n`), so the implied
/// autocorrelation sequence is positive semi-definite.
///
/// # Arguments
/// * `series` - Input time series
/// * `lag` - Lag value
pub fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    if series.len() <= lag {
        return f64::NAN;
    }

    let m = mean(series);

    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for (i, &x) in series.iter().enumerate() {
        denominator += (x - m).powi(2);
        if i >= lag {
            numerator += (x - m) * (series[i - lag] - m);
        }
    }

    if denominator < 1e-10 {
        return if lag == 0 { 1.0 } else { 0.0 };
    }

    numerator / denominator
}

/// Autocorrelations for lags `1..=max_lag`.
///
/// # Errors
/// `EmptyData` for an empty series, `MissingValues` if it contains NaN,
/// `InsufficientData` when `max_lag` is not below the series length.
///
/// # Example
/// ```
/// use autoprod_forecast::diagnostics::acf;
///
/// let alternating: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
/// let r = acf(&alternating, 2).unwrap();
/// assert!(r[0] < -0.9);
/// assert!(r[1] > 0.9);
/// ```
pub fn acf(series: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    check_input(series, max_lag)?;
    Ok((1..=max_lag).map(|k| autocorrelation(series, k)).collect())
}

/// Partial autocorrelations for lags `1..=max_lag` via Durbin-Levinson.
///
/// Lags beyond a numerically singular step are reported as NaN.
pub fn pacf(series: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    check_input(series, max_lag)?;
    let rho: Vec<f64> = (0..=max_lag).map(|k| autocorrelation(series, k)).collect();
    Ok(durbin_levinson(&rho))
}

/// Partial autocorrelations from autocorrelations `rho[0..=L]` (with `rho[0] = 1`).
pub fn durbin_levinson(rho: &[f64]) -> Vec<f64> {
    let max_lag = rho.len().saturating_sub(1);
    let mut out = Vec::with_capacity(max_lag);
    if max_lag == 0 {
        return out;
    }

    let mut phi = vec![rho[1]];
    out.push(rho[1]);

    for k in 2..=max_lag {
        let num = rho[k] - (1..k).map(|j| phi[j - 1] * rho[k - j]).sum::<f64>();
        let denom = 1.0 - (1..k).map(|j| phi[j - 1] * rho[j]).sum::<f64>();

        if denom.abs() < 1e-10 {
            out.resize(max_lag, f64::NAN);
            return out;
        }

        let phi_kk = num / denom;
        let mut next: Vec<f64> = (1..k)
            .map(|j| phi[j - 1] - phi_kk * phi[k - j - 1])
            .collect();
        next.push(phi_kk);
        phi = next;
        out.push(phi_kk);
    }

    out
}

fn check_input(series: &[f64], max_lag: usize) -> Result<()> {
    if series.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    let missing = series.iter().filter(|v| v.is_nan()).count();
    if missing > 0 {
        return Err(ForecastError::MissingValues { count: missing });
    }
    if series.len() <= max_lag {
        return Err(ForecastError::InsufficientData {
            needed: max_lag + 1,
            got: series.len(),
        });
    }
    Ok(())
}
