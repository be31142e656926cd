//! Stationarity tests for the transformed series.
//!
//! The ADF test has a unit root as its null; KPSS has stationarity as its
//! null. Agreement between the two gives a firm verdict.

use std::fmt;

use nalgebra::DMatrix;

use crate::utils::ols::{ols_fit, OlsFit};
use crate::utils::stats::mean;

/// Result of a stationarity test.
#[derive(Debug, Clone, PartialEq)]
pub struct StationarityResult {
    /// Test statistic
    pub statistic: f64,
    /// P-value (interpolated from tabulated critical values)
    pub p_value: f64,
    /// Number of lags used
    pub lags: usize,
    /// Whether series appears stationary at the 5% level
    pub is_stationary: bool,
    /// Critical values at common significance levels
    pub critical_values: CriticalValues,
}

impl StationarityResult {
    fn undefined(lags: usize) -> Self {
        Self {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags,
            is_stationary: false,
            critical_values: CriticalValues::default(),
        }
    }
}

/// Critical values for stationarity tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriticalValues {
    /// Critical value at 1% significance
    pub cv_1pct: f64,
    /// Critical value at 5% significance
    pub cv_5pct: f64,
    /// Critical value at 10% significance
    pub cv_10pct: f64,
}

/// Augmented Dickey-Fuller test for a unit root.
///
/// Runs `Δy_t = α + β y_{t-1} + Σ γ_i Δy_{t-i} + ε_t` by OLS, choosing the
/// number of augmenting lags (up to `max_lags`) by AIC on a common sample.
/// Rejection (`t_β` below the critical value) implies stationarity.
///
/// # Arguments
/// * `series` - Time series data
/// * `max_lags` - Maximum lags to include (default: `12 (n/100)^{1/4}`)
pub fn adf_test(series: &[f64], max_lags: Option<usize>) -> StationarityResult {
    let n = series.len();

    if n < 8 || series.iter().any(|v| v.is_nan()) {
        return StationarityResult::undefined(0);
    }

    let default_lags = (12.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize;
    let max_lags = max_lags.unwrap_or(default_lags).min(n / 2 - 2);

    let diff: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lags {
        if let Some(fit) = adf_regression(series, &diff, lag, max_lags) {
            let aic = fit.aic();
            if best.map_or(true, |(_, b)| aic < b) {
                best = Some((lag, aic));
            }
        }
    }

    let Some((lag, _)) = best else {
        return StationarityResult::undefined(0);
    };

    // Re-estimate on the largest sample the chosen lag allows
    let Some(fit) = adf_regression(series, &diff, lag, lag) else {
        return StationarityResult::undefined(lag);
    };
    let t_stat = fit.t_stat(1);
    if !t_stat.is_finite() {
        return StationarityResult::undefined(lag);
    }

    // MacKinnon asymptotic critical values with constant, no trend
    let critical_values = CriticalValues {
        cv_1pct: -3.43,
        cv_5pct: -2.86,
        cv_10pct: -2.57,
    };

    StationarityResult {
        statistic: t_stat,
        p_value: adf_p_value(t_stat),
        lags: lag,
        is_stationary: t_stat < critical_values.cv_5pct,
        critical_values,
    }
}

/// ADF regression with `lag` augmenting terms, using observations from `skip + 1` on.
fn adf_regression(
    series: &[f64],
    diff: &[f64],
    lag: usize,
    skip: usize,
) -> Option<OlsFit> {
    let rows = diff.len().checked_sub(skip)?;
    let cols = 2 + lag;
    if rows <= cols + 1 {
        return None;
    }

    let y: Vec<f64> = diff[skip..].to_vec();
    let x = DMatrix::from_fn(rows, cols, |r, c| {
        let t = skip + r;
        match c {
            0 => 1.0,
            1 => series[t],
            i => diff[t - (i - 1)],
        }
    });
    ols_fit(&y, &x).ok()
}

/// Approximate p-value for the ADF statistic by interpolating a
/// MacKinnon-style table (constant, no trend).
fn adf_p_value(t_stat: f64) -> f64 {
    const TABLE: [(f64, f64); 10] = [
        (-4.38, 0.001),
        (-3.96, 0.0025),
        (-3.43, 0.01),
        (-3.12, 0.025),
        (-2.86, 0.05),
        (-2.57, 0.10),
        (-2.22, 0.20),
        (-1.62, 0.45),
        (-0.44, 0.90),
        (0.23, 0.975),
    ];
    interpolate_table(t_stat, &TABLE, 0.001, 0.99)
}

/// KPSS test for level stationarity.
///
/// Tests null hypothesis that series is stationary around a constant.
/// Rejection implies non-stationarity.
///
/// # Arguments
/// * `series` - Time series data
/// * `lags` - Number of lags for HAC variance (default: 4*(n/100)^0.25)
pub fn kpss_test(series: &[f64], lags: Option<usize>) -> StationarityResult {
    let n = series.len();

    if n < 4 || series.iter().any(|v| v.is_nan()) {
        return StationarityResult::undefined(0);
    }

    let lags = lags.unwrap_or_else(|| (4.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize);
    let lags = lags.min(n / 2).max(1);

    let m = mean(series);
    let residuals: Vec<f64> = series.iter().map(|&x| x - m).collect();

    let numerator: f64 = residuals
        .iter()
        .scan(0.0, |sum, &r| {
            *sum += r;
            Some(*sum * *sum)
        })
        .sum::<f64>()
        / (n * n) as f64;

    // Long-run variance with Bartlett weights
    let mut variance = residuals.iter().map(|&r| r * r).sum::<f64>() / n as f64;
    for j in 1..=lags {
        let weight = 1.0 - j as f64 / (lags + 1) as f64;
        let autocovar: f64 = residuals
            .iter()
            .skip(j)
            .zip(residuals.iter())
            .map(|(&a, &b)| a * b)
            .sum::<f64>()
            / n as f64;
        variance += 2.0 * weight * autocovar;
    }

    if variance <= 0.0 {
        return StationarityResult {
            is_stationary: true,
            ..StationarityResult::undefined(lags)
        };
    }

    let stat = numerator / variance;

    let critical_values = CriticalValues {
        cv_1pct: 0.739,
        cv_5pct: 0.463,
        cv_10pct: 0.347,
    };

    StationarityResult {
        statistic: stat,
        p_value: kpss_p_value(stat),
        lags,
        is_stationary: stat < critical_values.cv_5pct,
        critical_values,
    }
}

/// KPSS p-value, interpolated within the tabulated range [0.01, 0.10].
fn kpss_p_value(stat: f64) -> f64 {
    const TABLE: [(f64, f64); 4] = [(0.347, 0.10), (0.463, 0.05), (0.574, 0.025), (0.739, 0.01)];
    interpolate_table(stat, &TABLE, 0.10, 0.01)
}

/// Linear interpolation in `(statistic, p)` pairs sorted by statistic;
/// values beyond the ends clamp to `below` / `above`.
fn interpolate_table(x: f64, table: &[(f64, f64)], below: f64, above: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let (first, last) = (table[0], table[table.len() - 1]);
    if x < first.0 {
        return below;
    }
    if x >= last.0 {
        return above;
    }
    for pair in table.windows(2) {
        let ((x0, p0), (x1, p1)) = (pair[0], pair[1]);
        if x >= x0 && x < x1 {
            return p0 + (p1 - p0) * (x - x0) / (x1 - x0);
        }
    }
    above
}

/// Joint reading of ADF and KPSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationarityVerdict {
    /// ADF rejects a unit root and KPSS does not reject stationarity.
    Stationary,
    /// ADF keeps the unit root and KPSS rejects stationarity.
    NonStationary,
    /// The tests disagree.
    Inconclusive,
}

impl fmt::Display for StationarityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stationary => "stationary",
            Self::NonStationary => "non-stationary",
            Self::Inconclusive => "inconclusive",
        };
        f.write_str(s)
    }
}

/// ADF, KPSS and their combined verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct StationarityReport {
    pub adf: StationarityResult,
    pub kpss: StationarityResult,
    pub verdict: StationarityVerdict,
}

/// Combined stationarity test using both ADF and KPSS.
pub fn test_stationarity(series: &[f64]) -> StationarityReport {
    let adf = adf_test(series, None);
    let kpss = kpss_test(series, None);

    let verdict = if adf.is_stationary && kpss.is_stationary {
        StationarityVerdict::Stationary
    } else if !adf.is_stationary && !kpss.is_stationary {
        StationarityVerdict::NonStationary
    } else {
        StationarityVerdict::Inconclusive
    };

    StationarityReport { adf, kpss, verdict }
}

impl fmt::Display for StationarityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ADF t = {:.3} (lags {}, p ≈ {:.3}); KPSS = {:.3} (lags {}, p ≈ {:.3}); {}",
            self.adf.statistic,
            self.adf.lags,
            self.adf.p_value,
            self.kpss.statistic,
            self.kpss.lags,
            self.kpss.p_value,
            self.verdict
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(n: usize) -> Vec<f64> {
        (0..n).map(|i| ((i * 17 + 13) % 97) as f64 / 50.0 - 1.0).collect()
    }

    fn random_walk(n: usize) -> Vec<f64> {
        let mut series = vec![0.0; n];
        for i in 1..n {
            series[i] = series[i - 1] + ((i * 37 + 11) % 23) as f64 / 11.0 - 1.0;
        }
        series
    }

    #[test]
    fn adf_stationary_series() {
        let result = adf_test(&noise(200), Some(5));
        assert!(result.statistic < -2.86, "t = {}", result.statistic);
        assert!(result.is_stationary);
        assert!(result.p_value <= 0.05);
    }

    #[test]
    fn adf_trending_series() {
        let series: Vec<f64> = (0..200)
            .map(|i| i as f64 * 0.5 + ((i * 13) % 7) as f64 * 0.01)
            .collect();
        let result = adf_test(&series, Some(5));
        assert!(!result.is_stationary);
    }

    #[test]
    fn adf_p_value_range() {
        let result = adf_test(&random_walk(200), Some(5));
        assert!(!result.statistic.is_nan());
        assert!(result.p_value >= 0.0 && result.p_value <= 1.0);
    }

    #[test]
    fn adf_short_or_missing() {
        assert!(adf_test(&[1.0, 2.0, 3.0], Some(1)).statistic.is_nan());
        assert!(adf_test(&[], None).statistic.is_nan());
        let mut series = noise(50);
        series[10] = f64::NAN;
        assert!(adf_test(&series, None).statistic.is_nan());
    }

    #[test]
    fn adf_critical_values_ordered() {
        let result = adf_test(&noise(100), None);
        assert!(result.critical_values.cv_1pct < result.critical_values.cv_5pct);
        assert!(result.critical_values.cv_5pct < result.critical_values.cv_10pct);
    }

    #[test]
    fn adf_p_value_interpolation() {
        assert!((adf_p_value(-2.86) - 0.05).abs() < 1e-12);
        assert!(adf_p_value(-10.0) <= 0.001);
        assert!(adf_p_value(2.0) >= 0.975);
        assert!(adf_p_value(-3.0) < adf_p_value(-2.0));
    }

    #[test]
    fn kpss_stationary_series() {
        let result = kpss_test(&noise(200), Some(10));
        assert!(result.statistic > 0.0);
        assert!(result.is_stationary);
    }

    #[test]
    fn kpss_trending_series() {
        let series: Vec<f64> = (0..200).map(|i| i as f64 * 0.5).collect();
        let result = kpss_test(&series, Some(10));
        assert!(!result.is_stationary);
        assert!((result.p_value - 0.01).abs() < 1e-12);
    }

    #[test]
    fn kpss_short_series() {
        assert!(kpss_test(&[1.0, 2.0, 3.0], Some(1)).statistic.is_nan());
        assert!(kpss_test(&[], None).statistic.is_nan());
    }

    #[test]
    fn kpss_p_value_bounds() {
        assert!((kpss_p_value(0.1) - 0.10).abs() < 1e-12);
        assert!((kpss_p_value(0.463) - 0.05).abs() < 1e-12);
        assert!((kpss_p_value(2.0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn combined_test_trending() {
        let series: Vec<f64> = (0..200)
            .map(|i| i as f64 * 0.5 + ((i * 13) % 7) as f64 * 0.01)
            .collect();
        let report = test_stationarity(&series);
        assert!(matches!(
            report.verdict,
            StationarityVerdict::NonStationary | StationarityVerdict::Inconclusive
        ));
    }

    #[test]
    fn combined_test_short() {
        let report = test_stationarity(&[1.0, 2.0, 3.0]);
        assert!(report.adf.statistic.is_nan());
        assert!(report.kpss.statistic.is_nan());
        assert!(report.to_string().contains("NaN"));
    }
}
