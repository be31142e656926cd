//! ACF/PACF bundle with significance bands.

use std::fmt;

use crate::core::MonthlySeries;
use crate::diagnostics::autocorrelation::{acf, pacf};
use crate::error::{ForecastError, Result};
use crate::utils::stats::z_for_level;

/// Default number of lags: three seasonal cycles of monthly data.
pub const DEFAULT_LAGS: usize = 36;

/// Sample ACF and PACF of a series with the white-noise band `±z/√n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlogram {
    /// Autocorrelations at lags `1..=max_lag`.
    pub acf: Vec<f64>,
    /// Partial autocorrelations at lags `1..=max_lag`.
    pub pacf: Vec<f64>,
    /// Half-width of the significance band.
    pub band: f64,
    /// Confidence level used for the band.
    pub level: f64,
    /// Observations the correlogram was computed from.
    pub nobs: usize,
}

impl Correlogram {
    /// Compute the correlogram of raw values.
    pub fn from_values(values: &[f64], max_lag: usize, level: f64) -> Result<Self> {
        if !(level > 0.0 && level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {}",
                level
            )));
        }
        if max_lag == 0 {
            return Err(ForecastError::InvalidParameter(
                "correlogram needs at least one lag".to_string(),
            ));
        }
        let nobs = values.len();
        Ok(Self {
            acf: acf(values, max_lag)?,
            pacf: pacf(values, max_lag)?,
            band: z_for_level(level) / (nobs as f64).sqrt(),
            level,
            nobs,
        })
    }

    /// Compute the correlogram of a series.
    pub fn compute(series: &MonthlySeries, max_lag: usize, level: f64) -> Result<Self> {
        Self::from_values(series.values(), max_lag, level)
    }

    /// Number of lags.
    pub fn max_lag(&self) -> usize {
        self.acf.len()
    }

    /// Lags whose autocorrelation lies outside the band.
    pub fn significant_acf_lags(&self) -> Vec<usize> {
        significant(&self.acf, self.band)
    }

    /// Lags whose partial autocorrelation lies outside the band.
    pub fn significant_pacf_lags(&self) -> Vec<usize> {
        significant(&self.pacf, self.band)
    }
}

fn significant(values: &[f64], band: f64) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.abs() > band)
        .map(|(i, _)| i + 1)
        .collect()
}

impl fmt::Display for Correlogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "lag       acf      pacf   (n = {}, band ±{:.4} at {:.0}%)",
            self.nobs,
            self.band,
            self.level * 100.0
        )?;
        for (i, (a, p)) in self.acf.iter().zip(&self.pacf).enumerate() {
            let mark = |v: f64| if v.abs() > self.band { '*' } else { ' ' };
            writeln!(f, "{:>3}  {:>8.4}{} {:>8.4}{}", i + 1, a, mark(*a), p, mark(*p))?;
        }
        Ok(())
    }
}
