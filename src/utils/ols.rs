//! Ordinary Least Squares regression for test regressions (ADF).

use crate::error::{ForecastError, Result};
use nalgebra::{DMatrix, DVector};

/// OLS estimates with classical standard errors.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Coefficients, one per design column.
    pub coefficients: Vec<f64>,
    /// Standard errors of the coefficients.
    pub std_errors: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Number of observations.
    pub nobs: usize,
}

impl OlsFit {
    /// `t` statistic of coefficient `i`.
    pub fn t_stat(&self, i: usize) -> f64 {
        self.coefficients[i] / self.std_errors[i]
    }

    /// Gaussian AIC `n ln(RSS/n) + 2k`.
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        n * (self.rss / n).ln() + 2.0 * self.coefficients.len() as f64
    }
}

/// Fit `y = X β + ε` by solving the normal equations with a Cholesky factorisation.
///
/// # Arguments
/// * `y` - Target values (length n)
/// * `x` - Design matrix (n × k), including any intercept column
pub fn ols_fit(y: &[f64], x: &DMatrix<f64>) -> Result<OlsFit> {
    let n = y.len();
    let k = x.ncols();

    if x.nrows() != n {
        return Err(ForecastError::DimensionMismatch {
            expected: n,
            got: x.nrows(),
        });
    }
    if n <= k {
        return Err(ForecastError::InsufficientData {
            needed: k + 1,
            got: n,
        });
    }

    let y = DVector::from_column_slice(y);
    let xtx = x.transpose() * x;
    let xty = x.transpose() * &y;

    let chol = xtx.cholesky().ok_or_else(|| {
        ForecastError::ComputationError(
            "OLS regression failed: matrix not positive definite".into(),
        )
    })?;
    let beta = chol.solve(&xty);
    let xtx_inv = chol.inverse();

    let residuals = &y - x * &beta;
    let rss = residuals.norm_squared();
    let sigma2 = rss / (n - k) as f64;

    let std_errors = (0..k).map(|i| (sigma2 * xtx_inv[(i, i)]).sqrt()).collect();

    Ok(OlsFit {
        coefficients: beta.iter().copied().collect(),
        std_errors,
        rss,
        nobs: n,
    })
}
