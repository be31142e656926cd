//! Harvey-form state space representation of a stationary ARMA process
//! and the Kalman filter that evaluates its exact Gaussian likelihood.
//!
//! The state has dimension `m = max(p, q + 1)` where `p` and `q` are the
//! expanded (seasonal-multiplied) orders. With the AR coefficients `φ`
//! padded to length `m` and the MA coefficients `θ` padded to `m - 1`:
//!
//! ```text
//! T = | φ_1      1 0 ... 0 |     R = [1, θ_1, ..., θ_{m-1}]'
//!     | φ_2      0 1 ... 0 |     Z = [1, 0, ..., 0]
//!     | ...               |
//!     | φ_m      0 0 ... 0 |
//! ```

use crate::error::{ForecastError, Result};
use nalgebra::{DMatrix, DVector};

/// Relative change in `F_t` below which the filter is treated as converged.
const STEADY_STATE_TOL: f64 = 1e-10;

/// Maximum doubling steps when solving for the stationary covariance.
const MAX_DOUBLING_STEPS: usize = 100;

/// Time-invariant ARMA state space model with unit innovation variance.
#[derive(Debug, Clone)]
pub struct StateSpace {
    phi: Vec<f64>,
    selection: DVector<f64>,
}

impl StateSpace {
    /// Build from expanded AR coefficients (`y_t = Σ φ_i y_{t-i} + ...`)
    /// and expanded MA coefficients (`... + ε_t + Σ θ_j ε_{t-j}`).
    pub fn new(ar: &[f64], ma: &[f64]) -> Self {
        let m = ar.len().max(ma.len() + 1);
        let mut phi = vec![0.0; m];
        phi[..ar.len()].copy_from_slice(ar);

        let mut selection = DVector::zeros(m);
        selection[0] = 1.0;
        for (j, &theta) in ma.iter().enumerate() {
            selection[j + 1] = theta;
        }
        Self { phi, selection }
    }

    /// State dimension.
    pub fn dim(&self) -> usize {
        self.phi.len()
    }

    /// Dense transition matrix `T`.
    pub fn transition(&self) -> DMatrix<f64> {
        let m = self.dim();
        DMatrix::from_fn(m, m, |i, j| {
            if j == 0 {
                self.phi[i]
            } else if j == i + 1 {
                1.0
            } else {
                0.0
            }
        })
    }

    /// `T a` without forming `T`.
    pub fn apply_transition(&self, a: &DVector<f64>) -> DVector<f64> {
        let m = self.dim();
        DVector::from_fn(m, |i, _| {
            let shifted = if i + 1 < m { a[i + 1] } else { 0.0 };
            self.phi[i] * a[0] + shifted
        })
    }

    /// `T P T' + R R'` using the companion structure of `T`.
    pub fn predict_covariance(&self, p: &DMatrix<f64>) -> DMatrix<f64> {
        let m = self.dim();
        // (T P)[i, j] = φ_i P[0, j] + P[i + 1, j]
        let tp = DMatrix::from_fn(m, m, |i, j| {
            let shifted = if i + 1 < m { p[(i + 1, j)] } else { 0.0 };
            self.phi[i] * p[(0, j)] + shifted
        });
        // (X T')[i, j] = X[i, 0] φ_j + X[i, j + 1]
        DMatrix::from_fn(m, m, |i, j| {
            let shifted = if j + 1 < m { tp[(i, j + 1)] } else { 0.0 };
            tp[(i, 0)] * self.phi[j] + shifted + self.selection[i] * self.selection[j]
        })
    }

    /// Unconditional state covariance solving `P = T P T' + R R'`.
    ///
    /// Uses the doubling iteration `S_{k+1} = S_k + A_k S_k A_k'`,
    /// `A_{k+1} = A_k²`, which sums `2^k` terms of the series after `k` steps.
    pub fn stationary_covariance(&self) -> Result<DMatrix<f64>> {
        let mut a = self.transition();
        let mut s = &self.selection * self.selection.transpose();

        for _ in 0..MAX_DOUBLING_STEPS {
            let increment = &a * &s * a.transpose();
            let change = increment.amax();
            s += increment;
            if !s.iter().all(|v| v.is_finite()) {
                break;
            }
            if change <= 1e-14 * s.amax().max(1.0) {
                return Ok(s);
            }
            a = &a * &a;
        }

        Err(ForecastError::ComputationError(
            "state covariance did not converge; AR polynomial is not stationary".to_string(),
        ))
    }
}

/// Output of a full Kalman filter pass.
#[derive(Debug, Clone)]
pub struct FilterOutput {
    /// Concentrated Gaussian log-likelihood.
    pub loglike: f64,
    /// Maximum likelihood innovation variance `σ̂²`.
    pub sigma2: f64,
    /// One-step prediction errors `v_t`.
    pub innovations: Vec<f64>,
    /// Innovation variances `F_t` in units of `σ²`.
    pub variances: Vec<f64>,
    /// State prediction `a_{n+1|n}` after the last observation.
    pub predicted_state: DVector<f64>,
    /// State covariance `P_{n+1|n}` in units of `σ²`.
    pub predicted_cov: DMatrix<f64>,
}

/// Run the Kalman filter over `data` from the stationary initial state.
///
/// The innovation variance is concentrated out of the likelihood:
/// `σ̂² = Σ v_t² / F_t / n` and
/// `ll = -n/2 (ln 2π + ln σ̂² + 1) - ½ Σ ln F_t`.
///
/// Once `F_t` stops changing the covariance recursion is frozen and only
/// the state is propagated.
pub fn kalman_filter(data: &[f64], ss: &StateSpace) -> Result<FilterOutput> {
    let n = data.len();
    if n == 0 {
        return Err(ForecastError::EmptyData);
    }

    let mut a = DVector::zeros(ss.dim());
    let mut p = ss.stationary_covariance()?;
    let mut steady: Option<(DVector<f64>, f64)> = None;
    let mut previous_f = f64::NAN;

    let mut innovations = Vec::with_capacity(n);
    let mut variances = Vec::with_capacity(n);
    let mut sum_log_f = 0.0;
    let mut sum_v2_f = 0.0;

    for (t, &y) in data.iter().enumerate() {
        let v = y - a[0];

        let f = match &steady {
            Some((gain, f)) => {
                a.axpy(v / f, gain, 1.0);
                *f
            }
            None => {
                let f = p[(0, 0)];
                if !(f.is_finite() && f > 0.0) {
                    return Err(ForecastError::ComputationError(format!(
                        "innovation variance {} at t={} is not positive",
                        f, t
                    )));
                }
                let gain = p.column(0).clone_owned();
                a.axpy(v / f, &gain, 1.0);
                p.ger(-1.0 / f, &gain, &gain, 1.0);
                p = ss.predict_covariance(&p);

                if (f - previous_f).abs() <= STEADY_STATE_TOL * f {
                    steady = Some((p.column(0).clone_owned(), p[(0, 0)]));
                }
                previous_f = f;
                f
            }
        };
        a = ss.apply_transition(&a);

        innovations.push(v);
        variances.push(f);
        sum_log_f += f.ln();
        sum_v2_f += v * v / f;
    }

    let nf = n as f64;
    let sigma2 = sum_v2_f / nf;
    let loglike = -0.5 * nf * ((2.0 * std::f64::consts::PI).ln() + sigma2.max(1e-300).ln() + 1.0)
        - 0.5 * sum_log_f;

    Ok(FilterOutput {
        loglike,
        sigma2,
        innovations,
        variances,
        predicted_state: a,
        predicted_cov: p,
    })
}

/// Point predictions of the observed component for `horizon` steps,
/// starting from the one-step state prediction `state`.
pub fn project_state(ss: &StateSpace, state: &DVector<f64>, horizon: usize) -> Vec<f64> {
    let mut a = state.clone();
    let mut out = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        out.push(a[0]);
        a = ss.apply_transition(&a);
    }
    out
}
