//! Seasonal ARIMA estimated by exact Gaussian maximum likelihood.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::core::{Forecast, Month, MonthlySeries, Scale};
use crate::error::{ForecastError, Result};
use crate::models::sarima::order::SarimaOrder;
use crate::models::sarima::polynomial::{
    ar_coefficients_from_polynomial, ar_polynomial, constrain_invertible, constrain_stationary,
    ma_polynomial, multiply, psi_weights,
};
use crate::models::sarima::state_space::{kalman_filter, project_state, StateSpace};
use crate::transform::{difference_lag, differencing_polynomial, integrate};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::{mean, normal_two_sided_p, z_for_level};
use crate::validation::ResidualDiagnostics;

/// Step for the central-difference Hessian.
const HESSIAN_STEP: f64 = 1e-4;

/// Estimation settings.
#[derive(Debug, Clone)]
pub struct SarimaConfig {
    /// Model order.
    pub order: SarimaOrder,
    /// Estimate a mean when the model has no differencing.
    pub include_mean: bool,
    /// Return the last iterate instead of failing when the optimiser stops early.
    pub allow_nonconverged: bool,
    /// Optimiser settings.
    pub optimizer: NelderMeadConfig,
}

impl Default for SarimaConfig {
    fn default() -> Self {
        Self {
            order: SarimaOrder::default(),
            include_mean: true,
            allow_nonconverged: false,
            optimizer: NelderMeadConfig {
                max_iter: 3000,
                tolerance: 1e-10,
                initial_step: 0.25,
                ..Default::default()
            },
        }
    }
}

impl SarimaConfig {
    /// Set the model order.
    pub fn with_order(mut self, order: SarimaOrder) -> Self {
        self.order = order;
        self
    }

    /// Enable or disable the mean term.
    pub fn with_mean(mut self, include_mean: bool) -> Self {
        self.include_mean = include_mean;
        self
    }

    /// Accept non-converged fits.
    pub fn with_allow_nonconverged(mut self, allow: bool) -> Self {
        self.allow_nonconverged = allow;
        self
    }

    /// Replace the optimiser settings.
    pub fn with_optimizer(mut self, optimizer: NelderMeadConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Cap the optimiser iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.optimizer.max_iter = max_iter;
        self
    }
}

/// SARIMA estimator.
///
/// The series is differenced by `(1-B)^d (1-B^s)^D` and the stationary
/// ARMA part `φ(B)Φ(B^s) w_t = θ(B)Θ(B^s) ε_t` is fit by maximising the
/// exact likelihood from a Kalman filter. Coefficients are searched in an
/// unconstrained space mapped onto the stationary and invertible region.
///
/// # Example
/// ```
/// use autoprod_forecast::core::{Month, MonthlySeries};
/// use autoprod_forecast::models::sarima::{Sarima, SarimaConfig, SarimaOrder};
///
/// let start = Month::new(2015, 1).unwrap();
/// let values: Vec<f64> = (0..96)
///     .map(|i| 100.0 + 0.5 * i as f64 + 10.0 * (i as f64 * std::f64::consts::PI / 6.0).sin()
///         + ((i * 7919) % 13) as f64 * 0.3)
///     .collect();
/// let series = MonthlySeries::new(start, values);
///
/// let config = SarimaConfig::default()
///     .with_order(SarimaOrder::new(0, 1, 1, 0, 1, 1, 12))
///     .with_allow_nonconverged(true);
/// let fit = Sarima::with_config(config).fit(&series).unwrap();
/// let forecast = fit.forecast(12, 0.95).unwrap();
/// assert_eq!(forecast.horizon(), 12);
/// assert_eq!(forecast.points()[0].month, Month::new(2023, 1).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Sarima {
    config: SarimaConfig,
}

impl Sarima {
    /// Estimator for `order` with default settings.
    pub fn new(order: SarimaOrder) -> Self {
        Self {
            config: SarimaConfig::default().with_order(order),
        }
    }

    /// Estimator with explicit settings.
    pub fn with_config(config: SarimaConfig) -> Self {
        Self { config }
    }

    /// Estimation settings.
    pub fn config(&self) -> &SarimaConfig {
        &self.config
    }

    /// Model order.
    pub fn order(&self) -> SarimaOrder {
        self.config.order
    }

    /// Fit the model to an undifferenced series.
    ///
    /// # Errors
    /// * `InvalidTransform` if the series is already differenced
    /// * `MissingValues` if it contains NaN
    /// * `InsufficientData` if too few points remain after differencing
    /// * `ConvergenceFailure` if the optimiser stops before converging and
    ///   [`SarimaConfig::allow_nonconverged`] is off
    pub fn fit(&self, series: &MonthlySeries) -> Result<FittedSarima> {
        let order = self.config.order;
        order.validate()?;

        if series.scale().is_differenced() {
            return Err(ForecastError::InvalidTransform(format!(
                "model differencing is internal; got a {} series",
                series.scale()
            )));
        }
        let missing = series.missing_count();
        if missing > 0 {
            return Err(ForecastError::MissingValues { count: missing });
        }

        let values = series.values();
        let loss = order.differencing_loss();
        let k = order.num_coefficients();
        let needed = loss + k + 3;
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let w = difference_lag(&difference_lag(values, 1, order.d), order.s, order.cap_d);
        let has_mean = self.config.include_mean && order.d == 0 && order.cap_d == 0;
        let mu = if has_mean { mean(&w) } else { 0.0 };
        let z: Vec<f64> = w.iter().map(|v| v - mu).collect();
        let nobs = z.len();

        let objective = |x: &[f64]| {
            let coefficients = Coefficients::from_unconstrained(&order, x);
            evaluate(&z, &order, &coefficients).map_or(f64::NAN, |ll| -ll / nobs as f64)
        };

        let result = nelder_mead(objective, &vec![0.0; k], &self.config.optimizer);
        debug!(
            order = %order,
            iterations = result.iterations,
            converged = result.converged,
            objective = result.optimal_value,
            "optimiser finished"
        );

        if !result.converged {
            warn!(order = %order, iterations = result.iterations, "SARIMA fit did not converge");
            if !self.config.allow_nonconverged {
                return Err(ForecastError::ConvergenceFailure {
                    order: order.to_string(),
                    iterations: result.iterations,
                });
            }
        }

        let coefficients = Coefficients::from_unconstrained(&order, &result.optimal_point);
        let ss = coefficients.state_space(&order);
        let filtered = kalman_filter(&z, &ss)?;

        let std_errors = standard_errors(&z, &order, &coefficients);

        let n = nobs as f64;
        let n_params = (k + 1 + usize::from(has_mean)) as f64;
        let loglike = filtered.loglike;
        let aic = -2.0 * loglike + 2.0 * n_params;
        let bic = -2.0 * loglike + n_params * n.ln();
        let hqic = -2.0 * loglike + 2.0 * n_params * n.ln().ln();

        let standardized: Vec<f64> = filtered
            .innovations
            .iter()
            .zip(&filtered.variances)
            .map(|(v, f)| v / (filtered.sigma2 * f).sqrt())
            .collect();

        let end = series.end().ok_or(ForecastError::EmptyData)?;
        debug!(order = %order, loglike, aic, sigma2 = filtered.sigma2, "SARIMA fitted");

        Ok(FittedSarima {
            order,
            coefficients,
            mean: has_mean.then_some(mu),
            sigma2: filtered.sigma2,
            loglike,
            aic,
            bic,
            hqic,
            std_errors,
            residuals: filtered.innovations,
            standardized_residuals: standardized,
            converged: result.converged,
            iterations: result.iterations,
            nobs,
            history: values.to_vec(),
            residual_start: series.start().offset(loss as i64),
            end,
            scale: series.scale().clone(),
            state: filtered.predicted_state,
            name: series.name().map(str::to_string),
        })
    }
}

/// ARMA coefficients split by role.
#[derive(Debug, Clone, PartialEq)]
struct Coefficients {
    ar: Vec<f64>,
    ma: Vec<f64>,
    sar: Vec<f64>,
    sma: Vec<f64>,
}

impl Coefficients {
    /// Map an unconstrained vector `[ar | ma | sar | sma]` into the admissible region.
    fn from_unconstrained(order: &SarimaOrder, x: &[f64]) -> Self {
        let (ar, rest) = x.split_at(order.p);
        let (ma, rest) = rest.split_at(order.q);
        let (sar, sma) = rest.split_at(order.cap_p);
        Self {
            ar: constrain_stationary(ar),
            ma: constrain_invertible(ma),
            sar: constrain_stationary(sar),
            sma: constrain_invertible(sma),
        }
    }

    /// Split a flat `[ar | ma | sar | sma]` vector without constraining it.
    fn from_flat(order: &SarimaOrder, x: &[f64]) -> Self {
        let (ar, rest) = x.split_at(order.p);
        let (ma, rest) = rest.split_at(order.q);
        let (sar, sma) = rest.split_at(order.cap_p);
        Self {
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            sar: sar.to_vec(),
            sma: sma.to_vec(),
        }
    }

    fn flat(&self) -> Vec<f64> {
        [&self.ar[..], &self.ma, &self.sar, &self.sma].concat()
    }

    fn ar_poly(&self, order: &SarimaOrder) -> Vec<f64> {
        ar_polynomial(&self.ar, &self.sar, order.s)
    }

    fn ma_poly(&self, order: &SarimaOrder) -> Vec<f64> {
        ma_polynomial(&self.ma, &self.sma, order.s)
    }

    fn state_space(&self, order: &SarimaOrder) -> StateSpace {
        let ar = ar_coefficients_from_polynomial(&self.ar_poly(order));
        let ma: Vec<f64> = self.ma_poly(order).into_iter().skip(1).collect();
        StateSpace::new(&ar, &ma)
    }
}

/// Concentrated log-likelihood, or `None` if the filter fails.
fn evaluate(z: &[f64], order: &SarimaOrder, coefficients: &Coefficients) -> Option<f64> {
    kalman_filter(z, &coefficients.state_space(order))
        .ok()
        .map(|out| out.loglike)
        .filter(|ll| ll.is_finite())
}

/// Standard errors from the inverse numerical Hessian of `-loglike`
/// with respect to the coefficients themselves. NaN when the Hessian is
/// not invertible or not positive on the diagonal.
fn standard_errors(z: &[f64], order: &SarimaOrder, coefficients: &Coefficients) -> Vec<f64> {
    let theta = coefficients.flat();
    let k = theta.len();
    if k == 0 {
        return vec![];
    }

    let f = |x: &[f64]| {
        evaluate(z, order, &Coefficients::from_flat(order, x))
            .map(|ll| -ll)
            .unwrap_or(f64::NAN)
    };
    let shifted = |moves: &[(usize, f64)]| {
        let mut x = theta.clone();
        for &(i, delta) in moves {
            x[i] += delta;
        }
        f(&x)
    };

    let h = HESSIAN_STEP;
    let f0 = f(&theta);
    let mut hessian = DMatrix::zeros(k, k);
    for i in 0..k {
        hessian[(i, i)] = (shifted(&[(i, h)]) - 2.0 * f0 + shifted(&[(i, -h)])) / (h * h);
        for j in 0..i {
            let value = (shifted(&[(i, h), (j, h)])
                - shifted(&[(i, h), (j, -h)])
                - shifted(&[(i, -h), (j, h)])
                + shifted(&[(i, -h), (j, -h)]))
                / (4.0 * h * h);
            hessian[(i, j)] = value;
            hessian[(j, i)] = value;
        }
    }

    if !hessian.iter().all(|v| v.is_finite()) {
        return vec![f64::NAN; k];
    }
    match hessian.try_inverse() {
        Some(cov) => (0..k)
            .map(|i| {
                let v = cov[(i, i)];
                if v > 0.0 {
                    v.sqrt()
                } else {
                    f64::NAN
                }
            })
            .collect(),
        None => vec![f64::NAN; k],
    }
}

/// One row of the coefficient table.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientSummary {
    /// Term label, e.g. `ma.L1` or `ma.S.L12`.
    pub name: String,
    pub value: f64,
    pub std_error: f64,
    /// `value / std_error`.
    pub z: f64,
    /// Two-sided normal p-value of `z`.
    pub p_value: f64,
}

/// A fitted SARIMA model. Immutable once built.
#[derive(Debug, Clone)]
pub struct FittedSarima {
    order: SarimaOrder,
    coefficients: Coefficients,
    mean: Option<f64>,
    sigma2: f64,
    loglike: f64,
    aic: f64,
    bic: f64,
    hqic: f64,
    std_errors: Vec<f64>,
    residuals: Vec<f64>,
    standardized_residuals: Vec<f64>,
    converged: bool,
    iterations: usize,
    nobs: usize,
    history: Vec<f64>,
    residual_start: Month,
    end: Month,
    scale: Scale,
    state: DVector<f64>,
    name: Option<String>,
}

impl FittedSarima {
    /// Model order.
    pub fn order(&self) -> SarimaOrder {
        self.order
    }

    /// Non-seasonal AR coefficients `φ`.
    pub fn ar(&self) -> &[f64] {
        &self.coefficients.ar
    }

    /// Non-seasonal MA coefficients `θ`.
    pub fn ma(&self) -> &[f64] {
        &self.coefficients.ma
    }

    /// Seasonal AR coefficients `Φ`.
    pub fn seasonal_ar(&self) -> &[f64] {
        &self.coefficients.sar
    }

    /// Seasonal MA coefficients `Θ`.
    pub fn seasonal_ma(&self) -> &[f64] {
        &self.coefficients.sma
    }

    /// Estimated mean of the (undifferenced) series, if one was fit.
    pub fn mean(&self) -> Option<f64> {
        self.mean
    }

    /// Innovation variance `σ²`.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Maximised log-likelihood.
    pub fn loglike(&self) -> f64 {
        self.loglike
    }

    /// Akaike information criterion.
    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// Bayesian information criterion.
    pub fn bic(&self) -> f64 {
        self.bic
    }

    /// Hannan-Quinn information criterion.
    pub fn hqic(&self) -> f64 {
        self.hqic
    }

    /// Standard errors in `[ar | ma | sar | sma]` order.
    pub fn std_errors(&self) -> &[f64] {
        &self.std_errors
    }

    /// One-step prediction errors on the differenced scale.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Residuals divided by their predicted standard deviation.
    pub fn standardized_residuals(&self) -> &[f64] {
        &self.standardized_residuals
    }

    /// Residuals dated by month, starting after the differencing loss.
    pub fn residual_series(&self) -> MonthlySeries {
        let scale = self.order_scale();
        MonthlySeries::with_scale(self.residual_start, self.residuals.clone(), scale)
    }

    fn order_scale(&self) -> Scale {
        let mut scale = self.scale.clone();
        for _ in 0..self.order.d {
            scale = scale.differenced(1);
        }
        for _ in 0..self.order.cap_d {
            scale = scale.differenced(self.order.s);
        }
        scale
    }

    /// Whether the optimiser met its tolerance.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Optimiser iterations used.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Observations in the likelihood (after differencing).
    pub fn nobs(&self) -> usize {
        self.nobs
    }

    /// Last month of the fitting series.
    pub fn end(&self) -> Month {
        self.end
    }

    /// Scale of the fitting series; forecasts inherit it.
    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    /// Coefficient table with standard errors, z statistics and p-values.
    pub fn coefficient_table(&self) -> Vec<CoefficientSummary> {
        let s = self.order.s;
        let names = (1..=self.order.p)
            .map(|i| format!("ar.L{}", i))
            .chain((1..=self.order.q).map(|i| format!("ma.L{}", i)))
            .chain((1..=self.order.cap_p).map(|i| format!("ar.S.L{}", i * s)))
            .chain((1..=self.order.cap_q).map(|i| format!("ma.S.L{}", i * s)));

        names
            .zip(self.coefficients.flat())
            .zip(&self.std_errors)
            .map(|((name, value), &std_error)| {
                let z = value / std_error;
                CoefficientSummary {
                    name,
                    value,
                    std_error,
                    z,
                    p_value: normal_two_sided_p(z),
                }
            })
            .collect()
    }

    /// Ljung-Box, Jarque-Bera, Durbin-Watson and residual ACF on the
    /// standardized residuals.
    pub fn residual_diagnostics(&self, lags: usize) -> ResidualDiagnostics {
        ResidualDiagnostics::compute(
            &self.standardized_residuals,
            lags,
            self.order.num_coefficients(),
        )
    }

    /// Forecast `horizon` months after the fitting series with two-sided
    /// intervals at confidence `level`.
    ///
    /// Means propagate the filtered state and integrate the differencing;
    /// variances use the ψ-weights of `θ(B)Θ(B^s) / (φ(B)Φ(B^s)(1-B)^d(1-B^s)^D)`.
    pub fn forecast(&self, horizon: usize, level: f64) -> Result<Forecast> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "forecast horizon must be positive".to_string(),
            ));
        }
        if !(level > 0.0 && level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {}",
                level
            )));
        }

        let order = &self.order;
        let ss = self.coefficients.state_space(order);
        let mu = self.mean.unwrap_or(0.0);
        let w: Vec<f64> = project_state(&ss, &self.state, horizon)
            .into_iter()
            .map(|v| v + mu)
            .collect();

        let delta = differencing_polynomial(order.d, order.cap_d, order.s);
        let mean = integrate(&w, &self.history, &delta)?;

        let full_ar = multiply(&self.coefficients.ar_poly(order), &delta);
        let psi = psi_weights(&full_ar, &self.coefficients.ma_poly(order), horizon);
        let z = z_for_level(level);

        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (m, weight) in mean.iter().zip(&psi) {
            cumulative += weight * weight;
            let half_width = z * (self.sigma2 * cumulative).sqrt();
            lower.push(m - half_width);
            upper.push(m + half_width);
        }

        debug!(order = %order, horizon, level, "forecast computed");
        Forecast::from_parts(self.end.succ(), mean, lower, upper, level, self.scale.clone())
    }
}

impl fmt::Display for FittedSarima {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.name.as_deref().unwrap_or("series");
        writeln!(f, "{} fit to {} ({} scale)", self.order, title, self.scale)?;
        writeln!(
            f,
            "nobs {}  loglike {:.3}  sigma2 {:.6}  converged {} ({} iterations)",
            self.nobs, self.loglike, self.sigma2, self.converged, self.iterations
        )?;
        writeln!(
            f,
            "AIC {:.3}  BIC {:.3}  HQIC {:.3}",
            self.aic, self.bic, self.hqic
        )?;
        writeln!(
            f,
            "{:<10} {:>10} {:>10} {:>8} {:>8}",
            "term", "coef", "std err", "z", "P>|z|"
        )?;
        if let Some(mu) = self.mean {
            writeln!(f, "{:<10} {:>10.4}", "mean", mu)?;
        }
        for row in self.coefficient_table() {
            writeln!(
                f,
                "{:<10} {:>10.4} {:>10.4} {:>8.3} {:>8.3}",
                row.name, row.value, row.std_error, row.z, row.p_value
            )?;
        }
        Ok(())
    }
}
