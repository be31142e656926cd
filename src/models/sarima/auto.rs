//! Automatic SARIMA order selection.
//!
//! Differencing orders are fixed before the search (either given or
//! suggested from variance heuristics) so that every candidate's
//! information criterion is computed on the same observations.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::MonthlySeries;
use crate::error::{ForecastError, Result};
use crate::models::sarima::model::{FittedSarima, Sarima, SarimaConfig};
use crate::models::sarima::order::SarimaOrder;
use crate::transform::{difference, seasonal_difference};
use crate::utils::stats::variance;

/// Information criterion used to rank candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    #[default]
    Aic,
    Bic,
}

impl Criterion {
    fn score(&self, fit: &FittedSarima) -> f64 {
        match self {
            Criterion::Aic => fit.aic(),
            Criterion::Bic => fit.bic(),
        }
    }
}

/// How the search chooses `d` and `D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Differencing {
    /// Use these orders for every candidate.
    Fixed { d: usize, cap_d: usize },
    /// Pick orders from the data, up to these maxima.
    Suggest { max_d: usize, max_cap_d: usize },
}

/// Configuration for AutoSarima.
#[derive(Debug, Clone)]
pub struct AutoSarimaConfig {
    /// Maximum non-seasonal AR order to consider.
    pub max_p: usize,
    /// Maximum non-seasonal MA order to consider.
    pub max_q: usize,
    /// Maximum seasonal AR order.
    pub max_cap_p: usize,
    /// Maximum seasonal MA order.
    pub max_cap_q: usize,
    /// Seasonal period (0 for non-seasonal).
    pub seasonal_period: usize,
    /// Differencing policy.
    pub differencing: Differencing,
    /// Use stepwise search (faster) vs exhaustive.
    pub stepwise: bool,
    /// Selection criterion.
    pub criterion: Criterion,
    /// Upper bound on candidates fitted.
    pub max_models: usize,
    /// Estimation settings shared by all candidates; the order is overwritten.
    pub estimation: SarimaConfig,
}

impl Default for AutoSarimaConfig {
    fn default() -> Self {
        Self {
            max_p: 2,
            max_q: 2,
            max_cap_p: 1,
            max_cap_q: 1,
            seasonal_period: 12,
            differencing: Differencing::Suggest {
                max_d: 2,
                max_cap_d: 1,
            },
            stepwise: true,
            criterion: Criterion::Aic,
            max_models: 60,
            estimation: SarimaConfig::default(),
        }
    }
}

impl AutoSarimaConfig {
    /// Set maximum non-seasonal orders.
    pub fn with_max_orders(mut self, max_p: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_q = max_q;
        self
    }

    /// Set maximum seasonal orders.
    pub fn with_seasonal_orders(mut self, max_cap_p: usize, max_cap_q: usize) -> Self {
        self.max_cap_p = max_cap_p;
        self.max_cap_q = max_cap_q;
        self
    }

    /// Set seasonal period.
    pub fn with_seasonal_period(mut self, period: usize) -> Self {
        self.seasonal_period = period;
        self
    }

    /// Fix `d` and `D` for every candidate.
    pub fn with_differencing(mut self, d: usize, cap_d: usize) -> Self {
        self.differencing = Differencing::Fixed { d, cap_d };
        self
    }

    /// Set the selection criterion.
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Use exhaustive search instead of stepwise.
    pub fn exhaustive(mut self) -> Self {
        self.stepwise = false;
        self
    }

    /// Set the estimation settings shared by all candidates.
    pub fn with_estimation(mut self, estimation: SarimaConfig) -> Self {
        self.estimation = estimation;
        self
    }
}

/// Outcome of fitting one candidate order.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub order: SarimaOrder,
    /// Criterion value, `None` if the fit failed.
    pub score: Option<f64>,
    /// Why the fit failed, if it did.
    pub error: Option<String>,
}

/// Result of an automatic search.
#[derive(Debug, Clone)]
pub struct AutoSarimaResult {
    /// Best candidate by the configured criterion.
    pub best: FittedSarima,
    /// Every candidate tried, in evaluation order.
    pub candidates: Vec<CandidateScore>,
    /// Criterion used for ranking.
    pub criterion: Criterion,
}

impl AutoSarimaResult {
    /// Number of candidates that produced a score.
    pub fn fitted_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.score.is_some()).count()
    }
}

/// Automatic SARIMA order selection.
///
/// The stepwise search starts from `(2,d,2)(1,D,1)`, `(0,d,0)(0,D,0)`,
/// `(1,d,0)(1,D,0)` and `(0,d,1)(0,D,1)` and moves to the best neighbour
/// (each of `p, q, P, Q` and the pairs `(p, q)`, `(P, Q)` changed by one)
/// until no neighbour improves the criterion.
#[derive(Debug, Clone, Default)]
pub struct AutoSarima {
    config: AutoSarimaConfig,
}

impl AutoSarima {
    /// Create AutoSarima with custom configuration.
    pub fn with_config(config: AutoSarimaConfig) -> Self {
        Self { config }
    }

    /// Create AutoSarima with seasonal period.
    pub fn seasonal(period: usize) -> Self {
        Self::with_config(AutoSarimaConfig::default().with_seasonal_period(period))
    }

    /// Search configuration.
    pub fn config(&self) -> &AutoSarimaConfig {
        &self.config
    }

    /// Differencing orders that will be used for `values`.
    pub fn differencing_orders(&self, values: &[f64]) -> (usize, usize) {
        let s = self.config.seasonal_period;
        match self.config.differencing {
            Differencing::Fixed { d, cap_d } => (d, if s > 1 { cap_d } else { 0 }),
            Differencing::Suggest { max_d, max_cap_d } => {
                let cap_d = if s > 1 {
                    suggest_seasonal_differencing(values, s).min(max_cap_d)
                } else {
                    0
                };
                let seasonal = seasonal_difference(values, cap_d, s);
                (suggest_differencing(&seasonal).min(max_d), cap_d)
            }
        }
    }

    /// Fit every candidate the search visits and return the best.
    ///
    /// # Errors
    /// `InsufficientData` for fewer than three seasonal cycles (ten points
    /// without seasonality); `ConvergenceFailure` if no candidate fits.
    pub fn fit(&self, series: &MonthlySeries) -> Result<AutoSarimaResult> {
        let s = self.config.seasonal_period;
        let min_required = if s > 1 { 3 * s } else { 10 };
        if series.len() < min_required {
            return Err(ForecastError::InsufficientData {
                needed: min_required,
                got: series.len(),
            });
        }

        let (d, cap_d) = self.differencing_orders(series.values());
        info!(d, cap_d, stepwise = self.config.stepwise, "starting automatic order search");

        let mut search = Search {
            auto: self,
            series,
            candidates: Vec::new(),
            best: None,
        };

        if self.config.stepwise {
            search.stepwise(d, cap_d);
        } else {
            for order in self.exhaustive_candidates(d, cap_d) {
                search.evaluate(order);
            }
        }

        let Search {
            candidates, best, ..
        } = search;
        let (best, score) = best.ok_or_else(|| ForecastError::ConvergenceFailure {
            order: format!("automatic search over {} candidates", candidates.len()),
            iterations: candidates.len(),
        })?;

        info!(order = %best.order(), score, candidates = candidates.len(), "automatic search selected");
        Ok(AutoSarimaResult {
            best,
            candidates,
            criterion: self.config.criterion,
        })
    }

    fn order(&self, p: usize, d: usize, q: usize, cap_p: usize, cap_d: usize, cap_q: usize) -> SarimaOrder {
        let s = self.config.seasonal_period;
        if s > 1 {
            SarimaOrder::new(p, d, q, cap_p, cap_d, cap_q, s)
        } else {
            SarimaOrder::arima(p, d, q)
        }
    }

    fn within_bounds(&self, order: &SarimaOrder) -> bool {
        order.p <= self.config.max_p
            && order.q <= self.config.max_q
            && order.cap_p <= self.config.max_cap_p
            && order.cap_q <= self.config.max_cap_q
    }

    fn starting_candidates(&self, d: usize, cap_d: usize) -> Vec<SarimaOrder> {
        let cfg = &self.config;
        let starts = [
            (2.min(cfg.max_p), 2.min(cfg.max_q), 1.min(cfg.max_cap_p), 1.min(cfg.max_cap_q)),
            (0, 0, 0, 0),
            (1.min(cfg.max_p), 0, 1.min(cfg.max_cap_p), 0),
            (0, 1.min(cfg.max_q), 0, 1.min(cfg.max_cap_q)),
        ];
        let mut orders: Vec<SarimaOrder> = Vec::new();
        for (p, q, cap_p, cap_q) in starts {
            let order = self.order(p, d, q, cap_p, cap_d, cap_q);
            if !orders.contains(&order) {
                orders.push(order);
            }
        }
        orders
    }

    fn neighbours(&self, order: &SarimaOrder) -> Vec<SarimaOrder> {
        let moves: [(i64, i64, i64, i64); 12] = [
            (1, 0, 0, 0),
            (-1, 0, 0, 0),
            (0, 1, 0, 0),
            (0, -1, 0, 0),
            (0, 0, 1, 0),
            (0, 0, -1, 0),
            (0, 0, 0, 1),
            (0, 0, 0, -1),
            (1, 1, 0, 0),
            (-1, -1, 0, 0),
            (0, 0, 1, 1),
            (0, 0, -1, -1),
        ];
        let shift = |v: usize, by: i64| -> Option<usize> { usize::try_from(v as i64 + by).ok() };

        moves
            .iter()
            .filter_map(|&(dp, dq, dcp, dcq)| {
                let p = shift(order.p, dp)?;
                let q = shift(order.q, dq)?;
                let cap_p = shift(order.cap_p, dcp)?;
                let cap_q = shift(order.cap_q, dcq)?;
                let candidate = self.order(p, order.d, q, cap_p, order.cap_d, cap_q);
                (candidate != *order && self.within_bounds(&candidate)).then_some(candidate)
            })
            .collect()
    }

    /// Generate all candidate orders (exhaustive).
    fn exhaustive_candidates(&self, d: usize, cap_d: usize) -> Vec<SarimaOrder> {
        let cfg = &self.config;
        let (max_cap_p, max_cap_q) = if cfg.seasonal_period > 1 {
            (cfg.max_cap_p, cfg.max_cap_q)
        } else {
            (0, 0)
        };
        let mut candidates = Vec::new();
        for p in 0..=cfg.max_p {
            for q in 0..=cfg.max_q {
                for cap_p in 0..=max_cap_p {
                    for cap_q in 0..=max_cap_q {
                        candidates.push(self.order(p, d, q, cap_p, cap_d, cap_q));
                    }
                }
            }
        }
        candidates
    }
}

/// Mutable state of one search run.
struct Search<'a> {
    auto: &'a AutoSarima,
    series: &'a MonthlySeries,
    candidates: Vec<CandidateScore>,
    best: Option<(FittedSarima, f64)>,
}

impl Search<'_> {
    fn visited(&self, order: &SarimaOrder) -> bool {
        self.candidates.iter().any(|c| c.order == *order)
    }

    fn budget_left(&self) -> bool {
        self.candidates.len() < self.auto.config.max_models
    }

    /// Fit `order`, record it, and return true if it became the best.
    fn evaluate(&mut self, order: SarimaOrder) -> bool {
        if self.visited(&order) || !self.budget_left() {
            return false;
        }

        let estimation = self.auto.config.estimation.clone().with_order(order);
        match Sarima::with_config(estimation).fit(self.series) {
            Ok(fit) => {
                let score = self.auto.config.criterion.score(&fit);
                debug!(order = %order, score, "candidate fitted");
                if !score.is_finite() {
                    self.candidates.push(CandidateScore {
                        order,
                        score: None,
                        error: Some("non-finite criterion".to_string()),
                    });
                    return false;
                }
                self.candidates.push(CandidateScore {
                    order,
                    score: Some(score),
                    error: None,
                });
                let improves = self.best.as_ref().map_or(true, |(_, b)| score < *b);
                if improves {
                    self.best = Some((fit, score));
                }
                improves
            }
            Err(err) => {
                debug!(order = %order, error = %err, "candidate failed");
                self.candidates.push(CandidateScore {
                    order,
                    score: None,
                    error: Some(err.to_string()),
                });
                false
            }
        }
    }

    fn stepwise(&mut self, d: usize, cap_d: usize) {
        for order in self.auto.starting_candidates(d, cap_d) {
            self.evaluate(order);
        }

        loop {
            let Some(current) = self.best.as_ref().map(|(fit, _)| fit.order()) else {
                return;
            };
            let mut improved = false;
            for order in self.auto.neighbours(&current) {
                if self.evaluate(order) {
                    improved = true;
                    break;
                }
            }
            if !improved || !self.budget_left() {
                return;
            }
        }
    }
}

/// Suggest non-seasonal differencing order from variance reduction.
pub fn suggest_differencing(series: &[f64]) -> usize {
    if series.len() < 3 {
        return 0;
    }

    let var_0 = variance(series);
    let diff_1 = difference(series, 1);
    if diff_1.len() < 2 {
        return 0;
    }
    let var_1 = variance(&diff_1);

    // Difference when it removes a meaningful share of the variance
    if var_0 > 0.0 && var_1 / var_0 < 0.9 {
        let diff_2 = difference(&diff_1, 1);
        if diff_2.len() >= 2 {
            let var_2 = variance(&diff_2);
            if var_2 / var_1 < 0.9 && var_2 < var_0 {
                return 2;
            }
        }
        return 1;
    }

    0
}

/// Suggest seasonal differencing order from variance reduction at `period`.
pub fn suggest_seasonal_differencing(values: &[f64], period: usize) -> usize {
    if period < 2 || values.len() < 2 * period {
        return 0;
    }

    let seasonal_diffs = seasonal_difference(values, 1, period);
    if variance(&seasonal_diffs) < variance(values) * 0.7 {
        1
    } else {
        0
    }
}
