//! End-to-end analysis of two data vintages.
//!
//! The original vintage is transformed, diagnosed, fit and forecast, with
//! the automatic order search reported beside the configured order. The
//! forecast is compared with the updated vintage. Finally the flagged
//! outlier months of the original vintage are smoothed and the model is
//! refit to see whether the fit improves.

use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::compare::{compare, Comparison};
use crate::config::PipelineConfig;
use crate::core::{Forecast, Month, MonthlySeries};
use crate::diagnostics::Correlogram;
use crate::error::{ForecastError, Result};
use crate::io::load_csv;
use crate::models::sarima::{AutoSarima, CoefficientSummary, FittedSarima, Sarima, SarimaOrder};
use crate::smoothing::smooth_months;
use crate::validation::{test_stationarity, ResidualDiagnostics, StationarityReport};

/// Where a fit attempt's order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitSource {
    /// The configured order.
    Fixed,
    /// The automatic order search.
    Automatic,
}

impl fmt::Display for FitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitSource::Fixed => f.write_str("fixed"),
            FitSource::Automatic => f.write_str("automatic"),
        }
    }
}

/// Record of one model fit, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct FitAttempt {
    pub source: FitSource,
    /// Order tried; for a failed search, the configured order.
    pub order: SarimaOrder,
    pub aic: Option<f64>,
    pub error: Option<String>,
    /// Candidates fitted by an automatic search.
    pub candidates: usize,
    /// Estimated coefficients; empty for a failed fit.
    pub coefficients: Vec<CoefficientSummary>,
    /// Residual checks of a successful fit.
    pub diagnostics: Option<ResidualDiagnostics>,
}

impl FitAttempt {
    fn success(source: FitSource, fit: &FittedSarima, candidates: usize, lags: usize) -> Self {
        Self {
            source,
            order: fit.order(),
            aic: Some(fit.aic()),
            error: None,
            candidates,
            coefficients: fit.coefficient_table(),
            diagnostics: Some(fit.residual_diagnostics(lags)),
        }
    }

    fn failure(source: FitSource, order: SarimaOrder, error: &ForecastError) -> Self {
        Self {
            source,
            order,
            aic: None,
            error: Some(error.to_string()),
            candidates: 0,
            coefficients: Vec::new(),
            diagnostics: None,
        }
    }

    /// Coefficients and residual checks, one item per line.
    fn write_details(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.coefficients {
            writeln!(
                f,
                "  {:<10} {:>10.4} {:>10.4} {:>8.3}",
                row.name, row.value, row.std_error, row.p_value
            )?;
        }
        if let Some(diagnostics) = &self.diagnostics {
            for line in diagnostics.to_string().lines() {
                writeln!(f, "  {}", line)?;
            }
        }
        Ok(())
    }

    pub fn succeeded(&self) -> bool {
        self.aic.is_some()
    }
}

impl fmt::Display for FitAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<9} {}", self.source.to_string(), self.order)?;
        match (&self.aic, &self.error) {
            (Some(aic), _) => write!(f, "  AIC {:.3}", aic)?,
            (None, Some(err)) => write!(f, "  failed: {}", err)?,
            (None, None) => {}
        }
        if self.candidates > 0 {
            write!(f, "  ({} candidates)", self.candidates)?;
        }
        Ok(())
    }
}

/// One month replaced by the smoother.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Replacement {
    pub month: Month,
    pub before: f64,
    pub after: f64,
}

/// Outcome of the sensitivity rerun.
#[derive(Debug, Clone, PartialEq)]
pub enum SensitivityVerdict {
    /// A refit beat the baseline AIC by at least the margin.
    Improved {
        source: FitSource,
        order: SarimaOrder,
        aic: f64,
        baseline_aic: f64,
    },
    /// No refit beat the baseline by the margin.
    Inconclusive {
        best_aic: Option<f64>,
        baseline_aic: f64,
    },
}

impl fmt::Display for SensitivityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensitivityVerdict::Improved {
                source,
                order,
                aic,
                baseline_aic,
            } => write!(
                f,
                "improved: {} {} AIC {:.3} vs baseline {:.3}",
                source, order, aic, baseline_aic
            ),
            SensitivityVerdict::Inconclusive {
                best_aic: Some(best),
                baseline_aic,
            } => write!(
                f,
                "inconclusive: best AIC {:.3} vs baseline {:.3}",
                best, baseline_aic
            ),
            SensitivityVerdict::Inconclusive {
                best_aic: None,
                baseline_aic,
            } => write!(f, "inconclusive: no refit succeeded (baseline AIC {:.3})", baseline_aic),
        }
    }
}

/// Refits on the smoothed original vintage.
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityAnalysis {
    pub replacements: Vec<Replacement>,
    /// Same orders as the baseline.
    pub same_order: FitAttempt,
    /// Automatic search on the smoothed series.
    pub automatic: FitAttempt,
    pub verdict: SensitivityVerdict,
}

/// Short description of a loaded vintage.
#[derive(Debug, Clone, PartialEq)]
pub struct VintageSummary {
    pub name: Option<String>,
    pub start: Month,
    pub end: Month,
    pub len: usize,
}

impl VintageSummary {
    fn of(series: &MonthlySeries) -> Result<Self> {
        Ok(Self {
            name: series.name().map(str::to_string),
            start: series.start(),
            end: series.end().ok_or(ForecastError::EmptyData)?,
            len: series.len(),
        })
    }
}

impl fmt::Display for VintageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} .. {} ({} months)",
            self.name.as_deref().unwrap_or("series"),
            self.start,
            self.end,
            self.len
        )
    }
}

/// Everything one analysis run produces.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub original: VintageSummary,
    pub updated: VintageSummary,
    /// Correlogram of the differenced modelling series.
    pub correlogram: Correlogram,
    pub stationarity: StationarityReport,
    /// Fixed-order fit followed by the automatic search, both on the
    /// original vintage.
    pub attempts: Vec<FitAttempt>,
    pub fit: FittedSarima,
    pub residuals: ResidualDiagnostics,
    /// Forecast in raw units.
    pub forecast: Forecast,
    pub comparison: Comparison,
    pub sensitivity: Option<SensitivityAnalysis>,
}

impl AnalysisReport {
    /// Successful baseline attempt with the lowest AIC.
    pub fn best_attempt(&self) -> Option<&FitAttempt> {
        self.attempts
            .iter()
            .filter_map(|a| a.aic.map(|aic| (a, aic)))
            .min_by(|x, y| x.1.total_cmp(&y.1))
            .map(|(a, _)| a)
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== Data")?;
        writeln!(f, "original: {}", self.original)?;
        writeln!(f, "updated:  {}", self.updated)?;
        writeln!(f)?;
        writeln!(f, "== Diagnostics of the differenced series")?;
        writeln!(f, "{}", self.stationarity)?;
        writeln!(
            f,
            "significant ACF lags {:?}; PACF lags {:?}",
            self.correlogram.significant_acf_lags(),
            self.correlogram.significant_pacf_lags()
        )?;
        write!(f, "{}", self.correlogram)?;
        writeln!(f)?;
        writeln!(f, "== Fit attempts")?;
        for attempt in &self.attempts {
            writeln!(f, "{}", attempt)?;
            if attempt.source == FitSource::Automatic {
                attempt.write_details(f)?;
            }
        }
        if let Some(best) = self.best_attempt() {
            writeln!(f, "lowest AIC: {} {}", best.source, best.order)?;
        }
        writeln!(f)?;
        writeln!(f, "== Model")?;
        write!(f, "{}", self.fit)?;
        writeln!(f, "{}", self.residuals)?;
        writeln!(f)?;
        writeln!(
            f,
            "== Forecast vs updated vintage ({:.0}% intervals)",
            self.forecast.level() * 100.0
        )?;
        writeln!(f, "{}", self.comparison)?;
        if let Some(s) = &self.sensitivity {
            writeln!(f)?;
            writeln!(f, "== Sensitivity: smoothed outliers")?;
            for r in &s.replacements {
                writeln!(f, "{}  {:.4} -> {:.4}", r.month, r.before, r.after)?;
            }
            for attempt in [&s.same_order, &s.automatic] {
                writeln!(f, "{}", attempt)?;
                attempt.write_details(f)?;
            }
            writeln!(f, "{}", s.verdict)?;
        }
        Ok(())
    }
}

/// Runs the full analysis with one configuration.
///
/// # Example
///
/// ```no_run
/// use autoprod_forecast::config::PipelineConfig;
/// use autoprod_forecast::pipeline::Pipeline;
///
/// let report = Pipeline::new(PipelineConfig::default())
///     .run("data/production_2022.csv", "data/production_2023.csv")
///     .unwrap();
/// println!("{}", report);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load one vintage, applying the configured missing-value policy.
    pub fn load(&self, path: impl AsRef<Path>, window: Option<(Month, Month)>) -> Result<MonthlySeries> {
        let loaded = load_csv(path, &self.config.load_options(window))?;
        if self.config.interpolate_missing {
            loaded.interpolate_missing().require_complete()
        } else {
            loaded.require_complete()
        }
    }

    /// Load both vintages and analyse them.
    pub fn run(&self, original: impl AsRef<Path>, updated: impl AsRef<Path>) -> Result<AnalysisReport> {
        self.config.validate()?;
        let original = self.load(original, self.config.original_window)?;
        let updated = self.load(updated, self.config.updated_window)?;
        self.run_series(&original, &updated)
    }

    /// Analyse already loaded vintages (raw units, no missing values).
    pub fn run_series(&self, original: &MonthlySeries, updated: &MonthlySeries) -> Result<AnalysisReport> {
        let config = &self.config;
        config.validate()?;

        let modelling = self.modelling_scale(original)?;
        let stationary = self.differenced(&modelling)?;
        info!(len = stationary.len(), scale = %stationary.scale(), "computing diagnostics");
        let lags = config.acf_lags.min(stationary.len().saturating_sub(1));
        let correlogram = Correlogram::compute(&stationary, lags, config.level)?;
        let stationarity = test_stationarity(stationary.values());
        debug!(verdict = %stationarity.verdict, "stationarity tests");

        let lags = lags.max(1);
        let mut attempts = Vec::new();
        let fit = self.fit_baseline(&modelling, lags, &mut attempts)?;
        let residuals = fit.residual_diagnostics(lags);

        info!(horizon = config.horizon, "forecasting");
        let forecast = fit.forecast(config.horizon, config.level)?.to_raw_scale()?;
        let comparison = compare(&forecast, updated)?;
        if let Some(summary) = comparison.summary() {
            info!(
                months = comparison.rows().len(),
                defined = summary.count,
                mape = summary.mape,
                "compared forecast with updated vintage"
            );
        }

        let sensitivity = if config.outlier_months.is_empty() {
            None
        } else {
            Some(self.sensitivity(original, fit.aic(), lags)?)
        };

        Ok(AnalysisReport {
            original: VintageSummary::of(original)?,
            updated: VintageSummary::of(updated)?,
            correlogram,
            stationarity,
            attempts,
            fit,
            residuals,
            forecast,
            comparison,
            sensitivity,
        })
    }

    fn modelling_scale(&self, series: &MonthlySeries) -> Result<MonthlySeries> {
        if self.config.log_transform {
            series.log()
        } else {
            Ok(series.clone())
        }
    }

    /// The series after the configured order's differencing.
    fn differenced(&self, series: &MonthlySeries) -> Result<MonthlySeries> {
        let order = &self.config.order;
        let mut out = series.clone();
        for _ in 0..order.d {
            out = out.difference(1)?;
        }
        for _ in 0..order.cap_d {
            out = out.difference(order.s)?;
        }
        Ok(out)
    }

    /// Fit the configured order and run the automatic search beside it.
    ///
    /// The fixed fit is kept unless it fails to converge, in which case the
    /// search's choice is used. Any other fixed-fit error is returned.
    fn fit_baseline(
        &self,
        series: &MonthlySeries,
        lags: usize,
        attempts: &mut Vec<FitAttempt>,
    ) -> Result<FittedSarima> {
        let order = self.config.order;
        let fixed = match Sarima::with_config(self.config.sarima_config()).fit(series) {
            Ok(fit) => {
                debug!(order = %order, aic = fit.aic(), "fixed order fitted");
                attempts.push(FitAttempt::success(FitSource::Fixed, &fit, 0, lags));
                Some(fit)
            }
            Err(err @ ForecastError::ConvergenceFailure { .. }) => {
                warn!(order = %order, error = %err, "fixed order failed, falling back to automatic search");
                attempts.push(FitAttempt::failure(FitSource::Fixed, order, &err));
                None
            }
            Err(err) => return Err(err),
        };

        let searched = match AutoSarima::with_config(self.config.auto_config()).fit(series) {
            Ok(result) => {
                let candidates = result.candidates.len();
                info!(order = %result.best.order(), aic = result.best.aic(), candidates, "automatic search finished");
                attempts.push(FitAttempt::success(FitSource::Automatic, &result.best, candidates, lags));
                Ok(result.best)
            }
            Err(err) => {
                warn!(error = %err, "automatic search failed");
                attempts.push(FitAttempt::failure(FitSource::Automatic, order, &err));
                Err(err)
            }
        };

        match fixed {
            Some(fit) => Ok(fit),
            None => searched,
        }
    }

    /// Smooth the outlier months of `original` and refit.
    fn sensitivity(&self, original: &MonthlySeries, baseline_aic: f64, lags: usize) -> Result<SensitivityAnalysis> {
        let config = &self.config;
        let smoothed = smooth_months(original, &config.outlier_months)?;
        let replacements = config
            .outlier_months
            .iter()
            .filter_map(|&month| {
                Some(Replacement {
                    month,
                    before: original.get(month)?,
                    after: smoothed.get(month)?,
                })
            })
            .collect();
        info!(months = config.outlier_months.len(), "refitting smoothed series");

        let modelling = self.modelling_scale(&smoothed)?;
        let same_order = match Sarima::with_config(config.sarima_config()).fit(&modelling) {
            Ok(fit) => FitAttempt::success(FitSource::Fixed, &fit, 0, lags),
            Err(err) => {
                warn!(error = %err, "refit with fixed order failed");
                FitAttempt::failure(FitSource::Fixed, config.order, &err)
            }
        };
        let automatic = match AutoSarima::with_config(config.auto_config()).fit(&modelling) {
            Ok(result) => {
                FitAttempt::success(FitSource::Automatic, &result.best, result.candidates.len(), lags)
            }
            Err(err) => {
                warn!(error = %err, "automatic search on smoothed series failed");
                FitAttempt::failure(FitSource::Automatic, config.order, &err)
            }
        };

        let verdict = sensitivity_verdict(&[&same_order, &automatic], baseline_aic, config.aic_margin);
        info!(verdict = %verdict, "sensitivity analysis");
        Ok(SensitivityAnalysis {
            replacements,
            same_order,
            automatic,
            verdict,
        })
    }
}

/// Best successful attempt, improved if its AIC is at least `margin` below the baseline.
fn sensitivity_verdict(attempts: &[&FitAttempt], baseline_aic: f64, margin: f64) -> SensitivityVerdict {
    let best = attempts
        .iter()
        .filter_map(|a| a.aic.map(|aic| (*a, aic)))
        .min_by(|x, y| x.1.total_cmp(&y.1));

    match best {
        Some((attempt, aic)) if aic <= baseline_aic - margin => SensitivityVerdict::Improved {
            source: attempt.source,
            order: attempt.order,
            aic,
            baseline_aic,
        },
        best => SensitivityVerdict::Inconclusive {
            best_aic: best.map(|(_, aic)| aic),
            baseline_aic,
        },
    }
}
