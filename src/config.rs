//! Pipeline configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! horizon = 12
//! level = 0.95
//! outlier_months = ["2020-04", "2020-05"]
//! original_window = ["1993-01", "2022-09"]
//!
//! [order]
//! p = 0
//! d = 1
//! q = 2
//! P = 0
//! D = 1
//! Q = 1
//! s = 12
//!
//! [search]
//! max_p = 3
//! criterion = "bic"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::Month;
use crate::diagnostics::DEFAULT_LAGS;
use crate::error::{ForecastError, Result};
use crate::io::LoadOptions;
use crate::models::sarima::{AutoSarimaConfig, Criterion, SarimaConfig, SarimaOrder};

/// Bounds for the automatic order search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBounds {
    pub max_p: usize,
    pub max_q: usize,
    #[serde(rename = "max_P")]
    pub max_cap_p: usize,
    #[serde(rename = "max_Q")]
    pub max_cap_q: usize,
    /// Stepwise (true) or exhaustive search.
    pub stepwise: bool,
    pub criterion: Criterion,
}

impl Default for SearchBounds {
    fn default() -> Self {
        Self {
            max_p: 2,
            max_q: 2,
            max_cap_p: 1,
            max_cap_q: 1,
            stepwise: true,
            criterion: Criterion::Aic,
        }
    }
}

/// Settings for a full analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Months forecast past the end of the original vintage.
    pub horizon: usize,
    /// Confidence level of forecast intervals and correlogram bands.
    pub level: f64,
    /// Lags shown in the correlogram and used by Ljung–Box.
    pub acf_lags: usize,
    /// Model the natural log of the series.
    pub log_transform: bool,
    /// Date column header; first column when absent.
    pub date_column: Option<String>,
    /// Value column header; second column when absent.
    pub value_column: Option<String>,
    /// Inclusive month window of the original vintage.
    pub original_window: Option<(Month, Month)>,
    /// Inclusive month window of the updated vintage.
    pub updated_window: Option<(Month, Month)>,
    /// Fill interior missing values instead of halting on them.
    pub interpolate_missing: bool,
    /// Months smoothed for the sensitivity rerun; empty skips it.
    pub outlier_months: Vec<Month>,
    /// AIC reduction a sensitivity fit needs to count as an improvement.
    pub aic_margin: f64,
    /// Optimiser iteration cap for every fit.
    pub max_iter: usize,
    /// Estimate a mean for orders without differencing.
    pub include_mean: bool,
    /// Orders fit to both the original and the smoothed vintage.
    pub order: SarimaOrder,
    pub search: SearchBounds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon: 12,
            level: 0.95,
            acf_lags: DEFAULT_LAGS,
            log_transform: true,
            date_column: None,
            value_column: None,
            original_window: None,
            updated_window: None,
            interpolate_missing: false,
            // April and May 2020 plant shutdowns
            outlier_months: [4, 5]
                .into_iter()
                .filter_map(|m| Month::new(2020, m).ok())
                .collect(),
            aic_margin: 2.0,
            max_iter: 3000,
            include_mean: true,
            order: SarimaOrder::new(0, 1, 2, 0, 1, 1, 12),
            search: SearchBounds::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ForecastError::Config(format!("failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ForecastError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ForecastError::Config(format!("failed to serialise: {}", e)))
    }

    /// Check values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.order.validate()?;
        if self.horizon == 0 {
            return Err(ForecastError::Config("horizon must be positive".to_string()));
        }
        if !(self.level > 0.0 && self.level < 1.0) {
            return Err(ForecastError::Config(format!(
                "level must be in (0, 1), got {}",
                self.level
            )));
        }
        if self.acf_lags == 0 {
            return Err(ForecastError::Config("acf_lags must be positive".to_string()));
        }
        if !self.aic_margin.is_finite() || self.aic_margin < 0.0 {
            return Err(ForecastError::Config(format!(
                "aic_margin must be non-negative, got {}",
                self.aic_margin
            )));
        }
        for (from, to) in [self.original_window, self.updated_window].into_iter().flatten() {
            if from > to {
                return Err(ForecastError::Config(format!(
                    "window start {} is after end {}",
                    from, to
                )));
            }
        }
        Ok(())
    }

    pub fn with_order(mut self, order: SarimaOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_level(mut self, level: f64) -> Self {
        self.level = level;
        self
    }

    pub fn with_acf_lags(mut self, lags: usize) -> Self {
        self.acf_lags = lags;
        self
    }

    pub fn with_log_transform(mut self, log: bool) -> Self {
        self.log_transform = log;
        self
    }

    /// Name the date and value columns.
    pub fn with_columns(mut self, date: impl Into<String>, value: impl Into<String>) -> Self {
        self.date_column = Some(date.into());
        self.value_column = Some(value.into());
        self
    }

    pub fn with_original_window(mut self, from: Month, to: Month) -> Self {
        self.original_window = Some((from, to));
        self
    }

    pub fn with_updated_window(mut self, from: Month, to: Month) -> Self {
        self.updated_window = Some((from, to));
        self
    }

    pub fn with_interpolate_missing(mut self, interpolate: bool) -> Self {
        self.interpolate_missing = interpolate;
        self
    }

    pub fn with_outlier_months(mut self, months: Vec<Month>) -> Self {
        self.outlier_months = months;
        self
    }

    pub fn with_aic_margin(mut self, margin: f64) -> Self {
        self.aic_margin = margin;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_mean(mut self, include_mean: bool) -> Self {
        self.include_mean = include_mean;
        self
    }

    pub fn with_search(mut self, search: SearchBounds) -> Self {
        self.search = search;
        self
    }

    /// Loader options for a vintage with the given window.
    pub fn load_options(&self, window: Option<(Month, Month)>) -> LoadOptions {
        LoadOptions {
            date_column: self.date_column.clone(),
            value_column: self.value_column.clone(),
            window,
        }
    }

    /// Estimation settings for the configured order.
    pub fn sarima_config(&self) -> SarimaConfig {
        SarimaConfig::default()
            .with_order(self.order)
            .with_mean(self.include_mean)
            .with_max_iter(self.max_iter)
    }

    /// Search settings; differencing is fixed to the configured order's
    /// `d` and `D` so that scores are comparable with the fixed fit.
    pub fn auto_config(&self) -> AutoSarimaConfig {
        let mut config = AutoSarimaConfig::default()
            .with_max_orders(self.search.max_p, self.search.max_q)
            .with_seasonal_orders(self.search.max_cap_p, self.search.max_cap_q)
            .with_seasonal_period(self.order.s)
            .with_differencing(self.order.d, self.order.cap_d)
            .with_criterion(self.search.criterion)
            .with_estimation(
                SarimaConfig::default()
                    .with_mean(self.include_mean)
                    .with_max_iter(self.max_iter),
            );
        if !self.search.stepwise {
            config = config.exhaustive();
        }
        config
    }
}
