//! Dated monthly series tagged with the transform state of its values.

use crate::core::month::{month_range, Month};
use crate::error::{ForecastError, Result};
use std::fmt;

/// Which scale a series' values live on.
///
/// Log must precede differencing; `lags` records the differencing steps
/// in the order they were applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scale {
    log: bool,
    lags: Vec<usize>,
}

impl Scale {
    /// Untransformed observations.
    pub fn raw() -> Self {
        Self::default()
    }

    /// Natural log of the observations, undifferenced.
    pub fn log() -> Self {
        Self {
            log: true,
            lags: vec![],
        }
    }

    pub fn is_log(&self) -> bool {
        self.log
    }

    pub fn is_raw(&self) -> bool {
        !self.log && self.lags.is_empty()
    }

    pub fn is_differenced(&self) -> bool {
        !self.lags.is_empty()
    }

    /// Differencing lags applied so far.
    pub fn lags(&self) -> &[usize] {
        &self.lags
    }

    /// Scale after one more differencing step.
    pub fn differenced(&self, lag: usize) -> Self {
        let mut lags = self.lags.clone();
        lags.push(lag);
        Self {
            log: self.log,
            lags,
        }
    }

    /// Same scale with differencing removed (what forecasts integrate back to).
    pub fn undifferenced(&self) -> Self {
        Self {
            log: self.log,
            lags: vec![],
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut label = if self.log { "log".to_string() } else { "raw".to_string() };
        for lag in &self.lags {
            label = format!("diff{}({})", lag, label);
        }
        f.write_str(&label)
    }
}

/// A monthly series: one value per consecutive month starting at `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    name: Option<String>,
    start: Month,
    values: Vec<f64>,
    scale: Scale,
}

impl MonthlySeries {
    /// Create a raw-scale series.
    pub fn new(start: Month, values: Vec<f64>) -> Self {
        Self {
            name: None,
            start,
            values,
            scale: Scale::raw(),
        }
    }

    /// Create a series with an explicit scale tag.
    pub fn with_scale(start: Month, values: Vec<f64>, scale: Scale) -> Self {
        Self {
            name: None,
            start,
            values,
            scale,
        }
    }

    /// Build a series from (month, value) pairs, which must be consecutive.
    pub fn from_pairs(pairs: &[(Month, f64)]) -> Result<Self> {
        let (first, _) = pairs.first().ok_or(ForecastError::EmptyData)?;
        for (i, w) in pairs.windows(2).enumerate() {
            if w[0].0.succ() != w[1].0 {
                return Err(ForecastError::TimestampError(format!(
                    "months must be consecutive: {} followed by {} at position {}",
                    w[0].0,
                    w[1].0,
                    i + 1
                )));
            }
        }
        Ok(Self::new(*first, pairs.iter().map(|(_, v)| *v).collect()))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn start(&self) -> Month {
        self.start
    }

    /// Last month, `None` for an empty series.
    pub fn end(&self) -> Option<Month> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.start.offset(self.values.len() as i64 - 1))
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    /// Months aligned with `values()`.
    pub fn months(&self) -> Vec<Month> {
        month_range(self.start, self.values.len()).collect()
    }

    /// Iterate over (month, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Month, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, &v)| (self.start.offset(i as i64), v))
    }

    /// Position of `month`, if the series covers it.
    pub fn index_of(&self, month: Month) -> Option<usize> {
        let offset = self.start.months_until(month);
        if offset >= 0 && (offset as usize) < self.values.len() {
            Some(offset as usize)
        } else {
            None
        }
    }

    /// Value at `month`, if covered.
    pub fn get(&self, month: Month) -> Option<f64> {
        self.index_of(month).map(|i| self.values[i])
    }

    /// Same dates and name, new values and scale.
    pub(crate) fn derive(&self, start: Month, values: Vec<f64>, scale: Scale) -> Self {
        Self {
            name: self.name.clone(),
            start,
            values,
            scale,
        }
    }

    /// Restrict to the inclusive window `[from, to]`.
    pub fn window(&self, from: Month, to: Month) -> Result<MonthlySeries> {
        if from > to {
            return Err(ForecastError::InvalidParameter(format!(
                "window start {} is after end {}",
                from, to
            )));
        }
        let start = self.index_of(from).ok_or_else(|| {
            ForecastError::InvalidParameter(format!("{} is outside the series", from))
        })?;
        let end = self.index_of(to).ok_or_else(|| {
            ForecastError::InvalidParameter(format!("{} is outside the series", to))
        })?;
        Ok(self.derive(from, self.values[start..=end].to_vec(), self.scale.clone()))
    }

    /// Count of NaN or infinite values.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_finite()).count()
    }

    /// Check if series has missing values (NaN or Inf).
    pub fn has_missing_values(&self) -> bool {
        self.missing_count() > 0
    }

    /// Months whose value is missing.
    pub fn missing_months(&self) -> Vec<Month> {
        self.iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(m, _)| m)
            .collect()
    }
}
