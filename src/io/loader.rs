//! CSV loading for monthly series.

use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::core::{Month, MonthlySeries};
use crate::error::{ForecastError, Result};
use crate::smoothing::interpolate_runs;

/// Which columns to read and which months to keep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    /// Date column header; the first column when `None`.
    pub date_column: Option<String>,
    /// Value column header; the second column when `None`.
    pub value_column: Option<String>,
    /// Inclusive month window to keep.
    pub window: Option<(Month, Month)>,
}

impl LoadOptions {
    pub fn with_date_column(mut self, name: impl Into<String>) -> Self {
        self.date_column = Some(name.into());
        self
    }

    pub fn with_value_column(mut self, name: impl Into<String>) -> Self {
        self.value_column = Some(name.into());
        self
    }

    /// Keep only months in `[from, to]`.
    pub fn with_window(mut self, from: Month, to: Month) -> Self {
        self.window = Some((from, to));
        self
    }
}

/// What the loader found, before any handling of missing values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadReport {
    /// Data rows read from the file.
    pub rows: usize,
    /// Empty or non-numeric value fields in the kept window.
    pub missing_values: usize,
    /// Months of those fields.
    pub missing_months: Vec<Month>,
}

/// A loaded series together with its load report.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSeries {
    pub series: MonthlySeries,
    pub report: LoadReport,
}

impl LoadedSeries {
    /// The series, or `MissingValues` if any value is missing.
    pub fn require_complete(self) -> Result<MonthlySeries> {
        if self.report.missing_values > 0 {
            return Err(ForecastError::MissingValues {
                count: self.report.missing_values,
            });
        }
        Ok(self.series)
    }

    /// Fill interior missing values by linear interpolation.
    ///
    /// Missing values at either end of the series stay missing and remain
    /// in the report.
    pub fn interpolate_missing(self) -> LoadedSeries {
        let mut values = self.series.values().to_vec();
        let flagged: Vec<bool> = values.iter().map(|v| !v.is_finite()).collect();
        interpolate_runs(&mut values, &flagged);

        let series = self.series.derive(self.series.start(), values, self.series.scale().clone());
        let missing_months = series.missing_months();
        info!(
            filled = self.report.missing_values - missing_months.len(),
            remaining = missing_months.len(),
            "interpolated missing values"
        );
        LoadedSeries {
            report: LoadReport {
                rows: self.report.rows,
                missing_values: missing_months.len(),
                missing_months,
            },
            series,
        }
    }
}

/// Load a monthly series from a CSV file with a header row.
///
/// # Errors
/// `Io` if the file cannot be read, plus everything [`read_csv`] reports.
pub fn load_csv(path: impl AsRef<Path>, options: &LoadOptions) -> Result<LoadedSeries> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ForecastError::Io(format!("{}: {}", path.display(), e)))?;
    let loaded = parse_records(reader, options)?;
    info!(
        path = %path.display(),
        rows = loaded.report.rows,
        start = %loaded.series.start(),
        len = loaded.series.len(),
        "loaded series"
    );
    Ok(loaded)
}

/// Load a monthly series from any CSV source with a header row.
///
/// # Errors
/// - `MissingColumn` if a named (or positional) column is absent
/// - `DateParse` for an unparseable date (rows counted from 1 after the header)
/// - `TimestampError` unless dates ascend one month at a time
/// - `InvalidParameter` if the window is not inside the file's range
/// - `EmptyData` for a file without data rows
pub fn read_csv<R: Read>(source: R, options: &LoadOptions) -> Result<LoadedSeries> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);
    parse_records(reader, options)
}

fn column_index(headers: &csv::StringRecord, name: Option<&str>, position: usize) -> Result<usize> {
    match name {
        Some(name) => headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ForecastError::MissingColumn(name.to_string())),
        None if position < headers.len() => Ok(position),
        None => Err(ForecastError::MissingColumn(format!("column {}", position + 1))),
    }
}

fn parse_records<R: Read>(mut reader: csv::Reader<R>, options: &LoadOptions) -> Result<LoadedSeries> {
    let headers = reader.headers()?.clone();
    let date_idx = column_index(&headers, options.date_column.as_deref(), 0)?;
    let value_idx = column_index(&headers, options.value_column.as_deref(), 1)?;
    let name = headers.get(value_idx).unwrap_or_default().to_string();

    let mut pairs: Vec<(Month, f64)> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let date = record.get(date_idx).unwrap_or_default();
        let month: Month = date.parse().map_err(|_| ForecastError::DateParse {
            row,
            value: date.to_string(),
        })?;
        let value = record
            .get(value_idx)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(f64::NAN);
        pairs.push((month, value));
    }
    let rows = pairs.len();

    let mut series = MonthlySeries::from_pairs(&pairs)?.named(name);
    if let Some((from, to)) = options.window {
        series = series.window(from, to)?;
    }

    let missing_months = series.missing_months();
    if !missing_months.is_empty() {
        warn!(
            count = missing_months.len(),
            first = %missing_months[0],
            "missing values in loaded series"
        );
    }

    Ok(LoadedSeries {
        series,
        report: LoadReport {
            rows,
            missing_values: missing_months.len(),
            missing_months,
        },
    })
}
