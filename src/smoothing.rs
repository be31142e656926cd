//! Outlier smoothing by linear interpolation.
//!
//! Flagged positions are replaced by the straight line between the nearest
//! unflagged neighbours on either side, so a run of adjacent flagged months
//! is bridged as a whole. Every index is validated before any value is
//! replaced.

use tracing::debug;

use crate::core::{Month, MonthlySeries};
use crate::error::{ForecastError, Result};

/// Replace flagged positions by linear interpolation between their unflagged
/// neighbours. Runs touching either end of the slice are left untouched.
pub(crate) fn interpolate_runs(values: &mut [f64], flagged: &[bool]) {
    let n = values.len().min(flagged.len());
    let mut i = 0;
    while i < n {
        if !flagged[i] {
            i += 1;
            continue;
        }
        let start = i;
        while i < n && flagged[i] {
            i += 1;
        }
        let end = i;
        if start == 0 || end == n {
            continue;
        }

        let left = values[start - 1];
        let right = values[end];
        let segments = (end - start + 1) as f64;
        for (j, idx) in (start..end).enumerate() {
            let t = (j + 1) as f64 / segments;
            values[idx] = left + t * (right - left);
        }
    }
}

/// Smooth the values at `indices` (positions in `series`).
///
/// # Errors
/// `IndexOutOfBounds` for an index past the end, `BoundaryIndex` for the
/// first or last position. The input is never partially modified.
///
/// # Example
///
/// ```
/// use autoprod_forecast::core::{Month, MonthlySeries};
/// use autoprod_forecast::smoothing::smooth_indices;
///
/// let series = MonthlySeries::new(Month::new(2020, 1).unwrap(), vec![10.0, 2.0, 14.0]);
/// let smoothed = smooth_indices(&series, &[1]).unwrap();
/// assert_eq!(smoothed.values(), &[10.0, 12.0, 14.0]);
/// ```
pub fn smooth_indices(series: &MonthlySeries, indices: &[usize]) -> Result<MonthlySeries> {
    let n = series.len();
    for &index in indices {
        if index >= n {
            return Err(ForecastError::IndexOutOfBounds { index, size: n });
        }
        if index == 0 || index == n - 1 {
            return Err(ForecastError::BoundaryIndex { index, len: n });
        }
    }

    let mut flagged = vec![false; n];
    for &index in indices {
        flagged[index] = true;
    }

    let mut values = series.values().to_vec();
    interpolate_runs(&mut values, &flagged);
    debug!(flagged = indices.len(), "smoothed flagged positions");

    Ok(series.derive(series.start(), values, series.scale().clone()))
}

/// Smooth the values at `months`.
///
/// # Errors
/// `InvalidParameter` for a month outside the series, otherwise as
/// [`smooth_indices`].
pub fn smooth_months(series: &MonthlySeries, months: &[Month]) -> Result<MonthlySeries> {
    let indices = months
        .iter()
        .map(|&month| {
            series.index_of(month).ok_or_else(|| {
                ForecastError::InvalidParameter(format!(
                    "month {} is outside the series ({} values from {})",
                    month,
                    series.len(),
                    series.start()
                ))
            })
        })
        .collect::<Result<Vec<usize>>>()?;
    smooth_indices(series, &indices)
}
