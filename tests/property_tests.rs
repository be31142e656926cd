//! Property-based tests for transforms, forecasting and comparison.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated monthly series.

use autoprod_forecast::compare::{compare, percent_error, PercentError};
use autoprod_forecast::core::{Forecast, Month, MonthlySeries, Scale};
use autoprod_forecast::models::sarima::{Sarima, SarimaOrder};
use autoprod_forecast::smoothing::smooth_indices;
use autoprod_forecast::transform::{difference_lag, differencing_polynomial, integrate};
use proptest::prelude::*;

fn month_strategy() -> impl Strategy<Value = Month> {
    (1950i32..2050, 1u32..=12).prop_map(|(y, m)| Month::new(y, m).unwrap())
}

/// Strictly positive values with enough spread to avoid constant series.
fn positive_values_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..1000.0_f64, min_len..max_len).prop_map(|mut v| {
        for (i, val) in v.iter_mut().enumerate() {
            *val += (i as f64) * 0.001;
        }
        v
    })
}

// =============================================================================
// Property: log and differencing bookkeeping
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn log_then_both_differences_drops_thirteen(
        start in month_strategy(),
        values in positive_values_strategy(14, 200)
    ) {
        let n = values.len();
        let series = MonthlySeries::new(start, values);
        let out = series.log().unwrap().difference(1).unwrap().difference(12).unwrap();
        prop_assert_eq!(out.len(), n - 13);
        prop_assert_eq!(out.start(), start.offset(13));
        prop_assert_eq!(out.end(), series.end());
    }

    #[test]
    fn exp_inverts_log(values in positive_values_strategy(1, 100)) {
        let series = MonthlySeries::new(Month::new(2000, 1).unwrap(), values.clone());
        let back = series.log().unwrap().exp().unwrap();
        prop_assert!(back.scale().is_raw());
        for (a, b) in back.values().iter().zip(&values) {
            prop_assert!((a - b).abs() <= 1e-9 * b.abs());
        }
    }

    #[test]
    fn integrate_inverts_differencing(
        values in prop::collection::vec(-100.0..100.0_f64, 40..120),
        d in 0usize..=2,
        seasonal_d in 0usize..=1,
        split in 14usize..26
    ) {
        let delta = differencing_polynomial(d, seasonal_d, 12);
        let loss = delta.len() - 1;
        let w = difference_lag(&difference_lag(&values, 1, d), 12, seasonal_d);
        // w[i] belongs to values[i + loss]
        let future_w = &w[split - loss..];
        let rebuilt = integrate(future_w, &values[..split], &delta).unwrap();
        prop_assert_eq!(rebuilt.len(), values.len() - split);
        for (a, b) in rebuilt.iter().zip(&values[split..]) {
            prop_assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
        }
    }
}

// =============================================================================
// Property: forecast dating
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn forecast_months_follow_the_fit(
        start in month_strategy(),
        values in positive_values_strategy(30, 80),
        horizon in 1usize..24
    ) {
        let series = MonthlySeries::new(start, values).log().unwrap();
        let fit = Sarima::new(SarimaOrder::arima(0, 1, 0)).fit(&series).unwrap();
        let forecast = fit.forecast(horizon, 0.95).unwrap();
        let end = series.end().unwrap();

        prop_assert_eq!(forecast.horizon(), horizon);
        for (i, point) in forecast.points().iter().enumerate() {
            prop_assert_eq!(point.month, end.offset(i as i64 + 1));
            prop_assert!(point.upper > point.lower);
        }
        let raw = forecast.to_raw_scale().unwrap();
        prop_assert!(raw.points().iter().all(|p| p.lower > 0.0 && p.lower < p.mean && p.mean < p.upper));
    }
}

// =============================================================================
// Property: percent error and smoothing
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn percent_error_scales_with_actual(actual in 0.1..1e4_f64, ratio in -0.9..0.9_f64) {
        let pe = percent_error(actual * (1.0 + ratio), actual);
        match pe {
            PercentError::Defined(v) => prop_assert!((v - 100.0 * ratio).abs() < 1e-8),
            PercentError::Undefined => prop_assert!(false, "defined actual gave undefined error"),
        }
    }

    #[test]
    fn comparison_counts_only_nonzero_actuals(
        actuals in prop::collection::vec(prop_oneof![Just(0.0), 1.0..500.0_f64], 1..24)
    ) {
        let start = Month::new(2022, 10).unwrap();
        let n = actuals.len();
        let forecast = Forecast::from_parts(
            start,
            vec![100.0; n],
            vec![90.0; n],
            vec![110.0; n],
            0.95,
            Scale::raw(),
        )
        .unwrap();
        let zeros = actuals.iter().filter(|a| **a == 0.0).count();
        let actual = MonthlySeries::new(start, actuals);
        let comparison = compare(&forecast, &actual).unwrap();
        prop_assert_eq!(comparison.rows().len(), n);
        prop_assert_eq!(comparison.defined_count(), n - zeros);
    }

    #[test]
    fn smoothing_gives_neighbour_midpoint(
        values in prop::collection::vec(-1e3..1e3_f64, 3..60),
        pick in 0usize..1000
    ) {
        let n = values.len();
        let index = 1 + pick % (n - 2);
        let series = MonthlySeries::new(Month::new(2019, 1).unwrap(), values.clone());
        let smoothed = smooth_indices(&series, &[index]).unwrap();

        let expected = (values[index - 1] + values[index + 1]) / 2.0;
        prop_assert!((smoothed.values()[index] - expected).abs() < 1e-9);
        let (lo, hi) = if values[index - 1] < values[index + 1] {
            (values[index - 1], values[index + 1])
        } else {
            (values[index + 1], values[index - 1])
        };
        if lo < hi {
            prop_assert!(smoothed.values()[index] > lo && smoothed.values()[index] < hi);
        }
        for i in (0..n).filter(|&i| i != index) {
            prop_assert_eq!(smoothed.values()[i], values[i]);
        }
    }
}
