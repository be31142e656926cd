//! End-to-end tests: CSV vintages on disk through the full analysis.

use std::io::Write;

use autoprod_forecast::config::{PipelineConfig, SearchBounds};
use autoprod_forecast::core::{Month, MonthlySeries};
use autoprod_forecast::error::ForecastError;
use autoprod_forecast::io::{load_csv, LoadOptions};
use autoprod_forecast::models::sarima::{Sarima, SarimaConfig, SarimaOrder};
use autoprod_forecast::pipeline::{FitSource, Pipeline};
use tempfile::NamedTempFile;

fn month(y: i32, m: u32) -> Month {
    Month::new(y, m).unwrap()
}

/// Deterministic pseudo-normal noise (sum of uniforms).
fn noise(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            (0..12)
                .map(|_| {
                    state = state
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    (state >> 11) as f64 / (1u64 << 53) as f64
                })
                .sum::<f64>()
                - 6.0
        })
        .collect()
}

/// Monthly production whose log follows `(0,1,2)(0,1,1)[12]`.
fn production(n: usize) -> Vec<f64> {
    let e: Vec<f64> = noise(n, 2023).into_iter().map(|v| 0.03 * v).collect();
    let mut x = vec![0.0; n];
    for t in 0..n {
        if t < 14 {
            x[t] = 4.6 + 0.1 * (2.0 * std::f64::consts::PI * t as f64 / 12.0).sin();
            continue;
        }
        let w = e[t] - 0.3 * e[t - 1] - 0.1 * e[t - 2] - 0.6 * e[t - 12]
            + 0.18 * e[t - 13]
            + 0.06 * e[t - 14];
        x[t] = x[t - 1] + x[t - 12] - x[t - 13] + w;
    }
    x.into_iter().map(f64::exp).collect()
}

fn write_csv(start: Month, values: &[f64]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "DATE,IPG3361T3S").unwrap();
    for (i, v) in values.iter().enumerate() {
        writeln!(file, "{},{}", start.offset(i as i64).first_day(), v).unwrap();
    }
    file
}

fn small_search() -> SearchBounds {
    SearchBounds {
        max_p: 1,
        max_q: 2,
        max_cap_p: 0,
        max_cap_q: 1,
        ..SearchBounds::default()
    }
}

#[test]
fn airline_order_forecasts_the_next_twelve_months() {
    let values = production(357);
    let series = MonthlySeries::new(month(1993, 1), values);
    assert_eq!(series.end(), Some(month(2022, 9)));

    let config = SarimaConfig::default()
        .with_order(SarimaOrder::new(0, 1, 2, 0, 1, 1, 12))
        .with_allow_nonconverged(true);
    let fit = Sarima::with_config(config).fit(&series.log().unwrap()).unwrap();
    let forecast = fit.forecast(12, 0.95).unwrap();

    assert_eq!(forecast.horizon(), 12);
    assert_eq!(forecast.points()[0].month, month(2022, 10));
    assert_eq!(forecast.points()[11].month, month(2023, 9));
    assert!(forecast.points().iter().all(|p| p.width() > 0.0));
    assert!(fit.ma()[0] < 0.0, "theta1 = {}", fit.ma()[0]);
    assert!(fit.seasonal_ma()[0] < 0.0, "Theta1 = {}", fit.seasonal_ma()[0]);
}

#[test]
fn full_analysis_over_two_vintages() {
    let values = production(365);
    let original = write_csv(month(1993, 1), &values[..357]);

    let mut updated_values = values.clone();
    // Jan 2023 reported as zero in the later vintage
    updated_values[360] = 0.0;
    let updated = write_csv(month(1993, 1), &updated_values);

    let config = PipelineConfig::default()
        .with_search(small_search())
        .with_max_iter(1500);
    let report = Pipeline::new(config)
        .run(original.path(), updated.path())
        .unwrap();

    assert_eq!(report.original.end, month(2022, 9));
    assert_eq!(report.updated.end, month(2023, 5));
    assert_eq!(report.correlogram.max_lag(), 36);
    assert_eq!(report.correlogram.nobs, 357 - 13);

    // the fixed order converges and is kept; the search runs beside it
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(report.attempts[0].source, FitSource::Fixed);
    assert_eq!(report.attempts[0].aic, Some(report.fit.aic()));
    assert_eq!(report.fit.order(), SarimaOrder::new(0, 1, 2, 0, 1, 1, 12));
    let searched = &report.attempts[1];
    assert_eq!(searched.source, FitSource::Automatic);
    assert!(searched.succeeded() && searched.candidates > 0);
    assert_eq!(searched.coefficients.len(), searched.order.num_coefficients());
    assert!(report.best_attempt().is_some());

    assert!(report.forecast.scale().is_raw());
    assert_eq!(report.forecast.horizon(), 12);
    assert_eq!(report.forecast.points()[0].month, month(2022, 10));
    assert_eq!(report.forecast.points()[11].month, month(2023, 9));
    assert!(report.forecast.points().iter().all(|p| p.width() > 0.0 && p.lower > 0.0));

    assert_eq!(report.comparison.rows().len(), 8);
    assert_eq!(report.comparison.defined_count(), 7);
    assert_eq!(report.comparison.undefined_months(), vec![month(2023, 1)]);

    let sensitivity = report.sensitivity.as_ref().unwrap();
    assert_eq!(sensitivity.replacements.len(), 2);
    assert_eq!(sensitivity.replacements[0].month, month(2020, 4));
    for refit in [&sensitivity.same_order, &sensitivity.automatic] {
        assert!(refit.succeeded(), "{}", refit);
        let diagnostics = refit.diagnostics.as_ref().unwrap();
        assert!(!diagnostics.acf.is_empty());
        assert!(diagnostics.ljung_box.p_value >= 0.0 && diagnostics.ljung_box.p_value <= 1.0);
        assert!(diagnostics.jarque_bera.statistic >= 0.0);
    }
    assert_eq!(sensitivity.same_order.coefficients.len(), 3);
    let smoothed_april = sensitivity.replacements[0].after;
    let (march, june) = (values[326], values[329]);
    assert!(smoothed_april > march.min(june) && smoothed_april < march.max(june));

    let text = report.to_string();
    assert!(text.contains("== Forecast vs updated vintage"));
    assert!(text.contains("== Sensitivity"));
    assert!(text.contains("automatic"));
    assert!(text.contains("Ljung-Box"));
    assert!(text.contains("ma.S.L12"));
}

#[test]
fn missing_values_halt_unless_interpolation_is_requested() {
    let mut values = production(60);
    values[20] = f64::NAN;
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "DATE,IPG3361T3S").unwrap();
    for (i, v) in values.iter().enumerate() {
        let date = month(2015, 1).offset(i as i64).first_day();
        if v.is_nan() {
            writeln!(file, "{},", date).unwrap();
        } else {
            writeln!(file, "{},{}", date, v).unwrap();
        }
    }

    let loaded = load_csv(file.path(), &LoadOptions::default()).unwrap();
    assert_eq!(loaded.report.missing_months, vec![month(2016, 9)]);

    let strict = Pipeline::default();
    assert_eq!(
        strict.load(file.path(), None),
        Err(ForecastError::MissingValues { count: 1 })
    );

    let lenient = Pipeline::new(PipelineConfig::default().with_interpolate_missing(true));
    let series = lenient.load(file.path(), None).unwrap();
    let filled = series.values()[20];
    assert!((filled - (values[19] + values[21]) / 2.0).abs() < 1e-9);
}

#[test]
fn non_positive_values_fail_before_fitting() {
    let mut values = production(60);
    values[30] = 0.0;
    let original = MonthlySeries::new(month(2015, 1), values.clone());
    let updated = MonthlySeries::new(month(2015, 1), values);

    let err = Pipeline::default().run_series(&original, &updated).unwrap_err();
    assert!(matches!(err, ForecastError::NonPositiveValue { index: 30, .. }));
}

#[test]
fn configuration_file_drives_the_run() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        horizon = 6
        outlier_months = []
        original_window = ["1995-01", "2022-09"]

        [search]
        max_p = 1
        max_Q = 1
        "#
    )
    .unwrap();
    let config = PipelineConfig::load(file.path()).unwrap();
    assert_eq!(config.horizon, 6);
    assert!(config.outlier_months.is_empty());

    let values = production(357);
    let original = write_csv(month(1993, 1), &values);
    let updated = write_csv(month(1993, 1), &values);
    let pipeline = Pipeline::new(config);

    let series = pipeline.load(original.path(), pipeline.config().original_window).unwrap();
    assert_eq!(series.start(), month(1995, 1));

    // the forecast starts after the data, so the same vintage has no overlap
    let err = pipeline.run(original.path(), updated.path()).unwrap_err();
    assert_eq!(err, ForecastError::NoOverlap);
}
