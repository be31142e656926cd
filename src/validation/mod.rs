//! Statistical validation tests for series and fitted models.
//!
//! Residual tests check that a fitted model leaves white noise behind;
//! stationarity tests check that the transformed series is ready to model.
//!
//! # Example
//!
//! ```
//! use autoprod_forecast::validation::{durbin_watson, jarque_bera, ljung_box, test_stationarity};
//!
//! let residuals = vec![0.1, -0.2, 0.15, -0.1, 0.05, -0.08, 0.12, -0.15, 0.1, -0.05];
//! let lb = ljung_box(&residuals, Some(5), 0);
//! assert!(lb.p_value >= 0.0 && lb.p_value <= 1.0);
//!
//! let jb = jarque_bera(&residuals);
//! assert!(jb.statistic >= 0.0);
//!
//! let dw = durbin_watson(&residuals);
//! assert!(dw.statistic > 2.0);
//!
//! let series: Vec<f64> = (0..60).map(|i| ((i * 7) % 5) as f64).collect();
//! let report = test_stationarity(&series);
//! println!("{}", report);
//! ```

pub mod stationarity;

pub use residual_tests::{
    durbin_watson, jarque_bera, ljung_box, AutocorrelationType, DurbinWatsonResult,
    JarqueBeraResult, LjungBoxResult, ResidualDiagnostics,
};

pub use stationarity::{
    adf_test, kpss_test, test_stationarity, CriticalValues, StationarityReport,
    StationarityResult, StationarityVerdict,
};
