//! Reading monthly series from CSV.
//!
//! Missing values are reported in [`LoadReport`] and never filled silently:
//! callers choose between [`LoadedSeries::require_complete`] and
//! [`LoadedSeries::interpolate_missing`].

mod loader;

pub use loader::{load_csv, read_csv, LoadOptions, LoadReport, LoadedSeries};
