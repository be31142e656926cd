//! Core data structures: months, dated series and forecasts.

mod forecast;
mod month;
mod series;

pub use forecast::{Forecast, ForecastPoint};
pub use month::{month_range, Month};
pub use series::{MonthlySeries, Scale};
