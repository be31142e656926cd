//! Calendar month value type.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, the sampling unit of every series in this crate.
///
/// Serialises as `YYYY-MM`; deserialises from any format [`FromStr`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    /// 1..=12
    month: u32,
}

impl Month {
    /// Create a month, validating `month` in 1..=12.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ForecastError::InvalidParameter(format!(
                "month must be in 1..=12, got {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    /// The month containing a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        // Always valid: month is validated on construction.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Months since year 0, used for arithmetic.
    fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: (ordinal.rem_euclid(12) + 1) as u32,
        }
    }

    /// Shift by `n` months (may be negative).
    pub fn offset(&self, n: i64) -> Self {
        Self::from_ordinal(self.ordinal() + n)
    }

    /// The following month.
    pub fn succ(&self) -> Self {
        self.offset(1)
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(&self, other: Month) -> i64 {
        other.ordinal() - self.ordinal()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = ForecastError;

    /// Accepts `YYYY-MM`, `YYYY-MM-DD`, `YYYY/MM/DD` and `MM/DD/YYYY`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || ForecastError::InvalidParameter(format!("unrecognised month '{}'", s));

        for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Ok(Self::from_date(date));
            }
        }

        // Date-time strings such as "2020-01-01 00:00:00"
        if let Some(date_part) = s.split([' ', 'T']).next() {
            if date_part.len() < s.len() {
                if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
                    return Ok(Self::from_date(date));
                }
            }
        }

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Month {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.to_string()
    }
}

/// Iterate over `count` consecutive months starting at `start`.
pub fn month_range(start: Month, count: usize) -> impl Iterator<Item = Month> {
    (0..count as i64).map(move |i| start.offset(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_arithmetic_rolls_over_years() {
        let m = Month::new(2022, 9).unwrap();
        assert_eq!(m.succ(), Month::new(2022, 10).unwrap());
        assert_eq!(m.offset(4), Month::new(2023, 1).unwrap());
        assert_eq!(m.offset(-9), Month::new(2021, 12).unwrap());
        assert_eq!(m.offset(12), Month::new(2023, 9).unwrap());
    }

    #[test]
    fn month_distance() {
        let jan93 = Month::new(1993, 1).unwrap();
        let sep22 = Month::new(2022, 9).unwrap();
        // 357 observations span 356 steps
        assert_eq!(jan93.months_until(sep22), 356);
        assert_eq!(sep22.months_until(jan93), -356);
    }

    #[test]
    fn month_parses_common_formats() {
        let expected = Month::new(2020, 4).unwrap();
        assert_eq!("2020-04".parse::<Month>().unwrap(), expected);
        assert_eq!("2020-04-01".parse::<Month>().unwrap(), expected);
        assert_eq!("2020/04/15".parse::<Month>().unwrap(), expected);
        assert_eq!("04/01/2020".parse::<Month>().unwrap(), expected);
        assert_eq!("2020-04-01 00:00:00".parse::<Month>().unwrap(), expected);
    }

    #[test]
    fn month_rejects_garbage() {
        assert!("April 2020".parse::<Month>().is_err());
        assert!("2020-13".parse::<Month>().is_err());
        assert!("".parse::<Month>().is_err());
        assert!(Month::new(2020, 0).is_err());
    }

    #[test]
    fn month_display_and_range() {
        let start = Month::new(2022, 11).unwrap();
        let months: Vec<String> = month_range(start, 3).map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2022-11", "2022-12", "2023-01"]);
        assert_eq!(start.first_day().to_string(), "2022-11-01");
    }
}
