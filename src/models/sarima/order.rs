//! SARIMA order specification.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Model order `(p, d, q)(P, D, Q)[s]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SarimaOrder {
    /// Non-seasonal AR order.
    pub p: usize,
    /// Non-seasonal differencing order.
    pub d: usize,
    /// Non-seasonal MA order.
    pub q: usize,
    /// Seasonal AR order.
    #[serde(rename = "P")]
    pub cap_p: usize,
    /// Seasonal differencing order.
    #[serde(rename = "D")]
    pub cap_d: usize,
    /// Seasonal MA order.
    #[serde(rename = "Q")]
    pub cap_q: usize,
    /// Seasonal period.
    pub s: usize,
}

impl SarimaOrder {
    /// Create a new order.
    pub fn new(p: usize, d: usize, q: usize, cap_p: usize, cap_d: usize, cap_q: usize, s: usize) -> Self {
        Self {
            p,
            d,
            q,
            cap_p,
            cap_d,
            cap_q,
            s,
        }
    }

    /// Non-seasonal ARIMA(p, d, q).
    pub fn arima(p: usize, d: usize, q: usize) -> Self {
        Self::new(p, d, q, 0, 0, 0, 0)
    }

    /// Check if this is a seasonal model.
    pub fn is_seasonal(&self) -> bool {
        self.s > 1 && (self.cap_p > 0 || self.cap_d > 0 || self.cap_q > 0)
    }

    /// Check the order is well formed.
    pub fn validate(&self) -> Result<()> {
        let seasonal_terms = self.cap_p + self.cap_d + self.cap_q;
        if seasonal_terms > 0 && self.s < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "seasonal terms in {} need a period of at least 2",
                self
            )));
        }
        Ok(())
    }

    /// Highest AR lag after multiplying out the seasonal polynomial.
    pub fn expanded_ar_order(&self) -> usize {
        self.p + self.s * self.cap_p
    }

    /// Highest MA lag after multiplying out the seasonal polynomial.
    pub fn expanded_ma_order(&self) -> usize {
        self.q + self.s * self.cap_q
    }

    /// Observations consumed by differencing.
    pub fn differencing_loss(&self) -> usize {
        self.d + self.s * self.cap_d
    }

    /// Number of ARMA coefficients estimated.
    pub fn num_coefficients(&self) -> usize {
        self.p + self.q + self.cap_p + self.cap_q
    }
}

impl Default for SarimaOrder {
    /// The airline model `(0,1,1)(0,1,1)[12]`.
    fn default() -> Self {
        Self::new(0, 1, 1, 0, 1, 1, 12)
    }
}

impl fmt::Display for SarimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.s > 1 {
            write!(f, "({},{},{})[{}]", self.cap_p, self.cap_d, self.cap_q, self.s)?;
        }
        Ok(())
    }
}

impl FromStr for SarimaOrder {
    type Err = ForecastError;

    /// Parses `p,d,q` or `p,d,q,P,D,Q,s`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<usize> = s
            .split(',')
            .map(|part| part.trim().parse::<usize>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| ForecastError::InvalidParameter(format!("invalid order '{}'", s)))?;

        let order = match parts.as_slice() {
            [p, d, q] => Self::arima(*p, *d, *q),
            [p, d, q, cap_p, cap_d, cap_q, period] => {
                Self::new(*p, *d, *q, *cap_p, *cap_d, *cap_q, *period)
            }
            _ => {
                return Err(ForecastError::InvalidParameter(format!(
                    "order '{}' needs 3 or 7 comma separated integers",
                    s
                )))
            }
        };
        order.validate()?;
        Ok(order)
    }
}
