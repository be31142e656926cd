//! Error types for the autoprod-forecast library.

use thiserror::Error;

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while loading, transforming, fitting or comparing series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Timestamp-related error (gaps, duplicates, ordering).
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// A required CSV column is absent.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// A date field could not be parsed.
    #[error("could not parse date '{value}' on row {row}")]
    DateParse { row: usize, value: String },

    /// Reading the input failed.
    #[error("io error: {0}")]
    Io(String),

    /// Missing values detected when not allowed.
    #[error("{count} missing values detected in data")]
    MissingValues { count: usize },

    /// A value that must be strictly positive is not.
    #[error("non-positive value {value} at index {index}")]
    NonPositiveValue { index: usize, value: f64 },

    /// The transform cannot be applied on the series' current scale.
    #[error("invalid transform: {0}")]
    InvalidTransform(String),

    /// The optimizer did not converge for the given orders.
    #[error("optimizer did not converge for {order} after {iterations} iterations")]
    ConvergenceFailure { order: String, iterations: usize },

    /// Model must be fitted before prediction.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Forecast and actual series share no months.
    #[error("forecast and actual series do not overlap")]
    NoOverlap,

    /// Smoothing was requested at a position that has no neighbour on one side.
    #[error("cannot interpolate boundary index {index} (series length {len})")]
    BoundaryIndex { index: usize, len: usize },

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// Configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        ForecastError::Io(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Io(err.to_string())
    }
}
