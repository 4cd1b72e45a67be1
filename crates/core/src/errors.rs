use chrono::NaiveDate;
use thiserror::Error;

use crate::sink::SinkError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("iso week enumeration exceeded the {cap}-iteration cap for window {start}..={end}")]
    WeekCapExceeded { start: NaiveDate, end: NaiveDate, cap: usize },
    #[error("date arithmetic overflowed while offsetting {base} by {offset_months} months")]
    DateOverflow { base: NaiveDate, offset_months: i32 },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum EstimatorError {
    #[error("seasonality range for `{product_name}` is unusable: min {min}, max {max}")]
    InvalidRange { product_name: String, min: f64, max: f64 },
}

/// Failures that can surface while generating or persisting a country's batch.
///
/// Calendar and estimator failures are product-level: the orchestrator logs
/// and skips the affected product. Sink failures are country-level or fatal
/// depending on where they occur (insert vs. initial clear).
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Estimator(#[from] EstimatorError),
    #[error("persistence sink failure: {0}")]
    Sink(#[from] SinkError),
}
