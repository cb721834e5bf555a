//! History error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Location error: {0}")]
    Location(#[from] waymark_location::LocationError),

    #[error("Medium error: {0}")]
    Medium(#[from] MediumError),
}

/// Failures reported by a native history medium
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediumError {
    #[error("History state is unavailable: {0}")]
    StateUnavailable(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
