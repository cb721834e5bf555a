//! Core error types

use thiserror::Error;

use crate::config::HistoryKind;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("History error: {0}")]
    History(#[from] waymark_history::HistoryError),

    #[error("Location error: {0}")]
    Location(#[from] waymark_location::LocationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("A {0} history needs a native history medium")]
    MissingMedium(HistoryKind),
}
