//! Error types for the forecasting crate.

use thiserror::Error;

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Unified error type for a forecast run.
///
/// Every variant is fatal to the current run: nothing is silently recovered
/// or approximated. A `Storage` failure after stepping leaves the in-memory
/// batch intact, so the caller may retry the sink write without re-running
/// inference.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// Not enough seed observations to start a run.
    #[error("insufficient history: have {have} observations, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    /// The window buffer shrank below the model input length.
    ///
    /// This is an internal invariant violation, not a data problem.
    #[error("window underflow: buffer holds {have} entries, model needs {need}")]
    WindowUnderflow { have: usize, need: usize },

    /// An unsupported model key was supplied.
    #[error("invalid model type {0:?}, expected one of \"btc\", \"oil\", \"correlation\"")]
    InvalidModelType(String),

    /// A model artifact is missing or corrupt, or inference on it failed.
    ///
    /// Model files are static artifacts, so this is never retried.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The observation store or forecast sink failed.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl From<ort::Error> for ForecastError {
    fn from(e: ort::Error) -> Self {
        ForecastError::ModelUnavailable(e.to_string())
    }
}
