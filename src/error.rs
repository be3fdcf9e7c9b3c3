use std::io;
use thiserror::Error;

/// Error type for the sampling engine and its host sources
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A backing metric source could not be opened at all
    #[error("Counter unavailable: {0}")]
    CounterUnavailable(String),

    /// A single read failed; the source may recover on the next poll
    #[error("Counter read failed: {0}")]
    ReadFailed(String),

    /// The counter instance no longer exists and must be retired
    #[error("Counter gone: {0}")]
    CounterGone(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MonitorError::Config(msg.into())
    }

    pub fn counter_unavailable<S: Into<String>>(msg: S) -> Self {
        MonitorError::CounterUnavailable(msg.into())
    }

    pub fn read_failed<S: Into<String>>(msg: S) -> Self {
        MonitorError::ReadFailed(msg.into())
    }

    pub fn counter_gone<S: Into<String>>(msg: S) -> Self {
        MonitorError::CounterGone(msg.into())
    }

    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        MonitorError::Runtime(msg.into())
    }

    /// True when the failing resource is confirmed dead rather than flaky
    pub fn is_counter_gone(&self) -> bool {
        matches!(self, MonitorError::CounterGone(_))
    }
}
