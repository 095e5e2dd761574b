//! Error types shared across the alarm pipeline.

use thiserror::Error;

/// Failures surfaced by the escalation engine and its coordinator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("scheduler is closed; no further escalation can be scheduled")]
    SchedulerClosed,

    #[error("alert coordinator has stopped")]
    CoordinatorStopped,
}

/// Failures from the presentation actuators.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{0} is not available on this device")]
    Unavailable(&'static str),

    #[error("audio error: {0}")]
    Audio(String),

    #[error("notification error: {0}")]
    Notification(String),

    #[error("no part of the interruption could be rendered")]
    NothingRendered,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Failures from the event source adapters.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
