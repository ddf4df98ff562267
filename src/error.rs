use std::time::Duration;

use thiserror::Error;

/// Errors returned by engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine returned a non-success HTTP status. The response body is
    /// kept because the engine reports graph-validation problems there.
    #[error("engine returned HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    /// Request-level network failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The push channel failed to connect or errored mid-wait.
    #[error("push channel error: {0}")]
    Channel(#[from] tokio_tungstenite::tungstenite::Error),

    /// The push channel ended before a terminal event for the tracked job.
    #[error("push channel closed before the job finished")]
    ChannelClosed,

    /// The engine reported a node-level failure for the tracked job. The
    /// payload is the engine's error object, unmodified.
    #[error("job execution failed: {payload}")]
    Execution { payload: serde_json::Value },

    /// No terminal event arrived within the wait budget.
    #[error("no terminal event within {0:?}")]
    Timeout(Duration),

    /// The engine answered with a success status but the body was missing
    /// expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, EngineError>;
