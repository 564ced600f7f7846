//! Error types for the deployment agent

use thiserror::Error;

/// Process-level error type for the deployment agent.
///
/// Request-scoped failures have their own types (`SignatureError`,
/// `PayloadError`, `DeployFailure`) and never surface as an `AgentError`.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Notification error: {0}")]
    NotifyError(String),
}
