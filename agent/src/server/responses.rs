//! Webhook responses
//!
//! Bodies are short plain text meant for whoever reads the sender's delivery
//! log. They never include the secret, a digest, or a local path.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::deploy::executor::DeployFailure;
use crate::webhook::signature::SignatureError;

/// A request that completed normally
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The working tree now matches the branch tip
    Deployed { latest_commit: Option<String> },

    /// The push targeted another ref
    Skipped { git_ref: String, target_branch: String },

    /// Maintenance mode is on
    Disabled,
}

impl WebhookOutcome {
    pub fn message(&self) -> String {
        match self {
            WebhookOutcome::Deployed { latest_commit } => format!(
                "Deployment successful! Latest commit: {}",
                latest_commit.as_deref().unwrap_or("Unknown")
            ),
            WebhookOutcome::Skipped {
                git_ref,
                target_branch,
            } => format!(
                "Push to {} does not target {}, deployment skipped",
                git_ref, target_branch
            ),
            WebhookOutcome::Disabled => {
                "Deployments are temporarily disabled (maintenance mode)".to_string()
            }
        }
    }
}

impl IntoResponse for WebhookOutcome {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.message()).into_response()
    }
}

/// A request that was refused or whose deployment failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookRejection {
    MethodNotAllowed,
    Unauthorized(SignatureError),
    BadRequest,
    /// The body is larger than the configured limit
    PayloadTooLarge,
    DeploymentFailed(DeployFailure),
    /// The deployment task itself died
    Internal,
}

impl WebhookRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookRejection::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            WebhookRejection::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            WebhookRejection::BadRequest => StatusCode::BAD_REQUEST,
            WebhookRejection::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            WebhookRejection::DeploymentFailed(_) | WebhookRejection::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            WebhookRejection::MethodNotAllowed => "Method Not Allowed",
            WebhookRejection::Unauthorized(SignatureError::MissingSignature) => {
                "Unauthorized: Missing signature"
            }
            WebhookRejection::Unauthorized(SignatureError::InvalidSignature) => {
                "Unauthorized: Invalid signature"
            }
            WebhookRejection::BadRequest => "Bad Request: Invalid JSON payload",
            WebhookRejection::PayloadTooLarge => "Payload Too Large",
            WebhookRejection::DeploymentFailed(DeployFailure::RepositoryPathMissing) => {
                "Internal Server Error: Repository path not found"
            }
            WebhookRejection::DeploymentFailed(DeployFailure::FetchError) => {
                "Deployment failed: Could not fetch changes"
            }
            WebhookRejection::DeploymentFailed(DeployFailure::ResetError) => {
                "Deployment failed: Could not reset repository"
            }
            WebhookRejection::DeploymentFailed(DeployFailure::Aborted(_)) => {
                "Deployment failed: Aborted"
            }
            WebhookRejection::Internal => "Internal Server Error",
        }
    }
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        if self == WebhookRejection::MethodNotAllowed {
            return (self.status(), [(header::ALLOW, "POST")], self.message()).into_response();
        }
        (self.status(), self.message()).into_response()
    }
}
