//! HTTP request handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    Json,
};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::error;

use crate::deploy::executor::{DeployFailure, DeploymentReport};
use crate::notify::{DeploymentNotice, NoticeOutcome};
use crate::server::responses::{WebhookOutcome, WebhookRejection};
use crate::server::state::ServerState;
use crate::utils::{generate_uuid, version_info};
use crate::webhook::filter::BranchDecision;
use crate::webhook::payload::{parse_push_event, DeployEvent};
use crate::webhook::signature::{signature_header, verify_signature, SignatureError};

/// Header carrying the sender's delivery identifier
const DELIVERY_HEADER: &str = "x-github-delivery";

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "pushdeploy".to_string(),
        version: version.version,
    })
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Any method other than POST on the webhook route
pub async fn method_not_allowed_handler(
    State(state): State<Arc<ServerState>>,
    method: Method,
) -> WebhookRejection {
    let journal = &state.journal;
    journal.info("=== Deployment Request Received ===").await;
    journal.info(format!("Request Method: {}", method)).await;
    journal.error("Only POST requests are allowed").await;
    WebhookRejection::MethodNotAllowed
}

/// Push notification handler.
///
/// Authentication and payload validation complete before the working tree is
/// touched. Pushes to other refs are acknowledged without deploying.
pub async fn webhook_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<WebhookOutcome, WebhookRejection> {
    let journal = &state.journal;
    let config = &state.config;

    journal.info("=== Deployment Request Received ===").await;
    journal
        .info(format!("Request Method: POST (delivery {})", delivery_id(&headers)))
        .await;

    if config.maintenance_mode {
        journal.info("INFO: Maintenance mode enabled, deployment skipped").await;
        return Ok(WebhookOutcome::Disabled);
    }

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            journal
                .error(format!("Unable to read request body: {}", rejection))
                .await;
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                return Err(WebhookRejection::PayloadTooLarge);
            }
            return Err(WebhookRejection::BadRequest);
        }
    };

    let signature = signature_header(&headers);
    if let Err(e) = verify_signature(config.secret.expose_secret().as_bytes(), &body, signature) {
        match e {
            SignatureError::MissingSignature => journal.error("No signature found").await,
            SignatureError::InvalidSignature => journal.error("Invalid signature").await,
        }
        return Err(WebhookRejection::Unauthorized(e));
    }
    journal.info("Signature verified").await;

    let event = match parse_push_event(&body) {
        Ok(event) => event,
        Err(e) => {
            journal
                .error(format!("Invalid JSON payload ({} bytes): {}", body.len(), e))
                .await;
            return Err(WebhookRejection::BadRequest);
        }
    };

    if state.filter.evaluate(&event) == BranchDecision::Skip {
        journal
            .info(format!(
                "INFO: Push to {} does not match {}, skipping deployment",
                event.git_ref,
                state.filter.target_ref()
            ))
            .await;
        return Ok(WebhookOutcome::Skipped {
            git_ref: event.git_ref,
            target_branch: config.target_branch.clone(),
        });
    }

    journal
        .info(format!(
            "SUCCESS: Valid push to {} branch detected",
            config.target_branch
        ))
        .await;
    journal
        .info(format!("Repository: {}", event.repository_full_name))
        .await;
    journal.info(format!("Pusher: {}", event.pusher_name)).await;
    journal.info(format!("Commits: {}", event.commit_count)).await;

    // A sender that hangs up only drops the wait below; the run itself
    // always finishes and is recorded.
    match tokio::spawn(deploy(state.clone(), event)).await {
        Ok(Ok(report)) => Ok(WebhookOutcome::Deployed {
            latest_commit: report.latest_commit,
        }),
        Ok(Err(failure)) => Err(WebhookRejection::DeploymentFailed(failure)),
        Err(e) => {
            error!("Deployment task failed: {}", e);
            journal.error("Deployment ended unexpectedly").await;
            Err(WebhookRejection::Internal)
        }
    }
}

/// Run a deployment under the deployment lock, record its result and queue
/// the notice.
async fn deploy(
    state: Arc<ServerState>,
    event: DeployEvent,
) -> Result<DeploymentReport, DeployFailure> {
    let journal = &state.journal;

    let _guard = match state.deploy_lock.clone().try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => {
            journal
                .info("Another deployment is in progress, waiting for it to finish...")
                .await;
            state.deploy_lock.clone().lock_owned().await
        }
    };
    let result = state.executor().run().await;

    let outcome = match &result {
        Ok(report) => {
            journal.info("=== Deployment Completed Successfully ===").await;
            NoticeOutcome::Succeeded {
                latest_commit: report.latest_commit.clone(),
            }
        }
        Err(failure) => {
            journal
                .error(format!("Deployment aborted at {} stage", failure.stage()))
                .await;
            NoticeOutcome::Failed { failure: *failure }
        }
    };
    state
        .notices
        .dispatch(
            DeploymentNotice {
                event,
                branch: state.config.target_branch.clone(),
                outcome,
            },
            journal.clone(),
        )
        .await;

    if result.is_ok() {
        journal.info("=== Deployment Process Complete ===").await;
    }
    result
}

fn delivery_id(headers: &HeaderMap) -> String {
    headers
        .get(DELIVERY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(generate_uuid)
}
