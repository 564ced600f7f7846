//! Push notification payload

use serde::Deserialize;
use thiserror::Error;

const UNKNOWN: &str = "Unknown";

/// The payload failed to decode
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A push notification, reduced to what a deployment needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployEvent {
    /// Pushed ref, e.g. `refs/heads/main`
    pub git_ref: String,
    pub repository_full_name: String,
    pub pusher_name: String,
    pub commit_count: usize,
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
    #[serde(default)]
    repository: Option<Repository>,
    #[serde(default)]
    pusher: Option<Pusher>,
    #[serde(default)]
    commits: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    #[serde(default)]
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Pusher {
    #[serde(default)]
    name: Option<String>,
}

/// Decode a raw push notification body.
///
/// Only `ref` is required. Missing repository or pusher names default to
/// `"Unknown"` and a missing commit list counts as zero commits.
pub fn parse_push_event(body: &[u8]) -> Result<DeployEvent, PayloadError> {
    let payload: PushPayload = serde_json::from_slice(body)?;

    Ok(DeployEvent {
        git_ref: payload.git_ref,
        repository_full_name: payload
            .repository
            .and_then(|r| r.full_name)
            .unwrap_or_else(|| UNKNOWN.to_string()),
        pusher_name: payload
            .pusher
            .and_then(|p| p.name)
            .unwrap_or_else(|| UNKNOWN.to_string()),
        commit_count: payload.commits.map(|c| c.len()).unwrap_or(0),
    })
}
