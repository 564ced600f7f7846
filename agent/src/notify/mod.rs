//! Deployment notifications
//!
//! Notifications are best-effort: a failure to notify is logged and never
//! changes the outcome reported to the webhook sender.

pub mod email;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::deploy::executor::DeployFailure;
use crate::deploy::journal::DeployJournal;
use crate::errors::AgentError;
use crate::storage::settings::NotifySettings;
use crate::webhook::payload::DeployEvent;

pub use email::EmailNotifier;

/// How a deployment attempt ended
#[derive(Debug, Clone)]
pub enum NoticeOutcome {
    Succeeded { latest_commit: Option<String> },
    Failed { failure: DeployFailure },
}

/// What happened to one push
#[derive(Debug, Clone)]
pub struct DeploymentNotice {
    pub event: DeployEvent,
    pub branch: String,
    pub outcome: NoticeOutcome,
}

impl DeploymentNotice {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, NoticeOutcome::Succeeded { .. })
    }

    pub fn subject(&self) -> String {
        let verb = if self.is_success() { "succeeded" } else { "failed" };
        format!(
            "[pushdeploy] Deployment {}: {}",
            verb, self.event.repository_full_name
        )
    }

    pub fn body(&self) -> String {
        let mut body = format!(
            "Repository: {}\nBranch: {}\nPusher: {}\nCommits: {}\n",
            self.event.repository_full_name,
            self.branch,
            self.event.pusher_name,
            self.event.commit_count
        );
        match &self.outcome {
            NoticeOutcome::Succeeded { latest_commit } => {
                body.push_str(&format!(
                    "Result: success\nLatest commit: {}\n",
                    latest_commit.as_deref().unwrap_or("Unknown")
                ));
            }
            NoticeOutcome::Failed { failure } => {
                body.push_str(&format!(
                    "Result: failed at {} stage ({})\n",
                    failure.stage(),
                    failure
                ));
            }
        }
        body
    }
}

/// Delivers deployment notices
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &DeploymentNotice) -> Result<(), AgentError>;
}

/// Discards every notice
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _notice: &DeploymentNotice) -> Result<(), AgentError> {
        Ok(())
    }
}

/// Sends notices in the background and keeps the sends still in flight, so
/// shutdown can wait for them.
pub struct NoticeDispatcher {
    notifier: Arc<dyn Notifier>,
    pending: Mutex<JoinSet<()>>,
}

impl NoticeDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            pending: Mutex::new(JoinSet::new()),
        }
    }

    /// Queue a notice. Delivery failures are recorded in the journal.
    pub async fn dispatch(&self, notice: DeploymentNotice, journal: Arc<DeployJournal>) {
        let notifier = self.notifier.clone();
        let mut pending = self.pending.lock().await;
        while pending.try_join_next().is_some() {}

        pending.spawn(async move {
            if let Err(e) = notifier.notify(&notice).await {
                warn!("Failed to send deployment notification: {}", e);
                journal
                    .warn(format!("Deployment notification not sent: {}", e))
                    .await;
            }
        });
    }

    /// Wait for every queued notice to be sent or to fail
    pub async fn drain(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock().await);
        if !pending.is_empty() {
            info!("Waiting for {} deployment notification(s)...", pending.len());
        }
        while pending.join_next().await.is_some() {}
    }
}

/// Build the notifier described by the settings
pub fn build_notifier(settings: &NotifySettings) -> Result<Arc<dyn Notifier>, AgentError> {
    if !settings.is_enabled() {
        info!("Deployment notifications disabled");
        return Ok(Arc::new(NoopNotifier));
    }
    info!("Deployment notifications will be sent to {}", settings.email);
    Ok(Arc::new(EmailNotifier::new(settings)?))
}
