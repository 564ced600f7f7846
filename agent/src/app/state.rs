//! Application state management

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::deploy::command::{CommandRunner, GitCommandRunner};
use crate::deploy::journal::DeployJournal;
use crate::errors::AgentError;
use crate::notify::{build_notifier, NoticeDispatcher};
use crate::server::state::ServerState;
use crate::storage::settings::{DeploymentConfig, Settings};

/// Main application state
pub struct AppState {
    /// Deployment configuration, read-only after startup
    pub config: Arc<DeploymentConfig>,

    /// Deployment audit log
    pub journal: Arc<DeployJournal>,

    /// Runs git in the working tree
    pub runner: Arc<dyn CommandRunner>,

    /// Deployment notifications still being sent
    pub notices: Arc<NoticeDispatcher>,

    /// Serializes deployments against the working tree
    pub deploy_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Initialize application state
    pub fn init(settings: Settings) -> Result<Self, AgentError> {
        info!("Initializing application state...");

        let notices = Arc::new(NoticeDispatcher::new(build_notifier(&settings.notify)?));
        let config = settings.deployment;

        let runner: Arc<dyn CommandRunner> =
            Arc::new(GitCommandRunner::new(config.command_timeout()));
        let journal = Arc::new(DeployJournal::new(config.log_file.clone()));

        info!(
            "Deploying {} of {} into {} (audit log: {})",
            config.target_ref(),
            config.remote,
            config.repository_path.display(),
            journal.path().display()
        );
        if config.maintenance_mode {
            info!("Maintenance mode is enabled; pushes will not be deployed");
        }

        Ok(Self {
            config: Arc::new(config),
            journal,
            runner,
            notices,
            deploy_lock: Arc::new(Mutex::new(())),
        })
    }

    /// State handed to the HTTP handlers
    pub fn server_state(&self) -> ServerState {
        ServerState::new(
            self.config.clone(),
            self.journal.clone(),
            self.runner.clone(),
            self.notices.clone(),
            self.deploy_lock.clone(),
        )
    }

    /// Shutdown application state, waiting for an in-flight deployment and
    /// the notifications it queued
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        info!("Shutting down application state...");
        drop(self.deploy_lock.lock().await);
        self.notices.drain().await;
        Ok(())
    }
}
