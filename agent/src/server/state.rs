//! Server state

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::deploy::command::CommandRunner;
use crate::deploy::executor::DeploymentExecutor;
use crate::deploy::journal::DeployJournal;
use crate::notify::NoticeDispatcher;
use crate::storage::settings::DeploymentConfig;
use crate::webhook::filter::BranchFilter;

/// Server state shared across handlers
pub struct ServerState {
    pub config: Arc<DeploymentConfig>,
    pub journal: Arc<DeployJournal>,
    pub runner: Arc<dyn CommandRunner>,
    pub notices: Arc<NoticeDispatcher>,
    pub filter: BranchFilter,
    /// Held from the first stage until the run is recorded; the working tree
    /// has a single writer
    pub deploy_lock: Arc<Mutex<()>>,
}

impl ServerState {
    pub fn new(
        config: Arc<DeploymentConfig>,
        journal: Arc<DeployJournal>,
        runner: Arc<dyn CommandRunner>,
        notices: Arc<NoticeDispatcher>,
        deploy_lock: Arc<Mutex<()>>,
    ) -> Self {
        let filter = BranchFilter::new(&config.target_branch);
        Self {
            config,
            journal,
            runner,
            notices,
            filter,
            deploy_lock,
        }
    }

    /// An executor bound to this server's configuration
    pub fn executor(&self) -> DeploymentExecutor {
        DeploymentExecutor::new(
            self.config.clone(),
            self.runner.clone(),
            self.journal.clone(),
        )
    }
}
