//! Deployment executor
//!
//! Brings the configured working tree in line with the remote branch tip by
//! running a fixed sequence of stages (see [`Stage`]). The first required
//! stage that fails ends the run; nothing is rolled back.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::deploy::command::{CommandResult, CommandRunner};
use crate::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentState, Stage};
use crate::deploy::git::GitPlan;
use crate::deploy::journal::DeployJournal;
use crate::filesys::dir::Dir;
use crate::storage::settings::DeploymentConfig;

/// A required stage failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployFailure {
    #[error("repository path not found")]
    RepositoryPathMissing,

    #[error("could not fetch changes")]
    FetchError,

    #[error("could not reset repository")]
    ResetError,

    #[error("aborted during {0}")]
    Aborted(Stage),
}

impl DeployFailure {
    /// The failure reported when a required stage fails
    pub fn for_stage(stage: Stage) -> Option<Self> {
        match stage {
            Stage::Precondition => Some(DeployFailure::RepositoryPathMissing),
            Stage::Fetch => Some(DeployFailure::FetchError),
            Stage::Reset => Some(DeployFailure::ResetError),
            _ => None,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            DeployFailure::RepositoryPathMissing => Stage::Precondition,
            DeployFailure::FetchError => Stage::Fetch,
            DeployFailure::ResetError => Stage::Reset,
            DeployFailure::Aborted(stage) => *stage,
        }
    }
}

/// Result of a single stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub stage: Stage,
    pub result: CommandResult,
}

/// Result of a successful deployment
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    /// Summary of the checked-out commit, absent if it could not be read
    pub latest_commit: Option<String>,

    /// Every stage that ran, in order
    pub stages: Vec<StageOutcome>,
}

impl DeploymentReport {
    /// Non-required stages that failed
    pub fn warnings(&self) -> impl Iterator<Item = &StageOutcome> {
        self.stages.iter().filter(|o| !o.result.succeeded)
    }
}

/// Runs the deployment stages against the configured working tree
pub struct DeploymentExecutor {
    config: Arc<DeploymentConfig>,
    runner: Arc<dyn CommandRunner>,
    journal: Arc<DeployJournal>,
    plan: GitPlan,
}

impl DeploymentExecutor {
    pub fn new(
        config: Arc<DeploymentConfig>,
        runner: Arc<dyn CommandRunner>,
        journal: Arc<DeployJournal>,
    ) -> Self {
        let plan = GitPlan::new(config.remote.clone(), config.target_branch.clone());
        Self {
            config,
            runner,
            journal,
            plan,
        }
    }

    /// Run every stage in order, stopping at the first required failure.
    ///
    /// The caller is responsible for holding the deployment lock.
    pub async fn run(&self) -> Result<DeploymentReport, DeployFailure> {
        self.journal.info("Starting deployment process...").await;

        let mut fsm = DeploymentFsm::new();
        let mut stages = Vec::with_capacity(Stage::ALL.len());
        let mut latest_commit = None;

        fsm.process(DeploymentEvent::Begin)
            .map_err(|e| self.invariant_violation(Stage::ALL[0], e))?;

        while let DeploymentState::Running(stage) = *fsm.state() {
            let result = self.execute(stage).await;
            self.record(stage, &result).await;

            if stage == Stage::Verify && result.succeeded && !result.combined_output.is_empty() {
                latest_commit = Some(result.combined_output.clone());
            }

            let event = if result.succeeded {
                DeploymentEvent::StageSucceeded(stage)
            } else {
                DeploymentEvent::StageFailed(stage, result.combined_output.clone())
            };
            stages.push(StageOutcome { stage, result });
            fsm.process(event)
                .map_err(|e| self.invariant_violation(stage, e))?;
        }

        match *fsm.state() {
            DeploymentState::Failed(stage) => {
                Err(DeployFailure::for_stage(stage).unwrap_or(DeployFailure::Aborted(stage)))
            }
            _ => Ok(DeploymentReport {
                latest_commit,
                stages,
            }),
        }
    }

    async fn execute(&self, stage: Stage) -> CommandResult {
        match self.plan.args(stage) {
            None => self.check_repository().await,
            Some(args) => {
                self.announce(stage).await;
                debug!("Running stage {}: git {:?}", stage, args);
                self.runner.run(self.config.repository_path(), &args).await
            }
        }
    }

    async fn check_repository(&self) -> CommandResult {
        let dir = Dir::new(self.config.repository_path());
        if dir.exists().await {
            CommandResult::success("")
        } else {
            CommandResult::failure(format!(
                "Repository path does not exist: {}",
                dir.path().display()
            ))
        }
    }

    async fn announce(&self, stage: Stage) {
        let message = match stage {
            Stage::Fetch => "Fetching latest changes...".to_string(),
            Stage::Stash => "Stashing local changes...".to_string(),
            Stage::Reset => format!("Performing hard reset to {}...", self.plan.upstream()),
            Stage::Clean => "Cleaning untracked files...".to_string(),
            _ => return,
        };
        self.journal.info(message).await;
    }

    async fn record(&self, stage: Stage, result: &CommandResult) {
        let output = &result.combined_output;
        let journal = &self.journal;
        match (stage, result.succeeded) {
            (Stage::Precondition, true) => {}
            (Stage::Precondition, false) => journal.error(output).await,

            (Stage::Status, true) if output.is_empty() => {
                journal.info("Working directory is clean").await
            }
            (Stage::Status, true) => {
                journal
                    .info(format!("INFO: Working directory has changes: {}", output))
                    .await
            }
            (Stage::Status, false) => {
                journal.warn(format!("Git status failed: {}", output)).await
            }

            (Stage::Fetch, true) => journal.info(format!("Git fetch output: {}", output)).await,
            (Stage::Fetch, false) => journal.error(format!("Git fetch failed: {}", output)).await,

            (Stage::Stash, succeeded) => {
                journal
                    .info(format!(
                        "Git stash result: {}",
                        if succeeded { "SUCCESS" } else { "INFO" }
                    ))
                    .await;
                journal.info(format!("Git stash output: {}", output)).await;
            }

            (Stage::Reset, true) => {
                journal.info(format!("Git reset successful: {}", output)).await
            }
            (Stage::Reset, false) => journal.error(format!("Git reset failed: {}", output)).await,

            (Stage::Verify, true) => journal.info(format!("Latest commit: {}", output)).await,
            (Stage::Verify, false) => {
                journal
                    .warn(format!("Could not read latest commit: {}", output))
                    .await
            }

            (Stage::Clean, true) => journal.info(format!("Git clean result: {}", output)).await,
            (Stage::Clean, false) => {
                journal.warn(format!("Git clean failed: {}", output)).await
            }
        }
    }

    fn invariant_violation(&self, stage: Stage, message: String) -> DeployFailure {
        tracing::error!("Deployment state machine rejected a transition: {}", message);
        DeployFailure::Aborted(stage)
    }
}
