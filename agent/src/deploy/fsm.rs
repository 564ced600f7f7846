//! Finite State Machine for a deployment run

/// Deployment stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The working tree exists and is a directory
    Precondition,

    /// List local modifications (informational)
    Status,

    /// Fetch the target branch from the remote
    Fetch,

    /// Set local modifications aside (best effort)
    Stash,

    /// Force the working tree to the fetched branch tip
    Reset,

    /// Read back the checked-out commit (informational)
    Verify,

    /// Remove untracked files (best effort)
    Clean,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Precondition,
        Stage::Status,
        Stage::Fetch,
        Stage::Stash,
        Stage::Reset,
        Stage::Verify,
        Stage::Clean,
    ];

    /// Whether a failure of this stage aborts the deployment
    pub fn is_required(&self) -> bool {
        matches!(self, Stage::Precondition | Stage::Fetch | Stage::Reset)
    }

    /// The stage that runs after this one
    pub fn next(&self) -> Option<Stage> {
        let index = Stage::ALL.iter().position(|s| s == self)?;
        Stage::ALL.get(index + 1).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Precondition => "precondition",
            Stage::Status => "status",
            Stage::Fetch => "fetch",
            Stage::Stash => "stash",
            Stage::Reset => "reset",
            Stage::Verify => "verify",
            Stage::Clean => "clean",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Deployment state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentState {
    /// Not started
    Pending,

    /// The given stage is executing
    Running(Stage),

    /// Every stage ran and no required stage failed
    Succeeded,

    /// The given required stage failed; later stages never ran
    Failed(Stage),
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    /// Start the first stage
    Begin,

    /// The stage finished successfully
    StageSucceeded(Stage),

    /// The stage failed, with its output
    StageFailed(Stage, String),
}

/// Deployment FSM
#[derive(Debug, Clone)]
pub struct DeploymentFsm {
    state: DeploymentState,
    error: Option<String>,
    warnings: Vec<Stage>,
}

impl DeploymentFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: DeploymentState::Pending,
            error: None,
            warnings: Vec::new(),
        }
    }

    /// Get current state
    pub fn state(&self) -> &DeploymentState {
        &self.state
    }

    /// Output of the required stage that failed, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Non-required stages that failed along the way
    pub fn warnings(&self) -> &[Stage] {
        &self.warnings
    }

    /// True once the run has succeeded or failed
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            DeploymentState::Succeeded | DeploymentState::Failed(_)
        )
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeploymentEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (DeploymentState::Pending, DeploymentEvent::Begin) => {
                DeploymentState::Running(Stage::ALL[0])
            }

            (DeploymentState::Running(current), DeploymentEvent::StageSucceeded(stage))
                if current == stage =>
            {
                advance(*stage)
            }

            (DeploymentState::Running(current), DeploymentEvent::StageFailed(stage, output))
                if current == stage =>
            {
                if stage.is_required() {
                    self.error = Some(output.clone());
                    DeploymentState::Failed(*stage)
                } else {
                    self.warnings.push(*stage);
                    advance(*stage)
                }
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

fn advance(stage: Stage) -> DeploymentState {
    match stage.next() {
        Some(next) => DeploymentState::Running(next),
        None => DeploymentState::Succeeded,
    }
}

impl Default for DeploymentFsm {
    fn default() -> Self {
        Self::new()
    }
}
