//! Git invocations used by a deployment

use crate::deploy::fsm::Stage;

/// Label attached to the snapshot of local modifications
pub const STASH_MESSAGE: &str = "Auto-stash before webhook deployment";

/// One-line summary of the checked-out commit: short hash, subject, author, age
pub const COMMIT_SUMMARY_FORMAT: &str = "--pretty=format:%h - %s (%an, %ar)";

/// Builds the git arguments for each deployment stage
#[derive(Debug, Clone)]
pub struct GitPlan {
    remote: String,
    branch: String,
}

impl GitPlan {
    pub fn new(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    /// `<remote>/<branch>`, the commit the working tree is reset to
    pub fn upstream(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }

    /// Arguments for the stage, or `None` for stages that do not run git
    pub fn args(&self, stage: Stage) -> Option<Vec<String>> {
        let args = match stage {
            Stage::Precondition => return None,
            Stage::Status => owned(&["status", "--porcelain"]),
            Stage::Fetch => owned(&["fetch", &self.remote, &self.branch]),
            Stage::Stash => owned(&["stash", "push", "-m", STASH_MESSAGE]),
            Stage::Reset => owned(&["reset", "--hard", &self.upstream()]),
            Stage::Verify => owned(&["log", "-1", COMMIT_SUMMARY_FORMAT]),
            Stage::Clean => owned(&["clean", "-fd"]),
        };
        Some(args)
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
