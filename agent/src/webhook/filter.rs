//! Branch selection

use crate::webhook::payload::DeployEvent;

/// Outcome of matching a push against the deployed branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchDecision {
    /// The push targets the deployed branch
    Deploy,
    /// A legitimate push to some other ref; nothing to do
    Skip,
}

/// Matches pushed refs against `refs/heads/<target branch>`.
///
/// Matching is exact and case-sensitive, as git refs are.
#[derive(Debug, Clone)]
pub struct BranchFilter {
    target_ref: String,
}

impl BranchFilter {
    pub fn new(target_branch: &str) -> Self {
        Self {
            target_ref: format!("refs/heads/{}", target_branch),
        }
    }

    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    pub fn evaluate(&self, event: &DeployEvent) -> BranchDecision {
        if event.git_ref == self.target_ref {
            BranchDecision::Deploy
        } else {
            BranchDecision::Skip
        }
    }
}
