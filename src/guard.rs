//! Current-branch precondition checks
//!
//! Every mutating step that assumes a particular checkout (merging, tagging,
//! handing the branch to the review tool) calls [`require_current_branch`]
//! immediately before acting.

use tracing::debug;

use crate::errors::{Result, WorkflowError};
use crate::git::RepositoryOperations;

pub fn require_current_branch(repo: &dyn RepositoryOperations, expected: &str) -> Result<()> {
    let actual = repo.current_branch()?;
    if actual != expected {
        return Err(WorkflowError::WrongBranch {
            expected: expected.to_string(),
            actual,
        });
    }
    debug!(branch = expected, "current branch confirmed");
    Ok(())
}
