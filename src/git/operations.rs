use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::errors::Result;

/// A tag together with the commit it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub name: String,
    pub commit: String,
    pub committed_at: DateTime<Utc>,
}

/// What a merge actually did to the checked out branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Source was already contained in the target
    UpToDate,
    /// Target moved forward to the source commit
    FastForward { commit: String },
    /// A merge commit was created
    Merged { commit: String },
}

/// Trait defining the version-control primitives the workflows are built on
///
/// Every operation acts on the single working copy the implementation was
/// opened on, and most of them read or move its checked out branch.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait RepositoryOperations {
    /// Name of the checked out branch (fails on a detached HEAD)
    fn current_branch(&self) -> Result<String>;

    /// Local branch names (replaces `git branch --list`)
    fn local_branches(&self) -> Result<BTreeSet<String>>;

    /// Branch names known for the remote, without the `<remote>/` prefix
    fn remote_branches(&self) -> Result<BTreeSet<String>>;

    /// Switch branches, creating a tracking branch when only the remote one exists
    fn checkout(&self, branch: &str) -> Result<()>;

    /// Fetch and integrate the upstream of the checked out branch (replaces `git pull`)
    fn pull(&self) -> Result<MergeOutcome>;

    /// Push the checked out branch to the same name on the remote
    fn push(&self) -> Result<()>;

    /// Merge `source` into `target`, which has to be checked out
    ///
    /// Conflicts are reported as `WorkflowError::MergeConflict` with the merge
    /// left in progress. Calling again after the conflicts were resolved in
    /// the working tree concludes that merge.
    fn merge_into(&self, target: &str, source: &str) -> Result<MergeOutcome>;

    /// Create a local branch at HEAD (replaces `git branch <name>`)
    fn create_local_branch(&self, name: &str) -> Result<()>;

    /// Create `destination` on the remote from local `source` (`git push <remote> source:destination`)
    fn push_new_remote_branch(&self, source: &str, destination: &str) -> Result<()>;

    /// All tags with their commit times
    fn tags(&self) -> Result<Vec<TagInfo>>;

    /// Lightweight tag on HEAD
    fn create_tag(&self, name: &str) -> Result<()>;

    fn push_tag(&self, name: &str) -> Result<()>;

    /// True when tracked files have no staged or unstaged changes
    fn is_clean(&self) -> Result<bool>;
}
