//! Error types for taskflow workflows
//!
//! Every failure a workflow operation can hit is a [`WorkflowError`]. Only
//! [`WorkflowError::MergeConflict`] has a recovery path (the conflict
//! resolution loop in the orchestrator); everything else aborts the current
//! operation and surfaces to the operator.

use std::fmt;

use thiserror::Error;

/// Result type alias for taskflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Where a branch was expected to live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchScope {
    Local,
    Remote,
}

impl fmt::Display for BranchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchScope::Local => write!(f, "local"),
            BranchScope::Remote => write!(f, "remote"),
        }
    }
}

/// A merge that stopped on conflicts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflict {
    /// Branch that was checked out and receiving the merge
    pub target: String,
    /// Ref being merged in
    pub source_ref: String,
    /// Paths with unresolved conflicts
    pub files: Vec<String>,
}

impl fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "merging '{}' into '{}' hit conflicts",
            self.source_ref, self.target
        )?;
        if !self.files.is_empty() {
            write!(f, " in: {}", self.files.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid task id '{task_id}': task ids must start with '{prefix}'")]
    InvalidTaskId { task_id: String, prefix: String },

    #[error("{scope} branch '{branch}' not found")]
    MissingBranch { branch: String, scope: BranchScope },

    #[error("current branch is '{actual}', expected '{expected}'")]
    WrongBranch { expected: String, actual: String },

    #[error("tag '{tag}' already exists")]
    TagAlreadyExists { tag: String },

    #[error("{0}")]
    MergeConflict(MergeConflict),

    #[error("working tree has uncommitted changes, commit or discard them before switching to '{branch}'")]
    DirtyWorkingTree { branch: String },

    #[error("'{path}' is not a git repository")]
    RepositoryNotFound { path: String },

    #[error("git error: {message}")]
    Repository { message: String },

    #[error("review tool `{command}` failed: {message}")]
    ReviewTool { command: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl WorkflowError {
    pub fn repository(message: impl Into<String>) -> Self {
        WorkflowError::Repository {
            message: message.into(),
        }
    }

    pub fn missing_remote(branch: impl Into<String>) -> Self {
        WorkflowError::MissingBranch {
            branch: branch.into(),
            scope: BranchScope::Remote,
        }
    }

    pub fn is_merge_conflict(&self) -> bool {
        matches!(self, WorkflowError::MergeConflict(_))
    }
}

impl From<git2::Error> for WorkflowError {
    fn from(err: git2::Error) -> Self {
        WorkflowError::Repository {
            message: err.message().to_string(),
        }
    }
}

impl From<MergeConflict> for WorkflowError {
    fn from(conflict: MergeConflict) -> Self {
        WorkflowError::MergeConflict(conflict)
    }
}

impl From<config::ConfigError> for WorkflowError {
    fn from(err: config::ConfigError) -> Self {
        WorkflowError::Config(err.to_string())
    }
}

/// Process exit status for an error. Usage mistakes exit with 2.
pub fn exit_code(error: &WorkflowError) -> u8 {
    match error {
        WorkflowError::InvalidTaskId { .. }
        | WorkflowError::RepositoryNotFound { .. }
        | WorkflowError::Config(_) => 2,
        _ => 1,
    }
}
