//! Branch and tag naming
//!
//! Every task owns two branches and at most one release tag. The names are
//! pure functions of the task id:
//!
//! | name                  | default          |
//! |-----------------------|------------------|
//! | task working branch   | `<task>`         |
//! | integration branch    | `BRANCH_<task>`  |
//! | release tag           | `PRD_<task>`     |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, WorkflowError};

/// A validated task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Prefixes used to derive branch and tag names
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NamingPolicy {
    /// Every task id has to start with this
    pub task_prefix: String,
    /// Prefix of the shared integration branch on the remote
    pub integration_prefix: String,
    /// Prefix of release tags stamped on mainline
    pub release_prefix: String,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self {
            task_prefix: "T".to_string(),
            integration_prefix: "BRANCH_".to_string(),
            release_prefix: "PRD_".to_string(),
        }
    }
}

impl NamingPolicy {
    /// Check the task id format and wrap it.
    ///
    /// Only the prefix is enforced; an id consisting of the prefix alone is
    /// accepted.
    pub fn validate_task_id(&self, raw: &str) -> Result<TaskId> {
        if raw.is_empty() || !raw.starts_with(self.task_prefix.as_str()) {
            return Err(WorkflowError::InvalidTaskId {
                task_id: raw.to_string(),
                prefix: self.task_prefix.clone(),
            });
        }
        Ok(TaskId(raw.to_string()))
    }

    /// Local working branch for a task
    pub fn task_branch(&self, task: &TaskId) -> String {
        task.0.clone()
    }

    pub fn integration_branch(&self, task: &TaskId) -> String {
        format!("{}{}", self.integration_prefix, task)
    }

    pub fn release_tag(&self, task: &TaskId) -> String {
        format!("{}{}", self.release_prefix, task)
    }

    pub fn is_release_tag(&self, tag: &str) -> bool {
        tag.starts_with(self.release_prefix.as_str())
    }
}
