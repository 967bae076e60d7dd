//! Review tool abstraction
//!
//! Review requests and landing are delegated to an external command line tool
//! (Phabricator's `arc` by default). Only its exit status matters.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::command::CommandExecutor;
use crate::errors::{Result, WorkflowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    RequestReview,
    Land,
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewAction::RequestReview => write!(f, "review request"),
            ReviewAction::Land => write!(f, "land"),
        }
    }
}

/// Result of a successful review tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub action: ReviewAction,
    /// Branch the review or land was aimed at
    pub onto: String,
    /// Command line that was run
    pub command: String,
}

/// Trait for the external code review tool
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ReviewTool {
    /// Create a review request against `onto`
    fn request_review(&self, onto: &str) -> Result<ReviewOutcome>;

    /// Land the reviewed changes onto `onto`
    fn land(&self, onto: &str) -> Result<ReviewOutcome>;
}

/// Review tool driven through its command line
pub struct ReviewCli {
    executor: Arc<dyn CommandExecutor>,
    program: String,
    workdir: PathBuf,
}

impl ReviewCli {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        program: impl Into<String>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            program: program.into(),
            workdir: workdir.into(),
        }
    }

    fn arguments(action: ReviewAction, onto: &str) -> Vec<String> {
        match action {
            ReviewAction::RequestReview => {
                vec!["diff".to_string(), "--create".to_string(), onto.to_string()]
            }
            ReviewAction::Land => vec!["land".to_string(), "--onto".to_string(), onto.to_string()],
        }
    }

    fn run(&self, action: ReviewAction, onto: &str) -> Result<ReviewOutcome> {
        let args = Self::arguments(action, onto);
        let command = format!("{} {}", self.program, args.join(" "));
        debug!(%command, workdir = %self.workdir.display(), "running review tool");

        let output = self
            .executor
            .execute(&self.program, &args, &self.workdir)
            .map_err(|e| WorkflowError::ReviewTool {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.success() {
            let detail = output.stderr.trim();
            let message = if detail.is_empty() {
                format!("exited with status {}", output.status_code)
            } else {
                format!("exited with status {}: {detail}", output.status_code)
            };
            return Err(WorkflowError::ReviewTool { command, message });
        }

        Ok(ReviewOutcome {
            action,
            onto: onto.to_string(),
            command,
        })
    }
}

impl ReviewTool for ReviewCli {
    fn request_review(&self, onto: &str) -> Result<ReviewOutcome> {
        self.run(ReviewAction::RequestReview, onto)
    }

    fn land(&self, onto: &str) -> Result<ReviewOutcome> {
        self.run(ReviewAction::Land, onto)
    }
}
