use super::Command;
use crate::errors::Result;
use crate::naming::TaskId;
use crate::workflow::{InitOutcome, TaskWorkflow};

pub struct InitCommand {
    pub task: TaskId,
}

impl InitCommand {
    pub fn new(task: TaskId) -> Self {
        Self { task }
    }

    fn summary(outcome: &InitOutcome) -> String {
        let remote = if outcome.remote_created {
            "created"
        } else {
            "already present"
        };
        let local = if outcome.local_created {
            "created"
        } else {
            "already present"
        };
        format!(
            "🌱 Integration branch {}: {remote}\n🌿 Task branch {}: {local}\n✅ Working on {}",
            outcome.integration_branch, outcome.task_branch, outcome.task_branch
        )
    }
}

impl Command for InitCommand {
    fn execute(&self, workflow: &TaskWorkflow<'_>) -> Result<String> {
        let outcome = workflow.init(&self.task)?;
        Ok(Self::summary(&outcome))
    }
}
