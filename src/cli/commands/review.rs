use super::Command;
use crate::errors::Result;
use crate::naming::TaskId;
use crate::workflow::TaskWorkflow;

/// `diff`: open a review of the task branch
pub struct ReviewCommand {
    pub task: TaskId,
}

impl ReviewCommand {
    pub fn new(task: TaskId) -> Self {
        Self { task }
    }
}

impl Command for ReviewCommand {
    fn execute(&self, workflow: &TaskWorkflow<'_>) -> Result<String> {
        let outcome = workflow.request_review(&self.task)?;
        Ok(format!(
            "📝 Review requested against {}\n   ({})",
            outcome.onto, outcome.command
        ))
    }
}
