use super::Command;
use crate::errors::Result;
use crate::naming::TaskId;
use crate::workflow::TaskWorkflow;

pub struct LandCommand {
    pub task: TaskId,
}

impl LandCommand {
    pub fn new(task: TaskId) -> Self {
        Self { task }
    }
}

impl Command for LandCommand {
    fn execute(&self, workflow: &TaskWorkflow<'_>) -> Result<String> {
        let outcome = workflow.land(&self.task)?;
        Ok(format!("🚀 Landed {} onto {}", self.task, outcome.onto))
    }
}
