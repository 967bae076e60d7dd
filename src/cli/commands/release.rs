use super::Command;
use crate::errors::Result;
use crate::git::MergeOutcome;
use crate::naming::TaskId;
use crate::workflow::{ReleaseOutcome, TaskWorkflow};

/// `prd`: merge the task into mainline and tag the release
pub struct ReleaseCommand {
    pub task: TaskId,
}

impl ReleaseCommand {
    pub fn new(task: TaskId) -> Self {
        Self { task }
    }

    fn describe(merge: &MergeOutcome) -> String {
        match merge {
            MergeOutcome::UpToDate => "already up to date".to_string(),
            MergeOutcome::FastForward { commit } => format!("fast-forwarded to {}", short(commit)),
            MergeOutcome::Merged { commit } => format!("merge commit {}", short(commit)),
        }
    }

    fn summary(&self, outcome: &ReleaseOutcome, mainline: &str) -> String {
        format!(
            "🔀 {baseline} -> {integration}: {first}\n🔀 {integration} -> {mainline}: {second}\n🏷️  Tagged {mainline} as {tag}",
            baseline = outcome.baseline,
            integration = outcome.integration_branch,
            first = Self::describe(&outcome.baseline_merge),
            second = Self::describe(&outcome.mainline_merge),
            tag = outcome.tag,
        )
    }
}

fn short(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}

impl Command for ReleaseCommand {
    fn execute(&self, workflow: &TaskWorkflow<'_>) -> Result<String> {
        let outcome = workflow.release_tag(&self.task)?;
        Ok(self.summary(&outcome, &workflow.settings().mainline))
    }
}
