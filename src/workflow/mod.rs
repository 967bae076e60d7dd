//! Task workflows
//!
//! The four operations a task goes through (`init`, `request_review`, `land`,
//! `release_tag`) and the strategy consulted when a release merge conflicts.

pub mod conflict;
pub mod orchestrator;

#[cfg(test)]
mod mocks;

pub use conflict::{ConflictResolver, MergeVerdict, PromptResolver};
pub use orchestrator::{InitOutcome, ReleaseOutcome, TaskWorkflow, WorkflowSettings};
