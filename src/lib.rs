// Taskflow library - task branch workflows over git and an external review tool
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod errors;
pub mod external;
pub mod git;
pub mod guard;
pub mod naming;
pub mod release;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::TaskflowConfig;
pub use errors::{exit_code, BranchScope, MergeConflict, Result, WorkflowError};
pub use external::{CommandExecutor, ProcessCommandExecutor, ReviewCli, ReviewOutcome, ReviewTool};
pub use git::{Git2Repository, MergeOutcome, RepositoryOperations, TagInfo};
pub use guard::require_current_branch;
pub use naming::{NamingPolicy, TaskId};
pub use release::{latest_release_tag, resolve_baseline};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    ConflictResolver, InitOutcome, MergeVerdict, PromptResolver, ReleaseOutcome, TaskWorkflow,
    WorkflowSettings,
};
