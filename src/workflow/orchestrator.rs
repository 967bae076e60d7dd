use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::conflict::{ConflictResolver, MergeVerdict};
use crate::errors::{Result, WorkflowError};
use crate::external::{ReviewOutcome, ReviewTool};
use crate::git::{MergeOutcome, RepositoryOperations};
use crate::guard::require_current_branch;
use crate::naming::{NamingPolicy, TaskId};
use crate::release::resolve_baseline;
use crate::telemetry::create_workflow_span;

/// Knobs shared by every workflow operation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkflowSettings {
    /// Branch releases are merged into and tagged on
    pub mainline: String,
    pub naming: NamingPolicy,
    /// Upper bound on merge attempts for one merge step
    pub max_conflict_attempts: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            mainline: "master".to_string(),
            naming: NamingPolicy::default(),
            max_conflict_attempts: 10,
        }
    }
}

/// State after `init`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    pub task_branch: String,
    pub integration_branch: String,
    /// Integration branch had to be created on the remote
    pub remote_created: bool,
    /// Task branch had to be created locally
    pub local_created: bool,
}

/// State after `release_tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub tag: String,
    /// Previous release tag, or mainline when there was none
    pub baseline: String,
    pub integration_branch: String,
    /// Baseline merged into the integration branch
    pub baseline_merge: MergeOutcome,
    /// Integration branch merged into mainline
    pub mainline_merge: MergeOutcome,
}

/// The task workflows, sequenced over one working copy
///
/// The repository's checked out branch is the only workflow state. Each
/// operation checks what it needs before acting and stops at the first
/// failure, leaving the repository where that step left it; rerunning after
/// fixing the cause picks up from there.
pub struct TaskWorkflow<'a> {
    repo: &'a dyn RepositoryOperations,
    review: &'a dyn ReviewTool,
    resolver: &'a dyn ConflictResolver,
    settings: WorkflowSettings,
}

impl<'a> TaskWorkflow<'a> {
    pub fn new(
        repo: &'a dyn RepositoryOperations,
        review: &'a dyn ReviewTool,
        resolver: &'a dyn ConflictResolver,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            repo,
            review,
            resolver,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Parse a raw task id with this workflow's naming policy
    pub fn task_id(&self, raw: &str) -> Result<TaskId> {
        self.settings.naming.validate_task_id(raw)
    }

    /// Make sure the task has its integration branch on the remote and a
    /// local working branch, then check the working branch out.
    pub fn init(&self, task: &TaskId) -> Result<InitOutcome> {
        let _span = create_workflow_span("init", task.as_str()).entered();
        let naming = &self.settings.naming;
        let integration = naming.integration_branch(task);
        let task_branch = naming.task_branch(task);

        let remote_created = !self.repo.remote_branches()?.contains(&integration);
        if remote_created {
            info!(
                branch = %integration,
                from = %self.settings.mainline,
                "creating remote integration branch"
            );
            self.repo
                .push_new_remote_branch(&self.settings.mainline, &integration)?;
        }

        let local_created = !self.repo.local_branches()?.contains(&task_branch);
        if local_created {
            info!(branch = %task_branch, "creating local task branch");
            self.repo.create_local_branch(&task_branch)?;
        }

        self.repo.checkout(&task_branch)?;
        debug!(branch = %task_branch, "task branch checked out");

        Ok(InitOutcome {
            task_branch,
            integration_branch: integration,
            remote_created,
            local_created,
        })
    }

    /// Open a review of the task branch against its integration branch
    pub fn request_review(&self, task: &TaskId) -> Result<ReviewOutcome> {
        let _span = create_workflow_span("request_review", task.as_str()).entered();
        let integration = self.prepare_review(task)?;
        self.review.request_review(&integration)
    }

    /// Land reviewed work onto the integration branch. Mainline is never a
    /// landing target.
    pub fn land(&self, task: &TaskId) -> Result<ReviewOutcome> {
        let _span = create_workflow_span("land", task.as_str()).entered();
        let integration = self.prepare_review(task)?;
        self.review.land(&integration)
    }

    fn prepare_review(&self, task: &TaskId) -> Result<String> {
        let naming = &self.settings.naming;
        require_current_branch(self.repo, &naming.task_branch(task))?;

        let integration = naming.integration_branch(task);
        self.require_remote_branch(&integration)?;
        Ok(integration)
    }

    fn require_remote_branch(&self, branch: &str) -> Result<()> {
        if !self.repo.remote_branches()?.contains(branch) {
            return Err(WorkflowError::missing_remote(branch));
        }
        Ok(())
    }

    /// Release the task: bring its integration branch up to date with the
    /// previous release, merge it into mainline and tag mainline.
    ///
    /// Steps run in order with no rollback. A failure part way leaves the
    /// completed steps in place.
    pub fn release_tag(&self, task: &TaskId) -> Result<ReleaseOutcome> {
        let _span = create_workflow_span("release_tag", task.as_str()).entered();
        let naming = &self.settings.naming;
        let mainline = self.settings.mainline.as_str();
        let integration = naming.integration_branch(task);

        self.require_remote_branch(&integration)?;

        self.repo.checkout(&integration)?;
        let pulled = self.repo.pull()?;
        debug!(branch = %integration, ?pulled, "integration branch synced");

        let baseline = resolve_baseline(self.repo, naming, mainline)?;
        debug!(%baseline, "merging baseline into integration branch");
        let baseline_merge = self.merge_with_resolution(&integration, &baseline)?;

        self.repo.push()?;
        debug!(branch = %integration, "integration branch pushed");

        self.switch_to_mainline()?;
        let mainline_merge = self.merge_with_resolution(mainline, &integration)?;

        let tag = naming.release_tag(task);
        if self.repo.tags()?.iter().any(|existing| existing.name == tag) {
            return Err(WorkflowError::TagAlreadyExists { tag });
        }

        require_current_branch(self.repo, mainline)?;
        self.repo.create_tag(&tag)?;
        self.repo.push_tag(&tag)?;
        debug!(%tag, branch = mainline, "release tag pushed");

        Ok(ReleaseOutcome {
            tag,
            baseline,
            integration_branch: integration,
            baseline_merge,
            mainline_merge,
        })
    }

    /// Check out mainline without carrying local modifications across
    fn switch_to_mainline(&self) -> Result<()> {
        let mainline = self.settings.mainline.as_str();
        if self.repo.current_branch()? == mainline {
            return Ok(());
        }
        if !self.repo.is_clean()? {
            return Err(WorkflowError::DirtyWorkingTree {
                branch: mainline.to_string(),
            });
        }
        self.repo.checkout(mainline)
    }

    /// Merge `source` into `target`, consulting the resolver on conflicts.
    ///
    /// At most `max_conflict_attempts` merges are tried.
    fn merge_with_resolution(&self, target: &str, source: &str) -> Result<MergeOutcome> {
        let max_attempts = self.settings.max_conflict_attempts.max(1);
        let mut attempt = 1;

        loop {
            require_current_branch(self.repo, target)?;
            let conflict = match self.repo.merge_into(target, source) {
                Err(WorkflowError::MergeConflict(conflict)) => conflict,
                other => return other,
            };

            debug!(attempt, files = ?conflict.files, "merge stopped on conflicts");
            if attempt >= max_attempts {
                return Err(conflict.into());
            }
            match self.resolver.resolve(&conflict) {
                MergeVerdict::Retry => attempt += 1,
                MergeVerdict::Abort => return Err(conflict.into()),
            }
        }
    }
}
