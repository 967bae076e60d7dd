// In-memory repository and scripted collaborators for workflow tests

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use chrono::DateTime;

use super::conflict::{ConflictResolver, MergeVerdict};
use crate::errors::{BranchScope, MergeConflict, Result, WorkflowError};
use crate::git::{MergeOutcome, RepositoryOperations, TagInfo};

/// Mutating calls, in the order they were made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCall {
    Checkout(String),
    Pull,
    Push(String),
    Merge { target: String, source: String },
    CreateLocalBranch(String),
    PushNewRemoteBranch { source: String, destination: String },
    CreateTag(String),
    PushTag(String),
}

/// Commit graph with local branches, remote branches and tags
#[derive(Debug)]
pub struct InMemoryRepository {
    pub(super) current: RefCell<String>,
    pub(super) parents: RefCell<HashMap<u32, Vec<u32>>>,
    pub(super) next_commit: Cell<u32>,
    pub(super) local: RefCell<BTreeMap<String, u32>>,
    pub(super) remote: RefCell<BTreeMap<String, u32>>,
    pub(super) tags: RefCell<BTreeMap<String, u32>>,
    pub(super) remote_tags: RefCell<BTreeSet<String>>,
    pub(super) clean: Cell<bool>,
    pub(super) conflicts: RefCell<HashMap<(String, String), u32>>,
    pub(super) calls: RefCell<Vec<RepoCall>>,
}

impl InMemoryRepository {
    /// Repository with one commit on `mainline`, which is checked out and pushed
    pub fn new(mainline: &str) -> Self {
        let repo = Self {
            current: RefCell::new(mainline.to_string()),
            parents: RefCell::new(HashMap::new()),
            next_commit: Cell::new(1),
            local: RefCell::new(BTreeMap::new()),
            remote: RefCell::new(BTreeMap::new()),
            tags: RefCell::new(BTreeMap::new()),
            remote_tags: RefCell::new(BTreeSet::new()),
            clean: Cell::new(true),
            conflicts: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
        };
        let root = repo.new_commit(&[]);
        repo.local.borrow_mut().insert(mainline.to_string(), root);
        repo.remote.borrow_mut().insert(mainline.to_string(), root);
        repo
    }

    fn new_commit(&self, parents: &[u32]) -> u32 {
        let id = self.next_commit.get();
        self.next_commit.set(id + 1);
        self.parents.borrow_mut().insert(id, parents.to_vec());
        id
    }

    fn is_ancestor(&self, ancestor: u32, descendant: u32) -> bool {
        let parents = self.parents.borrow();
        let mut pending = vec![descendant];
        let mut seen = BTreeSet::new();
        while let Some(commit) = pending.pop() {
            if commit == ancestor {
                return true;
            }
            if seen.insert(commit) {
                pending.extend(parents.get(&commit).into_iter().flatten().copied());
            }
        }
        false
    }

    pub fn commit_name(id: u32) -> String {
        format!("{id:040}")
    }

    pub fn set_current_branch(&self, branch: &str) {
        *self.current.borrow_mut() = branch.to_string();
    }

    pub fn set_clean(&self, clean: bool) {
        self.clean.set(clean);
    }

    /// Add a local branch pointing where `from` points
    pub fn add_local_branch(&self, name: &str, from: &str) {
        let tip = self.local_tip(from).expect("source branch exists");
        self.local.borrow_mut().insert(name.to_string(), tip);
    }

    /// Add a remote branch pointing where local `from` points
    pub fn add_remote_branch(&self, name: &str, from: &str) {
        let tip = self.local_tip(from).expect("source branch exists");
        self.remote.borrow_mut().insert(name.to_string(), tip);
    }

    /// Someone else pushed a commit to a remote branch
    pub fn advance_remote(&self, branch: &str) -> u32 {
        let tip = self.remote.borrow()[branch];
        let commit = self.new_commit(&[tip]);
        self.remote.borrow_mut().insert(branch.to_string(), commit);
        commit
    }

    /// Commit on a local branch
    pub fn advance_local(&self, branch: &str) -> u32 {
        let tip = self.local.borrow()[branch];
        let commit = self.new_commit(&[tip]);
        self.local.borrow_mut().insert(branch.to_string(), commit);
        commit
    }

    pub fn add_tag(&self, name: &str, commit: u32) {
        self.tags.borrow_mut().insert(name.to_string(), commit);
    }

    /// The next `times` merges of `source` into `target` conflict
    pub fn set_merge_conflicts(&self, target: &str, source: &str, times: u32) {
        self.conflicts
            .borrow_mut()
            .insert((target.to_string(), source.to_string()), times);
    }

    pub fn local_tip(&self, branch: &str) -> Option<u32> {
        self.local.borrow().get(branch).copied()
    }

    pub fn remote_tip(&self, branch: &str) -> Option<u32> {
        self.remote.borrow().get(branch).copied()
    }

    pub fn tag_target(&self, tag: &str) -> Option<u32> {
        self.tags.borrow().get(tag).copied()
    }

    pub fn parents_of(&self, commit: u32) -> Vec<u32> {
        self.parents.borrow().get(&commit).cloned().unwrap_or_default()
    }

    pub fn tag_pushed(&self, tag: &str) -> bool {
        self.remote_tags.borrow().contains(tag)
    }

    pub fn calls(&self) -> Vec<RepoCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: RepoCall) {
        self.calls.borrow_mut().push(call);
    }

    fn resolve(&self, reference: &str) -> Result<u32> {
        self.local_tip(reference)
            .or_else(|| self.tag_target(reference))
            .ok_or_else(|| WorkflowError::repository(format!("ref '{reference}' not found")))
    }

    fn take_conflict(&self, target: &str, source: &str) -> bool {
        let mut conflicts = self.conflicts.borrow_mut();
        match conflicts.get_mut(&(target.to_string(), source.to_string())) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn merge_commits(&self, target: &str, source_commit: u32) -> MergeOutcome {
        let target_commit = self.local.borrow()[target];
        if self.is_ancestor(source_commit, target_commit) {
            return MergeOutcome::UpToDate;
        }
        if self.is_ancestor(target_commit, source_commit) {
            self.local
                .borrow_mut()
                .insert(target.to_string(), source_commit);
            return MergeOutcome::FastForward {
                commit: Self::commit_name(source_commit),
            };
        }
        let merge = self.new_commit(&[target_commit, source_commit]);
        self.local.borrow_mut().insert(target.to_string(), merge);
        MergeOutcome::Merged {
            commit: Self::commit_name(merge),
        }
    }
}

impl RepositoryOperations for InMemoryRepository {
    fn current_branch(&self) -> Result<String> {
        Ok(self.current.borrow().clone())
    }

    fn local_branches(&self) -> Result<BTreeSet<String>> {
        Ok(self.local.borrow().keys().cloned().collect())
    }

    fn remote_branches(&self) -> Result<BTreeSet<String>> {
        Ok(self.remote.borrow().keys().cloned().collect())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.record(RepoCall::Checkout(branch.to_string()));
        if self.local_tip(branch).is_none() {
            let tip = self
                .remote_tip(branch)
                .ok_or_else(|| WorkflowError::MissingBranch {
                    branch: branch.to_string(),
                    scope: BranchScope::Local,
                })?;
            self.local.borrow_mut().insert(branch.to_string(), tip);
        }
        self.set_current_branch(branch);
        Ok(())
    }

    fn pull(&self) -> Result<MergeOutcome> {
        self.record(RepoCall::Pull);
        let branch = self.current_branch()?;
        let upstream = self
            .remote_tip(&branch)
            .ok_or_else(|| WorkflowError::missing_remote(branch.clone()))?;
        Ok(self.merge_commits(&branch, upstream))
    }

    fn push(&self) -> Result<()> {
        let branch = self.current_branch()?;
        self.record(RepoCall::Push(branch.clone()));
        let tip = self.local.borrow()[&branch];
        self.remote.borrow_mut().insert(branch, tip);
        Ok(())
    }

    fn merge_into(&self, target: &str, source: &str) -> Result<MergeOutcome> {
        self.record(RepoCall::Merge {
            target: target.to_string(),
            source: source.to_string(),
        });
        let current = self.current_branch()?;
        if current != target {
            return Err(WorkflowError::WrongBranch {
                expected: target.to_string(),
                actual: current,
            });
        }
        if self.take_conflict(target, source) {
            return Err(MergeConflict {
                target: target.to_string(),
                source_ref: source.to_string(),
                files: vec!["README.md".to_string()],
            }
            .into());
        }
        let source_commit = self.resolve(source)?;
        Ok(self.merge_commits(target, source_commit))
    }

    fn create_local_branch(&self, name: &str) -> Result<()> {
        self.record(RepoCall::CreateLocalBranch(name.to_string()));
        if self.local_tip(name).is_some() {
            return Err(WorkflowError::repository(format!(
                "branch '{name}' already exists"
            )));
        }
        let head = self.local.borrow()[&*self.current.borrow()];
        self.local.borrow_mut().insert(name.to_string(), head);
        Ok(())
    }

    fn push_new_remote_branch(&self, source: &str, destination: &str) -> Result<()> {
        self.record(RepoCall::PushNewRemoteBranch {
            source: source.to_string(),
            destination: destination.to_string(),
        });
        let tip = self
            .local_tip(source)
            .ok_or_else(|| WorkflowError::MissingBranch {
                branch: source.to_string(),
                scope: BranchScope::Local,
            })?;
        self.remote
            .borrow_mut()
            .insert(destination.to_string(), tip);
        Ok(())
    }

    fn tags(&self) -> Result<Vec<TagInfo>> {
        Ok(self
            .tags
            .borrow()
            .iter()
            .map(|(name, commit)| TagInfo {
                name: name.clone(),
                commit: Self::commit_name(*commit),
                committed_at: DateTime::from_timestamp(1_700_000_000 + i64::from(*commit) * 60, 0)
                    .expect("valid timestamp"),
            })
            .collect())
    }

    fn create_tag(&self, name: &str) -> Result<()> {
        self.record(RepoCall::CreateTag(name.to_string()));
        if self.tag_target(name).is_some() {
            return Err(WorkflowError::TagAlreadyExists {
                tag: name.to_string(),
            });
        }
        let head = self.local.borrow()[&*self.current.borrow()];
        self.tags.borrow_mut().insert(name.to_string(), head);
        Ok(())
    }

    fn push_tag(&self, name: &str) -> Result<()> {
        self.record(RepoCall::PushTag(name.to_string()));
        self.remote_tags.borrow_mut().insert(name.to_string());
        Ok(())
    }

    fn is_clean(&self) -> Result<bool> {
        Ok(self.clean.get())
    }
}

/// Hands out prepared verdicts, then aborts
#[derive(Debug, Default)]
pub struct ScriptedResolver {
    verdicts: RefCell<VecDeque<MergeVerdict>>,
    seen: RefCell<Vec<MergeConflict>>,
}

impl ScriptedResolver {
    pub fn new(verdicts: impl IntoIterator<Item = MergeVerdict>) -> Self {
        Self {
            verdicts: RefCell::new(verdicts.into_iter().collect()),
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<MergeConflict> {
        self.seen.borrow().clone()
    }
}

impl ConflictResolver for ScriptedResolver {
    fn resolve(&self, conflict: &MergeConflict) -> MergeVerdict {
        self.seen.borrow_mut().push(conflict.clone());
        self.verdicts
            .borrow_mut()
            .pop_front()
            .unwrap_or(MergeVerdict::Abort)
    }
}

/// Always retries
#[derive(Debug, Default)]
pub struct StubbornResolver {
    pub asked: Cell<u32>,
}

impl ConflictResolver for StubbornResolver {
    fn resolve(&self, _conflict: &MergeConflict) -> MergeVerdict {
        self.asked.set(self.asked.get() + 1);
        MergeVerdict::Retry
    }
}
