use std::collections::BTreeSet;
use std::path::Path;

use chrono::DateTime;
use git2::build::CheckoutBuilder;
use git2::{
    AnnotatedCommit, Branch, BranchType, Commit, Cred, CredentialType, ErrorCode, FetchOptions,
    Index, ObjectType, Oid, PushOptions, RemoteCallbacks, Repository, RepositoryState, Signature,
    StatusOptions,
};
use tracing::{debug, info};

use super::operations::{MergeOutcome, RepositoryOperations, TagInfo};
use crate::errors::{BranchScope, MergeConflict, Result, WorkflowError};

/// Implementation of RepositoryOperations using git2
pub struct Git2Repository {
    repo: Repository,
    remote: String,
}

impl Git2Repository {
    /// Open an existing working copy. `path` itself must be the repository root.
    pub fn open<P: AsRef<Path>>(path: P, remote: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|_| WorkflowError::RepositoryNotFound {
            path: path.display().to_string(),
        })?;
        Ok(Self {
            repo,
            remote: remote.into(),
        })
    }

    fn get_signature(&self) -> Result<Signature<'static>> {
        // Try to get signature from config, fall back to defaults
        match self.repo.signature() {
            Ok(sig) => Ok(sig),
            Err(_) => Ok(Signature::now("taskflow", "taskflow@localhost")?),
        }
    }

    fn tracking_ref(&self, branch: &str) -> String {
        format!("refs/remotes/{}/{}", self.remote, branch)
    }

    fn head_commit(&self) -> Result<Commit<'_>> {
        Ok(self.repo.head()?.peel_to_commit()?)
    }

    /// Reload the index from disk; other handles may have written it since
    fn refresh_index(&self) -> Result<()> {
        self.repo.index()?.read(true)?;
        Ok(())
    }

    fn resolve_commit(&self, rev: &str) -> Result<Commit<'_>> {
        self.repo
            .revparse_single(rev)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| match e.code() {
                ErrorCode::NotFound => WorkflowError::repository(format!("ref '{rev}' not found")),
                _ => e.into(),
            })
    }

    /// Name of the multi-step operation the repository is in the middle of
    fn pending_operation(&self) -> Option<&'static str> {
        match self.repo.state() {
            RepositoryState::Clean => None,
            RepositoryState::Merge => Some("merge"),
            RepositoryState::Revert | RepositoryState::RevertSequence => Some("revert"),
            RepositoryState::CherryPick | RepositoryState::CherryPickSequence => {
                Some("cherry-pick")
            }
            RepositoryState::Bisect => Some("bisect"),
            RepositoryState::Rebase
            | RepositoryState::RebaseInteractive
            | RepositoryState::RebaseMerge => Some("rebase"),
            RepositoryState::ApplyMailbox | RepositoryState::ApplyMailboxOrRebase => Some("am"),
        }
    }

    /// Create a local branch following `<remote>/<branch>`
    fn track_remote_branch(&self, branch: &str) -> Result<Branch<'_>> {
        let remote_name = format!("{}/{}", self.remote, branch);
        let remote_branch = match self.repo.find_branch(&remote_name, BranchType::Remote) {
            Ok(found) => found,
            Err(e) if e.code() == ErrorCode::NotFound => {
                return Err(WorkflowError::MissingBranch {
                    branch: branch.to_string(),
                    scope: BranchScope::Local,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let commit = remote_branch.get().peel_to_commit()?;
        info!(branch, upstream = %remote_name, "creating local tracking branch");
        let mut local = self.repo.branch(branch, &commit, false)?;
        if let Err(e) = local.set_upstream(Some(remote_name.as_str())) {
            debug!(branch, error = %e, "could not record upstream");
        }
        Ok(local)
    }

    fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
        let mut callbacks = RemoteCallbacks::new();
        let mut attempts = 0u8;
        callbacks.credentials(move |url, username_from_url, allowed_types| {
            attempts += 1;
            if attempts > 3 {
                return Err(git2::Error::from_str("authentication failed"));
            }
            let username = username_from_url.unwrap_or("git");

            if allowed_types.contains(CredentialType::SSH_KEY) {
                if attempts == 1 {
                    return Cred::ssh_key_from_agent(username);
                }
                return Cred::ssh_key(
                    username,
                    None,
                    Path::new(&format!(
                        "{}/.ssh/id_rsa",
                        std::env::var("HOME").unwrap_or_default()
                    )),
                    None,
                );
            }

            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                let config = git2::Config::open_default()?;
                return Cred::credential_helper(&config, url, username_from_url);
            }

            Cred::default()
        });
        callbacks
    }

    fn fetch_branch(&self, branch: &str) -> Result<()> {
        let mut remote = self.repo.find_remote(&self.remote).map_err(|_| {
            WorkflowError::repository(format!("remote '{}' not found", self.remote))
        })?;

        let refspec = format!("+refs/heads/{branch}:{}", self.tracking_ref(branch));
        let mut options = FetchOptions::new();
        options.remote_callbacks(Self::remote_callbacks());

        debug!(remote = %self.remote, %refspec, "fetching");
        remote.fetch(&[refspec.as_str()], Some(&mut options), None)?;
        Ok(())
    }

    /// Push refspecs and fail if the remote rejected any of them
    fn push_refspecs(&self, refspecs: &[String]) -> Result<()> {
        let mut remote = self.repo.find_remote(&self.remote).map_err(|_| {
            WorkflowError::repository(format!("remote '{}' not found", self.remote))
        })?;

        let mut rejections = Vec::new();
        {
            let mut callbacks = Self::remote_callbacks();
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    rejections.push(format!("{refname}: {message}"));
                }
                Ok(())
            });

            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);

            debug!(remote = %self.remote, ?refspecs, "pushing");
            remote.push(refspecs, Some(&mut options))?;
        }

        if !rejections.is_empty() {
            return Err(WorkflowError::repository(format!(
                "push rejected by '{}': {}",
                self.remote,
                rejections.join("; ")
            )));
        }
        Ok(())
    }

    /// Point `<remote>/<branch>` at what was just pushed, as `git push` does
    fn update_tracking_ref(&self, branch: &str, target: Oid) -> Result<()> {
        self.repo.reference(
            &self.tracking_ref(branch),
            target,
            true,
            "taskflow: update by push",
        )?;
        Ok(())
    }

    fn branch_tip(&self, branch: &str) -> Result<Oid> {
        let found = self
            .repo
            .find_branch(branch, BranchType::Local)
            .map_err(|e| match e.code() {
                ErrorCode::NotFound => WorkflowError::MissingBranch {
                    branch: branch.to_string(),
                    scope: BranchScope::Local,
                },
                _ => e.into(),
            })?;
        Ok(found.get().peel_to_commit()?.id())
    }

    fn require_head(&self, target: &str) -> Result<()> {
        let actual = self.current_branch()?;
        if actual != target {
            return Err(WorkflowError::WrongBranch {
                expected: target.to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Merge an annotated commit into the checked out `target`
    fn merge_annotated(
        &self,
        target: &str,
        annotated: &AnnotatedCommit<'_>,
        label: &str,
    ) -> Result<MergeOutcome> {
        self.refresh_index()?;
        let (analysis, _) = self.repo.merge_analysis(&[annotated])?;

        if analysis.is_up_to_date() {
            debug!(branch = target, source = label, "already up to date");
            return Ok(MergeOutcome::UpToDate);
        }

        if analysis.is_fast_forward() {
            let commit = self.repo.find_commit(annotated.id())?;
            self.repo
                .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().safe()))?;
            let mut reference = self.repo.find_reference(&format!("refs/heads/{target}"))?;
            reference.set_target(annotated.id(), &format!("merge {label}: Fast-forward"))?;
            debug!(branch = target, source = label, commit = %annotated.id(), "fast-forwarded");
            return Ok(MergeOutcome::FastForward {
                commit: annotated.id().to_string(),
            });
        }

        self.repo
            .merge(&[annotated], None, Some(CheckoutBuilder::new().safe()))?;

        let index = self.repo.index()?;
        if index.has_conflicts() {
            return Err(MergeConflict {
                target: target.to_string(),
                source_ref: label.to_string(),
                files: conflicted_paths(&index)?,
            }
            .into());
        }

        let message = format!("Merge {label} into {target}");
        self.conclude_merge(&message)
    }

    /// Commit the in-progress merge with HEAD and every MERGE_HEAD as parents
    fn conclude_merge(&self, message: &str) -> Result<MergeOutcome> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        index.write()?;
        let tree = self.repo.find_tree(tree_id)?;

        let mut parents = vec![self.head_commit()?];
        for oid in self.merge_heads()? {
            parents.push(self.repo.find_commit(oid)?);
        }
        let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();

        let signature = self.get_signature()?;
        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parent_refs,
        )?;
        self.repo.cleanup_state()?;

        debug!(commit = %oid, "created merge commit");
        Ok(MergeOutcome::Merged {
            commit: oid.to_string(),
        })
    }

    fn merge_heads(&self) -> Result<Vec<Oid>> {
        self.read_oids("MERGE_HEAD")
    }

    /// Commit ids listed in a file under `.git`, empty when it is missing
    fn read_oids(&self, file: &str) -> Result<Vec<Oid>> {
        let path = self.repo.path().join(file);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(WorkflowError::repository(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| Oid::from_str(line).map_err(WorkflowError::from))
            .collect()
    }

    /// MERGE_MSG with `#` comment lines stripped, as `git commit` does
    fn merge_message(&self) -> Option<String> {
        let raw = std::fs::read_to_string(self.repo.path().join("MERGE_MSG")).ok()?;
        git2::message_prettify(raw, Some(b'#'))
            .ok()
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
    }

    /// Finish a merge the operator resolved by hand, if one is pending.
    /// Only a merge of `source` started on the current HEAD of `target` is
    /// concluded; anything else is left for the operator.
    fn resume_merge(&self, target: &str, source: &str) -> Result<Option<MergeOutcome>> {
        if self.repo.state() != RepositoryState::Merge {
            return Ok(None);
        }

        let source_id = self.resolve_commit(source)?.id();
        let pending = self.merge_heads()?;
        let started_from = self.read_oids("ORIG_HEAD")?;
        let head = self.head_commit()?.id();
        let same_branch = started_from.first().map_or(true, |oid| *oid == head);

        if pending != [source_id] || !same_branch {
            let heads: Vec<String> = pending.iter().map(Oid::to_string).collect();
            return Err(WorkflowError::repository(format!(
                "a merge of {} into '{target}' is already in progress; commit or abort it before merging '{source}'",
                heads.join(", ")
            )));
        }

        let mut index = self.repo.index()?;
        index.read(true)?;
        if index.has_conflicts() {
            return Err(MergeConflict {
                target: target.to_string(),
                source_ref: source.to_string(),
                files: conflicted_paths(&index)?,
            }
            .into());
        }

        let message = self
            .merge_message()
            .unwrap_or_else(|| format!("Merge {source} into {target}"));
        self.conclude_merge(&message).map(Some)
    }
}

fn conflicted_paths(index: &Index) -> Result<Vec<String>> {
    let mut files = BTreeSet::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
        if let Some(entry) = entry {
            files.insert(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    Ok(files.into_iter().collect())
}

impl RepositoryOperations for Git2Repository {
    fn current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;
        if !head.is_branch() {
            return Err(WorkflowError::repository("HEAD is detached"));
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| WorkflowError::repository("HEAD is not valid UTF-8"))
    }

    fn local_branches(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for entry in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                names.insert(name.to_string());
            }
        }
        Ok(names)
    }

    fn remote_branches(&self) -> Result<BTreeSet<String>> {
        let prefix = format!("{}/", self.remote);
        let mut names = BTreeSet::new();
        for entry in self.repo.branches(Some(BranchType::Remote))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                if let Some(short) = name.strip_prefix(prefix.as_str()) {
                    if short != "HEAD" {
                        names.insert(short.to_string());
                    }
                }
            }
        }
        Ok(names)
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        if let Some(operation) = self.pending_operation() {
            return Err(WorkflowError::repository(format!(
                "cannot check out '{branch}' while a {operation} is in progress; commit or abort it first"
            )));
        }
        self.refresh_index()?;

        let local = match self.repo.find_branch(branch, BranchType::Local) {
            Ok(found) => found,
            Err(e) if e.code() == ErrorCode::NotFound => self.track_remote_branch(branch)?,
            Err(e) => return Err(e.into()),
        };

        let reference = local.into_reference();
        let refname = reference
            .name()
            .ok_or_else(|| WorkflowError::repository(format!("branch '{branch}' has an invalid name")))?
            .to_string();
        let commit = reference.peel_to_commit()?;

        self.repo
            .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().safe()))?;
        self.repo.set_head(&refname)?;

        debug!(branch, "checked out");
        Ok(())
    }

    fn pull(&self) -> Result<MergeOutcome> {
        let branch = self.current_branch()?;
        self.fetch_branch(&branch)?;

        let upstream = self.tracking_ref(&branch);
        let reference = self.repo.find_reference(&upstream).map_err(|e| match e.code() {
            ErrorCode::NotFound => WorkflowError::missing_remote(branch.clone()),
            _ => e.into(),
        })?;
        let annotated = self.repo.reference_to_annotated_commit(&reference)?;

        let label = format!("{}/{}", self.remote, branch);
        self.merge_annotated(&branch, &annotated, &label)
            .map_err(|e| match e {
                WorkflowError::MergeConflict(conflict) => WorkflowError::repository(format!(
                    "pull of '{branch}' needs a manual merge ({conflict})"
                )),
                other => other,
            })
    }

    fn push(&self) -> Result<()> {
        let branch = self.current_branch()?;
        let tip = self.branch_tip(&branch)?;
        self.push_refspecs(&[format!("refs/heads/{branch}:refs/heads/{branch}")])?;
        self.update_tracking_ref(&branch, tip)
    }

    fn merge_into(&self, target: &str, source: &str) -> Result<MergeOutcome> {
        self.require_head(target)?;

        if let Some(outcome) = self.resume_merge(target, source)? {
            return Ok(outcome);
        }

        let commit = self.resolve_commit(source)?;
        let annotated = self.repo.find_annotated_commit(commit.id())?;
        self.merge_annotated(target, &annotated, source)
    }

    fn create_local_branch(&self, name: &str) -> Result<()> {
        let head = self.head_commit()?;
        self.repo.branch(name, &head, false).map_err(|e| match e.code() {
            ErrorCode::Exists => WorkflowError::repository(format!("branch '{name}' already exists")),
            _ => e.into(),
        })?;
        Ok(())
    }

    fn push_new_remote_branch(&self, source: &str, destination: &str) -> Result<()> {
        let tip = self.branch_tip(source)?;
        self.push_refspecs(&[format!("refs/heads/{source}:refs/heads/{destination}")])?;
        self.update_tracking_ref(destination, tip)
    }

    fn tags(&self) -> Result<Vec<TagInfo>> {
        let names = self.repo.tag_names(None)?;
        let mut tags = Vec::with_capacity(names.len());

        for name in names.iter().flatten() {
            let reference = self.repo.find_reference(&format!("refs/tags/{name}"))?;
            let commit = match reference.peel_to_commit() {
                Ok(commit) => commit,
                Err(e) => {
                    // tags on trees or blobs never take part in releases
                    debug!(tag = name, error = %e, "skipping tag without commit");
                    continue;
                }
            };
            let committed_at = DateTime::from_timestamp(commit.time().seconds(), 0)
                .ok_or_else(|| WorkflowError::repository(format!("tag '{name}' has an invalid commit time")))?;

            tags.push(TagInfo {
                name: name.to_string(),
                commit: commit.id().to_string(),
                committed_at,
            });
        }

        Ok(tags)
    }

    fn create_tag(&self, name: &str) -> Result<()> {
        let head = self.repo.head()?.peel(ObjectType::Commit)?;
        self.repo
            .tag_lightweight(name, &head, false)
            .map_err(|e| match e.code() {
                ErrorCode::Exists => WorkflowError::TagAlreadyExists {
                    tag: name.to_string(),
                },
                _ => e.into(),
            })?;
        Ok(())
    }

    fn push_tag(&self, name: &str) -> Result<()> {
        self.push_refspecs(&[format!("refs/tags/{name}:refs/tags/{name}")])
    }

    fn is_clean(&self) -> Result<bool> {
        self.refresh_index()?;
        let mut options = StatusOptions::new();
        options
            .include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);
        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(statuses.is_empty())
    }
}
