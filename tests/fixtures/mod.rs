//! Git repositories for integration tests: a bare remote and a working clone of it
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{Oid, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

pub struct RemoteFixture {
    _root: TempDir,
    pub remote_path: PathBuf,
    pub work_path: PathBuf,
}

impl RemoteFixture {
    /// Bare `remote.git` with one commit on master, cloned into `work`
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let remote_path = root.path().join("remote.git");
        let seed_path = root.path().join("seed");
        let work_path = root.path().join("work");

        let mut options = RepositoryInitOptions::new();
        options.bare(true).initial_head("master");
        Repository::init_opts(&remote_path, &options).unwrap();

        let mut options = RepositoryInitOptions::new();
        options.initial_head("master");
        let seed = Repository::init_opts(&seed_path, &options).unwrap();
        commit_file(&seed, "README.md", "# project\n", "Initial commit");
        seed.remote("origin", remote_path.to_str().unwrap()).unwrap();
        seed.find_remote("origin")
            .unwrap()
            .push(&["refs/heads/master:refs/heads/master"], None)
            .unwrap();

        Repository::clone(remote_path.to_str().unwrap(), &work_path).unwrap();

        Self {
            _root: root,
            remote_path,
            work_path,
        }
    }

    pub fn work(&self) -> Repository {
        Repository::open(&self.work_path).unwrap()
    }

    pub fn remote(&self) -> Repository {
        Repository::open(&self.remote_path).unwrap()
    }

    pub fn remote_branch_tip(&self, branch: &str) -> Option<Oid> {
        self.remote()
            .find_reference(&format!("refs/heads/{branch}"))
            .ok()
            .and_then(|reference| reference.target())
    }

    pub fn remote_tag_target(&self, tag: &str) -> Option<Oid> {
        self.remote()
            .find_reference(&format!("refs/tags/{tag}"))
            .ok()
            .and_then(|reference| reference.peel_to_commit().ok())
            .map(|commit| commit.id())
    }

    /// Push a local branch of the working clone to a differently named remote
    /// branch, the way the review tool does when landing
    pub fn publish(&self, local: &str, remote_branch: &str) {
        let refspec = format!("refs/heads/{local}:refs/heads/{remote_branch}");
        self.work()
            .find_remote("origin")
            .unwrap()
            .push(&[refspec.as_str()], None)
            .unwrap();
    }
}

pub fn signature() -> Signature<'static> {
    Signature::now("Test User", "test@example.com").unwrap()
}

/// Write `file` in the working tree and commit it on HEAD
pub fn commit_file(repo: &Repository, file: &str, content: &str, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    fs::write(workdir.join(file), content).unwrap();

    let mut index = repo.index().unwrap();
    index.read(true).unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    let sig = signature();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

pub fn checkout(repo: &Repository, branch: &str) {
    repo.set_head(&format!("refs/heads/{branch}")).unwrap();
    repo.checkout_head(Some(CheckoutBuilder::new().force()))
        .unwrap();
}

pub fn current_branch(repo: &Repository) -> String {
    repo.head().unwrap().shorthand().unwrap().to_string()
}

/// Content of `file` as recorded in `commit`
pub fn file_at(repo: &Repository, commit: Oid, file: &str) -> String {
    let tree = repo.find_commit(commit).unwrap().tree().unwrap();
    let entry = tree.get_path(Path::new(file)).unwrap();
    let blob = repo.find_blob(entry.id()).unwrap();
    String::from_utf8(blob.content().to_vec()).unwrap()
}
