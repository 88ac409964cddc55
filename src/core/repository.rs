//! Local repository introspection.
//!
//! Everything in this module operates on the on-disk repository only and
//! never touches the network, regardless of which backend produced the
//! repository state.

use std::path::{Path, PathBuf};

use git2::{BranchType, Oid, Repository};

use crate::error::{GitError, GitResult};

/// Wrapper over [`git2::Repository`] scoped to one working directory.
pub struct LocalRepository {
    repo: Repository,
    path: PathBuf,
}

impl std::fmt::Debug for LocalRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRepository")
            .field("path", &self.path)
            .finish()
    }
}

impl LocalRepository {
    /// Open an existing repository.
    pub fn open<P: AsRef<Path>>(path: P) -> GitResult<Self> {
        let path = path.as_ref().to_path_buf();
        let repo = Repository::open(&path)
            .map_err(|_| GitError::RepositoryNotFound { path: path.clone() })?;
        Ok(Self { repo, path })
    }

    /// Initialize an empty repository.
    ///
    /// Fails with [`GitError::AlreadyInitialized`] when a repository already
    /// exists at `path`.
    pub fn init<P: AsRef<Path>>(path: P) -> GitResult<Self> {
        let path = path.as_ref().to_path_buf();
        if Repository::open(&path).is_ok() {
            return Err(GitError::AlreadyInitialized { path });
        }
        let repo = Repository::init(&path)?;
        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current branch name, or `detached-<oid>` in detached HEAD state.
    pub fn current_branch(&self) -> GitResult<String> {
        let head = self.repo.head()?;
        if head.is_branch() {
            if let Some(branch_name) = head.shorthand() {
                return Ok(branch_name.to_string());
            }
        }
        let oid = head
            .target()
            .ok_or_else(|| GitError::invalid_state("HEAD has no target"))?;
        Ok(format!("detached-{oid}"))
    }

    /// Resolve a local branch name to the object id its ref points at.
    pub fn branch_rev(&self, branch_name: &str) -> GitResult<Oid> {
        let branch = self
            .repo
            .find_branch(branch_name, BranchType::Local)
            .map_err(|_| GitError::BranchNotFound {
                branch: branch_name.to_string(),
            })?;
        branch.get().target().ok_or_else(|| {
            GitError::invalid_state(format!("branch {branch_name} has no target"))
        })
    }

    /// Object id of the local HEAD.
    pub fn head_rev(&self) -> GitResult<Oid> {
        let head = self.repo.head()?;
        head.target()
            .ok_or_else(|| GitError::invalid_state("HEAD has no target"))
    }

    /// Whether the commit is reachable in the local object database.
    pub fn is_commit_in_repo(&self, oid: Oid) -> GitResult<bool> {
        match self.repo.find_commit(oid) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(GitError::from(e)),
        }
    }

    /// Associate a symbolic remote name with a URL. Pure metadata, no
    /// network call; an existing remote of the same name is re-pointed.
    pub fn set_remote_url(&self, name: &str, url: &str) -> GitResult<()> {
        match self.repo.find_remote(name) {
            Ok(_) => {
                self.repo.remote_set_url(name, url)?;
            }
            Err(_) => {
                self.repo.remote(name, url)?;
            }
        }
        Ok(())
    }

    /// URL the named remote points at.
    pub fn remote_url(&self, name: &str) -> GitResult<String> {
        let remote = self.repo.find_remote(name).map_err(|_| {
            GitError::RemoteNotFound {
                remote: name.to_string(),
            }
        })?;
        remote
            .url()
            .map(|url| url.to_string())
            .ok_or_else(|| GitError::invalid_state(format!("remote {name} has no URL")))
    }

    /// The working directory path.
    pub fn workdir(&self) -> GitResult<&Path> {
        self.repo
            .workdir()
            .ok_or_else(|| GitError::invalid_state("repository has no working directory"))
    }
}
