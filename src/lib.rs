//! # git-client
//!
//! A credential-aware git client facade with two interchangeable backends:
//! the system `git` binary (with interactive credential prompting disabled)
//! and an in-process libgit2 implementation.
//!
//! ## Features
//!
//! - **Ordered credentials**: registered credentials are tried in order
//!   until the remote accepts one
//! - **Pluggable backends**: identical operation surface over the `git`
//!   binary and libgit2
//! - **Log capture**: an injected sink records every operation line for
//!   post-hoc substring assertions
//! - **Explicit options**: each operation takes one immutable options
//!   struct instead of chained builder state
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use git_client::{
//!     BackendKind, CheckoutOptions, Credential, CredentialScope, FetchOptions, GitClient,
//!     LogSink, RefSpec,
//! };
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = LogSink::attach();
//! let mut client = GitClient::new(PathBuf::from("/tmp/work"), BackendKind::Embedded, sink);
//!
//! client.init().await?;
//! client.add_default_credential(Credential::username_password(
//!     CredentialScope::Global,
//!     "alice",
//!     "token",
//! ));
//!
//! let url = "https://example.com/repo.git";
//! let fetch = FetchOptions::new(url, vec![RefSpec::branches_to_remotes("origin")]);
//! client.fetch(&fetch).await?;
//!
//! let tip = client.head_rev(url, "master").await?;
//! client
//!     .checkout(&CheckoutOptions::new("master", tip.to_string()).delete_branch_if_exists())
//!     .await?;
//! client.clear_credentials();
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cases;
pub mod core;
pub mod error;
pub mod logging;
pub mod operations;
pub mod workspace;

// Re-export the most commonly used types for easy access
pub use error::{GitError, GitResult};

pub use crate::core::credentials::{Credential, CredentialKind, CredentialScope, CredentialStore};
pub use crate::core::remote::{RefSpec, DEFAULT_REMOTE};
pub use crate::core::repository::LocalRepository;

pub use backend::{backend_for, BackendKind, CliBackend, EmbeddedBackend, GitBackend, GitVersion};
pub use logging::{LogSink, LOGGING_STARTED};
pub use operations::{CheckoutOptions, CloneOptions, FetchOptions};
pub use workspace::WorkspaceAllocator;

pub use cases::{CaseSource, RepoCase, TestCase};

use std::path::{Path, PathBuf};

use git2::Oid;

/// Lifecycle of a client over one workspace.
///
/// Credentials may be added or cleared in any state; operations advance the
/// state strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initialized,
    Fetched,
    CheckedOut,
}

/// Credential-scoped git client bound to one working directory.
///
/// One instance owns exactly one workspace and one log sink; operations on
/// an instance are strictly sequential.
pub struct GitClient {
    workdir: PathBuf,
    backend: Box<dyn GitBackend>,
    credentials: CredentialStore,
    sink: LogSink,
    state: ClientState,
}

impl std::fmt::Debug for GitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitClient")
            .field("workdir", &self.workdir)
            .field("backend", &self.backend.kind())
            .field("credentials", &self.credentials.len())
            .field("state", &self.state)
            .finish()
    }
}

impl GitClient {
    /// Create a client over `workdir`, executing through the given backend
    /// and recording operation lines into `sink`.
    pub fn new(workdir: impl Into<PathBuf>, kind: BackendKind, sink: LogSink) -> Self {
        let workdir = workdir.into();
        tracing::debug!(workdir = %workdir.display(), backend = %kind, "creating git client");
        sink.record(format!("Repo workdir: {}", workdir.display()));
        Self {
            workdir,
            backend: backend_for(kind),
            credentials: CredentialStore::new(),
            sink,
            state: ClientState::Uninitialized,
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Create an empty repository in the workspace.
    pub async fn init(&mut self) -> GitResult<()> {
        self.backend.init(&self.workdir, &self.sink).await?;
        self.state = ClientState::Initialized;
        Ok(())
    }

    /// Register a credential to be tried, in registration order, by every
    /// subsequent authenticated network operation on this client.
    pub fn add_default_credential(&mut self, credential: Credential) {
        self.credentials.add(credential);
    }

    /// Unregister all credentials. Idempotent; callable in any state.
    pub fn clear_credentials(&mut self) {
        self.credentials.clear();
    }

    /// Authenticated fetch populating refs per `options.refspecs`.
    pub async fn fetch(&mut self, options: &FetchOptions) -> GitResult<()> {
        if self.state == ClientState::Uninitialized {
            return Err(GitError::invalid_state("fetch before init"));
        }
        self.backend
            .fetch(&self.workdir, options, &self.credentials, &self.sink)
            .await?;
        self.state = ClientState::Fetched;
        Ok(())
    }

    /// Authenticated full clone into the (empty) workspace.
    pub async fn clone_repository(&mut self, options: &CloneOptions) -> GitResult<()> {
        if self.state != ClientState::Uninitialized {
            return Err(GitError::AlreadyInitialized {
                path: self.workdir.clone(),
            });
        }
        self.backend
            .clone_repository(&self.workdir, options, &self.credentials, &self.sink)
            .await?;
        self.state = ClientState::Fetched;
        Ok(())
    }

    /// Materialize a local branch at the requested revision and populate
    /// the working tree.
    pub async fn checkout(&mut self, options: &CheckoutOptions) -> GitResult<()> {
        if self.state == ClientState::Uninitialized {
            return Err(GitError::invalid_state("checkout before init or clone"));
        }
        self.backend
            .checkout(&self.workdir, options, &self.sink)
            .await?;
        self.state = ClientState::CheckedOut;
        Ok(())
    }

    /// Resolve the remote's branch tip without mutating local state.
    pub async fn head_rev(&self, url: &str, branch: &str) -> GitResult<Oid> {
        self.backend
            .head_rev(url, branch, &self.credentials, &self.sink)
            .await
    }

    /// Associate a symbolic remote name with a URL. Pure metadata.
    pub fn set_remote_url(&self, name: &str, url: &str) -> GitResult<()> {
        LocalRepository::open(&self.workdir)?.set_remote_url(name, url)
    }

    /// Whether the commit is reachable in the local object database.
    pub fn is_commit_in_repo(&self, oid: Oid) -> GitResult<bool> {
        LocalRepository::open(&self.workdir)?.is_commit_in_repo(oid)
    }

    /// Resolve a local branch name to the object id its ref points at.
    pub fn branch_rev(&self, branch: &str) -> GitResult<Oid> {
        LocalRepository::open(&self.workdir)?.branch_rev(branch)
    }

    /// The current branch name.
    pub fn current_branch(&self) -> GitResult<String> {
        LocalRepository::open(&self.workdir)?.current_branch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn init_advances_state() {
        let temp_dir = TempDir::new().unwrap();
        let mut client = GitClient::new(temp_dir.path(), BackendKind::Embedded, LogSink::attach());
        assert_eq!(client.state(), ClientState::Uninitialized);
        client.init().await.unwrap();
        assert_eq!(client.state(), ClientState::Initialized);
    }

    #[tokio::test]
    async fn init_twice_reports_already_initialized() {
        let temp_dir = TempDir::new().unwrap();
        let mut client = GitClient::new(temp_dir.path(), BackendKind::Embedded, LogSink::attach());
        client.init().await.unwrap();
        let err = client.init().await.unwrap_err();
        assert!(matches!(err, GitError::AlreadyInitialized { .. }));
    }

    #[tokio::test]
    async fn fetch_before_init_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut client = GitClient::new(temp_dir.path(), BackendKind::Embedded, LogSink::attach());
        let options = FetchOptions::new(
            "https://example.invalid/repo.git",
            vec![RefSpec::branches_to_remotes(DEFAULT_REMOTE)],
        );
        let err = client.fetch(&options).await.unwrap_err();
        assert!(matches!(err, GitError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn clear_credentials_is_a_noop_when_none_registered() {
        let temp_dir = TempDir::new().unwrap();
        let mut client = GitClient::new(temp_dir.path(), BackendKind::Embedded, LogSink::attach());
        client.clear_credentials();
        client.add_default_credential(Credential::username_password(
            CredentialScope::Global,
            "alice",
            "pw",
        ));
        client.clear_credentials();
        client.clear_credentials();
    }
}
