//! Pluggable git backends.
//!
//! The facade can be backed either by the system `git` binary
//! ([`CliBackend`]) or by an in-process libgit2 implementation
//! ([`EmbeddedBackend`]). Both provide the same operation surface; callers
//! pick a [`BackendKind`] and never see the difference beyond log texture.

pub mod cli;
pub mod embedded;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use git2::Oid;
use serde::{Deserialize, Serialize};

use crate::core::credentials::CredentialStore;
use crate::error::GitResult;
use crate::logging::LogSink;
use crate::operations::{CheckoutOptions, CloneOptions, FetchOptions};

pub use cli::{CliBackend, GitVersion};
pub use embedded::EmbeddedBackend;

/// Which concrete backend executes the git operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Shells out to the system `git` binary.
    Cli,
    /// In-process via libgit2.
    Embedded,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Cli => write!(f, "cli"),
            BackendKind::Embedded => write!(f, "embedded"),
        }
    }
}

/// Operation surface every backend must provide.
///
/// Credentials are handed in per call as an ordered store; each backend
/// tries them in registration order until one is accepted.
#[async_trait]
pub trait GitBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Create an empty repository at `workdir`.
    async fn init(&self, workdir: &Path, sink: &LogSink) -> GitResult<()>;

    /// Authenticated fetch populating refs per the configured refspecs.
    async fn fetch(
        &self,
        workdir: &Path,
        options: &FetchOptions,
        credentials: &CredentialStore,
        sink: &LogSink,
    ) -> GitResult<()>;

    /// Authenticated full clone into `workdir`.
    async fn clone_repository(
        &self,
        workdir: &Path,
        options: &CloneOptions,
        credentials: &CredentialStore,
        sink: &LogSink,
    ) -> GitResult<()>;

    /// Materialize a local branch at the requested revision and populate
    /// the working tree.
    async fn checkout(
        &self,
        workdir: &Path,
        options: &CheckoutOptions,
        sink: &LogSink,
    ) -> GitResult<()>;

    /// Resolve the remote's branch tip without mutating local state.
    async fn head_rev(
        &self,
        url: &str,
        branch: &str,
        credentials: &CredentialStore,
        sink: &LogSink,
    ) -> GitResult<Oid>;
}

/// Construct the backend for a kind.
pub fn backend_for(kind: BackendKind) -> Box<dyn GitBackend> {
    match kind {
        BackendKind::Cli => Box::new(CliBackend::new()),
        BackendKind::Embedded => Box::new(EmbeddedBackend::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels() {
        assert_eq!(BackendKind::Cli.to_string(), "cli");
        assert_eq!(BackendKind::Embedded.to_string(), "embedded");
    }

    #[test]
    fn factory_returns_matching_kind() {
        assert_eq!(backend_for(BackendKind::Cli).kind(), BackendKind::Cli);
        assert_eq!(
            backend_for(BackendKind::Embedded).kind(),
            BackendKind::Embedded
        );
    }
}
