//! Fetch configuration.

use crate::core::remote::RefSpec;

/// Immutable configuration for a single fetch operation.
///
/// Replaces chained builder state with one explicit struct handed to
/// [`crate::GitClient::fetch`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// URL of the remote repository.
    pub remote_url: String,
    /// Which remote refs populate which local refs.
    pub refspecs: Vec<RefSpec>,
    /// Remove remote-tracking refs that no longer exist on the remote.
    pub prune: bool,
}

impl FetchOptions {
    pub fn new(remote_url: impl Into<String>, refspecs: Vec<RefSpec>) -> Self {
        Self {
            remote_url: remote_url.into(),
            refspecs,
            prune: false,
        }
    }

    pub fn prune(mut self) -> Self {
        self.prune = true;
        self
    }
}
