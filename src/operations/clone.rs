//! Clone configuration.

use std::path::PathBuf;

use crate::core::remote::DEFAULT_REMOTE;

/// Immutable configuration for a single clone operation.
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// URL of the repository to clone.
    pub url: String,
    /// Symbolic name recorded for the remote.
    pub remote_name: String,
    /// Local object store whose objects may be reused to reduce transfer.
    ///
    /// Only the command-line backend honours this hint; the embedded
    /// backend always performs a full transfer.
    pub reference: Option<PathBuf>,
    /// Branch to check out after the clone (remote HEAD when `None`).
    pub branch: Option<String>,
}

impl CloneOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            remote_name: DEFAULT_REMOTE.to_string(),
            reference: None,
            branch: None,
        }
    }

    pub fn remote_name(mut self, name: impl Into<String>) -> Self {
        self.remote_name = name.into();
        self
    }

    pub fn reference(mut self, path: PathBuf) -> Self {
        self.reference = Some(path);
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}
