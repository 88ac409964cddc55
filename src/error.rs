use std::path::PathBuf;
use thiserror::Error;

/// Git-specific error types for the git-client crate
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Repository not found at path: {path}")]
    RepositoryNotFound { path: PathBuf },

    #[error("Repository already initialized at path: {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Branch '{branch}' not found in repository")]
    BranchNotFound { branch: String },

    #[error("Remote ref for branch '{branch}' not found")]
    RefNotFound { branch: String },

    #[error("Remote '{remote}' not found")]
    RemoteNotFound { remote: String },

    #[error("No registered credential was accepted by the remote")]
    AuthenticationFailed,

    #[error("Network error during git operation: {message}")]
    NetworkError { message: String },

    #[error("Checkout conflicts with local modifications: {message}")]
    CheckoutConflict { message: String },

    #[error("'{rev}' is not a valid object id")]
    InvalidObjectId { rev: String },

    #[error("Invalid repository state: {message}")]
    InvalidState { message: String },

    #[error("Git operation failed: {message}")]
    GitOperationFailed { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git2 error: {0}")]
    Git2(#[from] git2::Error),
}

/// Result type alias for git operations
pub type GitResult<T> = Result<T, GitError>;

impl GitError {
    /// Create a new GitOperationFailed error
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::GitOperationFailed {
            message: message.into(),
        }
    }

    /// Create a new InvalidState error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a new NetworkError
    pub fn network_error(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}
