pub mod credentials;
pub mod remote;
pub mod repository;

// Re-export commonly used types
pub use credentials::{Credential, CredentialKind, CredentialScope, CredentialStore};
pub use remote::{RefSpec, DEFAULT_REMOTE};
pub use repository::LocalRepository;
