//! Checkout configuration.

/// Immutable configuration for a single checkout operation.
///
/// Materializes a local branch at `rev` and populates the working tree.
#[derive(Debug, Clone)]
pub struct CheckoutOptions {
    /// Name of the local branch to create or replace.
    pub branch: String,
    /// Revision the branch should point at: a hex object id or a ref name
    /// such as `origin/master`.
    pub rev: String,
    /// Replace an existing branch of the same name.
    pub delete_branch_if_exists: bool,
}

impl CheckoutOptions {
    pub fn new(branch: impl Into<String>, rev: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            rev: rev.into(),
            delete_branch_if_exists: false,
        }
    }

    pub fn delete_branch_if_exists(mut self) -> Self {
        self.delete_branch_if_exists = true;
        self
    }
}
