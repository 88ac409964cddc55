//! Refspecs and remote naming.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default symbolic remote name.
pub const DEFAULT_REMOTE: &str = "origin";

/// A fetch refspec: which remote refs populate which local refs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefSpec {
    /// Source ref pattern on the remote.
    pub src: String,
    /// Destination ref pattern in the local repository.
    pub dst: String,
    /// Whether non-fast-forward updates are allowed (`+` prefix).
    pub forced: bool,
}

impl RefSpec {
    pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            forced: true,
        }
    }

    /// The conventional fetch refspec mapping every remote branch into the
    /// remote-tracking namespace: `+refs/heads/*:refs/remotes/<remote>/*`.
    pub fn branches_to_remotes(remote: &str) -> Self {
        Self::new("refs/heads/*", format!("refs/remotes/{remote}/*"))
    }
}

impl fmt::Display for RefSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.forced {
            write!(f, "+{}:{}", self.src, self.dst)
        } else {
            write!(f, "{}:{}", self.src, self.dst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_forced_refspec() {
        let refspec = RefSpec::branches_to_remotes("origin");
        assert_eq!(refspec.to_string(), "+refs/heads/*:refs/remotes/origin/*");
    }

    #[test]
    fn renders_plain_refspec() {
        let refspec = RefSpec {
            src: "refs/heads/master".into(),
            dst: "refs/remotes/origin/master".into(),
            forced: false,
        };
        assert_eq!(
            refspec.to_string(),
            "refs/heads/master:refs/remotes/origin/master"
        );
    }
}
