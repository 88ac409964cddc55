//! Shared fixtures for the credential integration tests.

use std::path::Path;

use git2::{BranchType, Oid, Repository};
use tempfile::TempDir;

use git_client::{BackendKind, CliBackend, GitClient, LogSink, WorkspaceAllocator, LOGGING_STARTED};

/// A local origin repository with one commit on `master`, addressable
/// through a `file://` URL so the full fetch/clone pipeline runs without
/// network or credentials.
pub struct OriginRepo {
    pub dir: TempDir,
    pub url: String,
    pub tip: Oid,
}

pub fn create_origin() -> OriginRepo {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
    }

    std::fs::write(dir.path().join("README.md"), "# Test Repository\n").unwrap();
    let signature = git2::Signature::now("Test User", "test@example.com").unwrap();
    let tree_id = {
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("README.md")).unwrap();
        index.write().unwrap();
        index.write_tree().unwrap()
    };
    let tree = repo.find_tree(tree_id).unwrap();
    let tip = repo
        .commit(Some("HEAD"), &signature, &signature, "Initial commit", &tree, &[])
        .unwrap();
    drop(tree);

    // Pin the branch name regardless of the host's init.defaultBranch.
    let commit = repo.find_commit(tip).unwrap();
    if repo.find_branch("master", BranchType::Local).is_err() {
        repo.branch("master", &commit, true).unwrap();
    }
    repo.set_head("refs/heads/master").unwrap();

    let url = format!("file://{}", dir.path().display());
    OriginRepo { dir, url, tip }
}

/// Whether the command-line backend can run on this host.
pub async fn cli_available() -> bool {
    CliBackend::new().supports_credential_override().await
}

/// One test instance: an isolated workspace, a client over it, and the log
/// expectations checked at teardown.
///
/// Teardown runs from `Drop` so credentials are cleared and the workspace
/// disposed even when the test body fails; the log assertions are skipped
/// while unwinding to avoid masking the original failure.
pub struct Harness {
    pub sink: LogSink,
    pub client: GitClient,
    allocator: WorkspaceAllocator,
    expected: Vec<String>,
}

impl Harness {
    pub fn new(kind: BackendKind) -> Self {
        let mut allocator = WorkspaceAllocator::new();
        let workdir = allocator.allocate().unwrap();
        let sink = LogSink::attach();
        Self {
            sink: sink.clone(),
            client: GitClient::new(workdir, kind, sink),
            allocator,
            expected: Vec::new(),
        }
    }

    /// Register a substring that must appear in the captured log by the
    /// time the harness tears down.
    pub fn expect_log(&mut self, substring: impl Into<String>) {
        self.expected.push(substring.into());
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.client.clear_credentials();
        self.allocator.dispose_async();
        if std::thread::panicking() {
            self.sink.close();
            return;
        }
        let messages = self.sink.joined();
        assert!(
            self.sink.contains_substring(LOGGING_STARTED),
            "Logging not started: {messages}"
        );
        for expected in &self.expected {
            assert!(
                self.sink.contains_substring(expected),
                "No '{expected}' in {messages}"
            );
        }
        self.sink.close();
    }
}
