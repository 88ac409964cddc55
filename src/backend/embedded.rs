//! Embedded libgit2 backend.
//!
//! Performs every operation in-process via `git2`. Registered credentials
//! are offered to libgit2's credential callback in registration order; the
//! callback walks the list on each invocation until a credential matching
//! the allowed type is found, and reports exhaustion once the list runs out.

use std::path::Path;

use async_trait::async_trait;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{CredentialType, Direction, Oid, Remote, RemoteCallbacks, Repository};
use tracing::debug;

use crate::core::credentials::{Credential, CredentialKind, CredentialStore};
use crate::core::repository::LocalRepository;
use crate::error::{GitError, GitResult};
use crate::logging::LogSink;
use crate::operations::{CheckoutOptions, CloneOptions, FetchOptions};

use super::{BackendKind, GitBackend};

const CREDENTIALS_EXHAUSTED: &str = "no registered credential was accepted";

/// Backend running entirely in-process through libgit2.
#[derive(Debug, Default, Clone)]
pub struct EmbeddedBackend;

impl EmbeddedBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Credential callback walking the registered list in order.
fn credential_callbacks(credentials: Vec<Credential>) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();
    let mut next = 0usize;
    callbacks.credentials(move |_url, username_from_url, allowed| {
        // Some transports ask for the username alone before any real
        // credential; answer without consuming a trial.
        if allowed == CredentialType::USERNAME {
            let name = credentials
                .get(next)
                .map(|cred| cred.username().to_string())
                .unwrap_or_else(|| "git".to_string());
            return git2::Cred::username(&name);
        }
        while next < credentials.len() {
            let credential = &credentials[next];
            next += 1;
            match credential.kind() {
                CredentialKind::UsernamePassword { username, password } => {
                    if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                        return git2::Cred::userpass_plaintext(username, password);
                    }
                }
                CredentialKind::SshKey {
                    username,
                    key_material,
                    passphrase,
                } => {
                    if allowed.contains(CredentialType::SSH_KEY)
                        || allowed.contains(CredentialType::SSH_MEMORY)
                    {
                        let user = username_from_url.unwrap_or(username.as_str());
                        return git2::Cred::ssh_key_from_memory(
                            user,
                            None,
                            key_material,
                            passphrase.as_deref(),
                        );
                    }
                }
            }
        }
        Err(git2::Error::from_str(CREDENTIALS_EXHAUSTED))
    });
    callbacks
}

/// Map libgit2 remote-operation failures onto the error taxonomy.
fn map_remote_error(err: git2::Error) -> GitError {
    if err.message().contains(CREDENTIALS_EXHAUSTED) || err.code() == git2::ErrorCode::Auth {
        return GitError::AuthenticationFailed;
    }
    match err.class() {
        git2::ErrorClass::Net | git2::ErrorClass::Http | git2::ErrorClass::Ssh => {
            GitError::network_error(err.message())
        }
        _ => GitError::from(err),
    }
}

#[async_trait]
impl GitBackend for EmbeddedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Embedded
    }

    async fn init(&self, workdir: &Path, _sink: &LogSink) -> GitResult<()> {
        LocalRepository::init(workdir)?;
        Ok(())
    }

    async fn fetch(
        &self,
        workdir: &Path,
        options: &FetchOptions,
        credentials: &CredentialStore,
        sink: &LogSink,
    ) -> GitResult<()> {
        sink.record(format!("Fetching upstream changes from {}", options.remote_url));

        let repo = Repository::open(workdir).map_err(|_| GitError::RepositoryNotFound {
            path: workdir.to_path_buf(),
        })?;
        let mut remote = repo.remote_anonymous(&options.remote_url)?;

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(credential_callbacks(
            credentials.iter().cloned().collect(),
        ));
        if options.prune {
            fetch_options.prune(git2::FetchPrune::On);
        }

        let refspecs: Vec<String> = options.refspecs.iter().map(|spec| spec.to_string()).collect();
        let refspec_strs: Vec<&str> = refspecs.iter().map(|spec| spec.as_str()).collect();

        remote
            .fetch(&refspec_strs, Some(&mut fetch_options), None)
            .map_err(map_remote_error)?;

        debug!(url = %options.remote_url, refspecs = refspecs.len(), "fetch complete");
        Ok(())
    }

    async fn clone_repository(
        &self,
        workdir: &Path,
        options: &CloneOptions,
        credentials: &CredentialStore,
        sink: &LogSink,
    ) -> GitResult<()> {
        sink.record(format!("Cloning repository {}", options.url));
        if options.reference.is_some() {
            // Full transfer regardless; reference stores are a command-line
            // backend optimization.
            debug!("ignoring local reference store hint");
        }

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(credential_callbacks(
            credentials.iter().cloned().collect(),
        ));

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);
        if let Some(branch) = &options.branch {
            builder.branch(branch);
        }

        let repo = builder
            .clone(&options.url, workdir)
            .map_err(map_remote_error)?;

        if options.remote_name != crate::core::remote::DEFAULT_REMOTE {
            repo.remote_rename(crate::core::remote::DEFAULT_REMOTE, &options.remote_name)?;
        }
        Ok(())
    }

    async fn checkout(
        &self,
        workdir: &Path,
        options: &CheckoutOptions,
        sink: &LogSink,
    ) -> GitResult<()> {
        sink.record(format!(
            "Checking out {} as branch {}",
            options.rev, options.branch
        ));

        let repo = Repository::open(workdir).map_err(|_| GitError::RepositoryNotFound {
            path: workdir.to_path_buf(),
        })?;

        let object = repo
            .revparse_single(&options.rev)
            .map_err(|_| GitError::BranchNotFound {
                branch: options.rev.clone(),
            })?;
        let commit = object.peel_to_commit()?;

        // Move the branch ref directly: unlike a forced branch create this
        // also works when the branch being replaced is the current HEAD.
        let refname = format!("refs/heads/{}", options.branch);
        if repo.find_reference(&refname).is_ok() && !options.delete_branch_if_exists {
            return Err(GitError::operation_failed(format!(
                "branch {} already exists",
                options.branch
            )));
        }
        repo.reference(
            &refname,
            commit.id(),
            true,
            &format!("checkout: moving to {}", options.branch),
        )?;

        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        repo.checkout_tree(commit.as_object(), Some(&mut checkout))
            .map_err(|err| {
                if err.code() == git2::ErrorCode::Conflict {
                    GitError::CheckoutConflict {
                        message: err.message().to_string(),
                    }
                } else {
                    GitError::from(err)
                }
            })?;
        repo.set_head(&refname)?;
        Ok(())
    }

    async fn head_rev(
        &self,
        url: &str,
        branch: &str,
        credentials: &CredentialStore,
        _sink: &LogSink,
    ) -> GitResult<Oid> {
        let mut remote = Remote::create_detached(url)?;
        let callbacks = credential_callbacks(credentials.iter().cloned().collect());
        let connection = remote
            .connect_auth(Direction::Fetch, Some(callbacks), None)
            .map_err(map_remote_error)?;

        let target = format!("refs/heads/{branch}");
        for head in connection.list()? {
            if head.name() == target {
                return Ok(head.oid());
            }
        }
        Err(GitError::RefNotFound {
            branch: branch.to_string(),
        })
    }
}
