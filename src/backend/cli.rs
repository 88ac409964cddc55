//! Command-line git backend.
//!
//! Shells out to the system `git` binary with interactive prompting
//! disabled: every network invocation runs with `GIT_TERMINAL_PROMPT=0` and
//! `-c credential.helper=` so only the credentials this client injects are
//! ever offered. Credential material reaches the child process through
//! short-lived files in a per-invocation temp directory (an SSH identity for
//! key credentials, an askpass helper for username/password ones), removed
//! as soon as the invocation completes.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use git2::Oid;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use async_trait::async_trait;

use crate::core::credentials::{Credential, CredentialKind, CredentialStore};
use crate::error::{GitError, GitResult};
use crate::logging::LogSink;
use crate::operations::{CheckoutOptions, CloneOptions, FetchOptions};

use super::{BackendKind, GitBackend};

/// Minimum native git version whose credential behaviour can be overridden
/// from config (`credential.helper=` / askpass injection).
const MIN_CREDENTIAL_OVERRIDE: GitVersion = GitVersion {
    major: 1,
    minor: 7,
    patch: 9,
    build: 0,
};

/// Parsed `git --version` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
}

impl GitVersion {
    /// Parse lines like `git version 2.39.2` or `git version 2.39.2.windows.1`.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix("git version ")?;
        let mut parts = rest
            .split('.')
            .map(|part| part.trim().parse::<u32>().ok());
        let major = parts.next()??;
        let minor = parts.next().flatten().unwrap_or(0);
        let patch = parts.next().flatten().unwrap_or(0);
        let build = parts.next().flatten().unwrap_or(0);
        Some(Self {
            major,
            minor,
            patch,
            build,
        })
    }

    pub fn at_least(&self, other: GitVersion) -> bool {
        (self.major, self.minor, self.patch, self.build)
            >= (other.major, other.minor, other.patch, other.build)
    }
}

/// Backend that spawns the system `git` binary.
#[derive(Debug, Clone)]
pub struct CliBackend {
    program: PathBuf,
}

impl Default for CliBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CliBackend {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    /// Use a specific `git` binary instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Probe the binary's version. `None` when the binary is missing or its
    /// output is unrecognizable.
    pub async fn probe_version(&self) -> Option<GitVersion> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        GitVersion::parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// Capability probe: whether this binary accepts the credential
    /// override configuration this backend relies on. Callers gate on the
    /// probe result, never on a version constant of their own.
    pub async fn supports_credential_override(&self) -> bool {
        match self.probe_version().await {
            Some(version) => version.at_least(MIN_CREDENTIAL_OVERRIDE),
            None => false,
        }
    }

    /// Spawn one git invocation, recording the command line to the sink.
    async fn run(
        &self,
        cwd: Option<&Path>,
        args: &[String],
        envs: &[(String, String)],
        sink: &LogSink,
    ) -> GitResult<std::process::Output> {
        sink.record(format!("> git {}", args.join(" ")));
        debug!(args = ?args, "spawning git");

        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        for (key, value) in envs {
            cmd.env(key, value);
        }
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd.output().await?;
        if output.status.success() {
            return Ok(output);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(classify_failure(stderr.trim()))
    }

    /// Run a network operation under each registered credential in order
    /// until one is accepted.
    async fn run_authenticated(
        &self,
        cwd: Option<&Path>,
        args: &[String],
        credentials: &CredentialStore,
        sink: &LogSink,
    ) -> GitResult<std::process::Output> {
        if credentials.is_empty() {
            return self.run(cwd, args, &[], sink).await;
        }
        for credential in credentials.iter() {
            let env = CredentialEnv::for_credential(credential)?;
            match self.run(cwd, args, env.vars(), sink).await {
                Ok(output) => return Ok(output),
                Err(GitError::AuthenticationFailed) => {
                    debug!(id = credential.id(), "credential rejected, trying next");
                }
                Err(other) => return Err(other),
            }
        }
        Err(GitError::AuthenticationFailed)
    }
}

#[async_trait]
impl GitBackend for CliBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cli
    }

    async fn init(&self, workdir: &Path, sink: &LogSink) -> GitResult<()> {
        if workdir.join(".git").exists() {
            return Err(GitError::AlreadyInitialized {
                path: workdir.to_path_buf(),
            });
        }
        self.run(Some(workdir), &["init".to_string()], &[], sink)
            .await?;
        Ok(())
    }

    async fn fetch(
        &self,
        workdir: &Path,
        options: &FetchOptions,
        credentials: &CredentialStore,
        sink: &LogSink,
    ) -> GitResult<()> {
        let mut args = vec![
            "-c".to_string(),
            "credential.helper=".to_string(),
            "fetch".to_string(),
        ];
        if options.prune {
            args.push("--prune".to_string());
        }
        args.push(options.remote_url.clone());
        args.extend(options.refspecs.iter().map(|spec| spec.to_string()));

        self.run_authenticated(Some(workdir), &args, credentials, sink)
            .await?;
        Ok(())
    }

    async fn clone_repository(
        &self,
        workdir: &Path,
        options: &CloneOptions,
        credentials: &CredentialStore,
        sink: &LogSink,
    ) -> GitResult<()> {
        let mut args = vec![
            "-c".to_string(),
            "credential.helper=".to_string(),
            "clone".to_string(),
            "--origin".to_string(),
            options.remote_name.clone(),
        ];
        if let Some(reference) = &options.reference {
            args.push("--reference-if-able".to_string());
            args.push(reference.display().to_string());
        }
        if let Some(branch) = &options.branch {
            args.push("--branch".to_string());
            args.push(branch.clone());
        }
        args.push(options.url.clone());
        args.push(workdir.display().to_string());

        self.run_authenticated(None, &args, credentials, sink)
            .await?;
        Ok(())
    }

    async fn checkout(
        &self,
        workdir: &Path,
        options: &CheckoutOptions,
        sink: &LogSink,
    ) -> GitResult<()> {
        // -B resets an existing branch of the same name, including the one
        // currently checked out; -b refuses to replace anything.
        let create_flag = if options.delete_branch_if_exists {
            "-B"
        } else {
            "-b"
        };
        let args = vec![
            "checkout".to_string(),
            create_flag.to_string(),
            options.branch.clone(),
            options.rev.clone(),
        ];
        match self.run(Some(workdir), &args, &[], sink).await {
            Ok(_) => Ok(()),
            Err(GitError::GitOperationFailed { message })
                if message.contains("would be overwritten by checkout") =>
            {
                Err(GitError::CheckoutConflict { message })
            }
            Err(other) => Err(other),
        }
    }

    async fn head_rev(
        &self,
        url: &str,
        branch: &str,
        credentials: &CredentialStore,
        sink: &LogSink,
    ) -> GitResult<Oid> {
        let args = vec![
            "-c".to_string(),
            "credential.helper=".to_string(),
            "ls-remote".to_string(),
            url.to_string(),
            format!("refs/heads/{branch}"),
        ];
        let output = self
            .run_authenticated(None, &args, credentials, sink)
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let rev = stdout
            .split_whitespace()
            .next()
            .ok_or_else(|| GitError::RefNotFound {
                branch: branch.to_string(),
            })?;
        Oid::from_str(rev).map_err(|_| GitError::InvalidObjectId {
            rev: rev.to_string(),
        })
    }
}

/// Per-invocation credential material on disk plus the environment that
/// points git at it. Dropping the value removes the files.
struct CredentialEnv {
    vars: Vec<(String, String)>,
    _holder: Option<TempDir>,
}

impl CredentialEnv {
    fn for_credential(credential: &Credential) -> GitResult<Self> {
        match credential.kind() {
            CredentialKind::SshKey {
                key_material,
                passphrase,
                ..
            } => {
                if passphrase.is_some() {
                    // Batch-mode ssh cannot answer a passphrase prompt.
                    warn!(
                        id = credential.id(),
                        "passphrase-protected key offered to the command-line backend"
                    );
                }
                let holder = TempDir::new()?;
                let key_path = holder.path().join("identity");
                write_private(&key_path, key_material, 0o600)?;
                let ssh_command = format!(
                    "ssh -i {} -o IdentitiesOnly=yes -o BatchMode=yes -o StrictHostKeyChecking=no",
                    shell_quote(&key_path.display().to_string())
                );
                Ok(Self {
                    vars: vec![("GIT_SSH_COMMAND".to_string(), ssh_command)],
                    _holder: Some(holder),
                })
            }
            CredentialKind::UsernamePassword { username, password } => {
                let holder = TempDir::new()?;
                let script_path = holder.path().join("askpass.sh");
                let script = format!(
                    "#!/bin/sh\ncase \"$1\" in\nUsername*) printf '%s\\n' {};;\n*) printf '%s\\n' {};;\nesac\n",
                    shell_quote(username),
                    shell_quote(password),
                );
                write_private(&script_path, &script, 0o700)?;
                Ok(Self {
                    vars: vec![(
                        "GIT_ASKPASS".to_string(),
                        script_path.display().to_string(),
                    )],
                    _holder: Some(holder),
                })
            }
        }
    }

    fn vars(&self) -> &[(String, String)] {
        &self.vars
    }
}

fn write_private(path: &Path, contents: &str, mode: u32) -> GitResult<()> {
    std::fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    Ok(())
}

/// Single-quote a string for embedding in a POSIX shell word.
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Map a failed invocation's stderr onto the error taxonomy.
///
/// Authentication patterns are checked before transport patterns because
/// git wraps auth failures in `unable to access` messages.
fn classify_failure(stderr: &str) -> GitError {
    const AUTH_MARKERS: &[&str] = &[
        "Authentication failed",
        "could not read Username",
        "could not read Password",
        "Permission denied (publickey",
        "Invalid username or password",
        "returned error: 401",
        "returned error: 403",
    ];
    const NETWORK_MARKERS: &[&str] = &[
        "Could not resolve host",
        "Connection refused",
        "Connection timed out",
        "Network is unreachable",
        "Failed to connect",
        "unable to access",
    ];
    if AUTH_MARKERS.iter().any(|marker| stderr.contains(marker)) {
        return GitError::AuthenticationFailed;
    }
    if NETWORK_MARKERS.iter().any(|marker| stderr.contains(marker)) {
        return GitError::network_error(stderr);
    }
    GitError::operation_failed(stderr)
}
