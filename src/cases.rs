//! Enumeration of credentialed repository test cases.
//!
//! Builds the cross product of available backends and repository cases,
//! where cases come from the operator's default SSH key and from an optional
//! comma-delimited definitions file. The resulting list is shuffled and
//! capped so a routine run samples coverage instead of exercising every
//! registered remote.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendKind, CliBackend};

/// Repository used when only the operator's default SSH key is available.
pub const DEFAULT_CASE_URL: &str = "https://github.com/libgit2/TestGitRepository";

/// Environment variable that lifts the sampling cap.
pub const EXERCISE_ALL_VAR: &str = "TEST_ALL_CREDENTIALS";

/// Maximum cases per run unless the exercise-all override is set.
const SAMPLE_CAP: usize = 3;

/// One remote repository plus the material needed to authenticate to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCase {
    pub url: String,
    pub username: String,
    /// Password or token; when set, password auth wins over key auth.
    pub password: Option<String>,
    /// Private key file; `None` falls back to password-only auth.
    pub private_key: Option<PathBuf>,
}

/// A repository case bound to the backend that should run it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub backend: BackendKind,
    pub repo: RepoCase,
}

/// Where case material is discovered. Paths are injected so tests can point
/// the enumeration at fixture directories.
#[derive(Debug, Clone)]
pub struct CaseSource {
    /// Directory holding the operator's SSH material (`~/.ssh`).
    pub ssh_dir: PathBuf,
    /// Username used when a case does not carry its own.
    pub fallback_username: String,
    /// Lift the sampling cap and exercise every computed case.
    pub exercise_all: bool,
}

impl CaseSource {
    /// Resolve from the process environment.
    pub fn from_environment() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let fallback_username = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "git".to_string());
        let exercise_all = std::env::var(EXERCISE_ALL_VAR)
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self {
            ssh_dir: home.join(".ssh"),
            fallback_username,
            exercise_all,
        }
    }

    pub fn default_private_key(&self) -> PathBuf {
        self.ssh_dir.join("id_rsa")
    }

    /// Directory holding per-repository key files and the definitions file.
    pub fn auth_data_dir(&self) -> PathBuf {
        self.ssh_dir.join("auth-data")
    }

    pub fn definitions_file(&self) -> PathBuf {
        self.auth_data_dir().join("repos.csv")
    }
}

/// Parse the comma-delimited definitions text.
///
/// Row format: `repoURL,username,keyFileName[,password]`. Rows with fewer
/// than three fields are skipped with a diagnostic on stdout naming the
/// row's first field; the remaining rows still parse. Key files are
/// resolved relative to `key_dir` and dropped when absent.
pub fn parse_definitions(text: &str, key_dir: &Path) -> Vec<RepoCase> {
    let mut cases = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 3 {
            println!(
                "Too few fields({}) in {}",
                fields.len(),
                fields.first().copied().unwrap_or("")
            );
            continue;
        }
        let key_path = key_dir.join(fields[2]);
        let private_key = key_path.exists().then_some(key_path);
        let password = fields
            .get(3)
            .map(|field| field.to_string())
            .filter(|field| !field.is_empty());
        cases.push(RepoCase {
            url: fields[0].to_string(),
            username: fields[1].to_string(),
            password,
            private_key,
        });
    }
    cases
}

/// Shuffle and cap the computed case list.
pub fn sample_cases<R: Rng + ?Sized>(
    mut cases: Vec<TestCase>,
    exercise_all: bool,
    rng: &mut R,
) -> Vec<TestCase> {
    cases.shuffle(rng);
    if !exercise_all {
        cases.truncate(SAMPLE_CAP);
    }
    cases
}

/// Backends usable on this host. The embedded backend is always available;
/// the command-line backend only when its capability probe passes.
pub async fn available_backends() -> Vec<BackendKind> {
    let mut kinds = Vec::new();
    if CliBackend::new().supports_credential_override().await {
        kinds.push(BackendKind::Cli);
    }
    kinds.push(BackendKind::Embedded);
    kinds
}

/// Compute the sampled backend × repository case list.
pub async fn generate(source: &CaseSource) -> Result<Vec<TestCase>> {
    let backends = available_backends().await;
    let default_key = source.default_private_key();
    let mut cases = Vec::new();

    for backend in &backends {
        // At least one authentication case even without a definitions
        // file, provided the operator has a default key.
        if default_key.exists() {
            cases.push(TestCase {
                backend: *backend,
                repo: RepoCase {
                    url: DEFAULT_CASE_URL.to_string(),
                    username: source.fallback_username.clone(),
                    password: None,
                    private_key: Some(default_key.clone()),
                },
            });
        }

        let definitions = source.definitions_file();
        if definitions.exists() {
            let text = std::fs::read_to_string(&definitions)
                .with_context(|| format!("reading {}", definitions.display()))?;
            for mut repo in parse_definitions(&text, &source.auth_data_dir()) {
                if repo.private_key.is_none() && repo.password.is_none() && default_key.exists() {
                    repo.private_key = Some(default_key.clone());
                }
                cases.push(TestCase {
                    backend: *backend,
                    repo,
                });
            }
        }
    }

    Ok(sample_cases(
        cases,
        source.exercise_all,
        &mut rand::thread_rng(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn case(url: &str) -> TestCase {
        TestCase {
            backend: BackendKind::Embedded,
            repo: RepoCase {
                url: url.to_string(),
                username: "tester".to_string(),
                password: Some("pw".to_string()),
                private_key: None,
            },
        }
    }

    #[test]
    fn short_rows_are_skipped_without_aborting() {
        let key_dir = TempDir::new().unwrap();
        let text = "https://example.com/a.git,alice,missing-key,secret\n\
                    https://example.com/short.git,bob\n\
                    https://example.com/c.git,carol,missing-key\n";
        let cases = parse_definitions(text, key_dir.path());
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].url, "https://example.com/a.git");
        assert_eq!(cases[0].password.as_deref(), Some("secret"));
        assert_eq!(cases[1].username, "carol");
        assert!(cases.iter().all(|case| case.url != "https://example.com/short.git"));
    }

    #[test]
    fn missing_key_file_falls_back_to_password_only() {
        let key_dir = TempDir::new().unwrap();
        let text = "https://example.com/a.git,alice,no-such-key,secret\n";
        let cases = parse_definitions(text, key_dir.path());
        assert_eq!(cases[0].private_key, None);
        assert_eq!(cases[0].password.as_deref(), Some("secret"));
    }

    #[test]
    fn present_key_file_is_resolved_relative_to_key_dir() {
        let key_dir = TempDir::new().unwrap();
        std::fs::write(key_dir.path().join("deploy_key"), "key material").unwrap();
        let text = "https://example.com/a.git,alice,deploy_key\n";
        let cases = parse_definitions(text, key_dir.path());
        assert_eq!(
            cases[0].private_key.as_deref(),
            Some(key_dir.path().join("deploy_key").as_path())
        );
    }

    #[test]
    fn sampling_caps_at_three() {
        let cases: Vec<_> = (0..10).map(|i| case(&format!("https://example.com/{i}.git"))).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let sampled = sample_cases(cases, false, &mut rng);
        assert_eq!(sampled.len(), 3);
    }

    #[test]
    fn exercise_all_returns_every_case() {
        let cases: Vec<_> = (0..10).map(|i| case(&format!("https://example.com/{i}.git"))).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let sampled = sample_cases(cases, true, &mut rng);
        assert_eq!(sampled.len(), 10);
    }

    #[test]
    fn small_lists_survive_sampling_untouched_in_size() {
        let cases = vec![case("https://example.com/only.git")];
        let mut rng = StdRng::seed_from_u64(7);
        let sampled = sample_cases(cases, false, &mut rng);
        assert_eq!(sampled.len(), 1);
    }
}
