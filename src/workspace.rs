//! Temporary workspace allocation.
//!
//! Each test instance owns one freshly allocated directory; disposal is
//! fire-and-forget so teardown never blocks on filesystem cleanup.

use std::path::PathBuf;

use tempfile::TempDir;
use tracing::warn;

use crate::error::GitResult;

/// Allocates isolated temporary directories and disposes of them in the
/// background, best-effort.
#[derive(Debug, Default)]
pub struct WorkspaceAllocator {
    allocated: Vec<TempDir>,
}

impl WorkspaceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh unique directory.
    pub fn allocate(&mut self) -> GitResult<PathBuf> {
        let dir = tempfile::Builder::new().prefix("git-client-").tempdir()?;
        let path = dir.path().to_path_buf();
        self.allocated.push(dir);
        Ok(path)
    }

    /// Remove every allocated directory without waiting for the removal to
    /// finish. Failures are logged, never surfaced.
    pub fn dispose_async(&mut self) {
        let dirs = std::mem::take(&mut self.allocated);
        if dirs.is_empty() {
            return;
        }
        let cleanup = move || {
            for dir in dirs {
                let path = dir.path().to_path_buf();
                if let Err(err) = dir.close() {
                    warn!(path = %path.display(), error = %err, "workspace cleanup failed");
                }
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(cleanup);
            }
            Err(_) => {
                std::thread::spawn(cleanup);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_distinct_directories() {
        let mut allocator = WorkspaceAllocator::new();
        let first = allocator.allocate().unwrap();
        let second = allocator.allocate().unwrap();
        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
    }

    #[test]
    fn dispose_async_is_safe_without_allocations() {
        let mut allocator = WorkspaceAllocator::new();
        allocator.dispose_async();
    }

    #[test_log::test(tokio::test)]
    async fn dispose_async_removes_directories_eventually() {
        let mut allocator = WorkspaceAllocator::new();
        let path = allocator.allocate().unwrap();
        allocator.dispose_async();
        for _ in 0..50 {
            if !path.exists() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("workspace at {} was not removed", path.display());
    }
}
