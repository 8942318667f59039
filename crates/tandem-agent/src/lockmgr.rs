//! Per-path file lock manager.
//!
//! All workers in a process share one [`FileLockManager`]; write commands
//! targeting the same absolute path are serialized through it, which is the
//! entire cross-worker consistency story.  Reads take no lock.
//!
//! Internally the manager is a [`DashMap`] from normalized path to a shared
//! `tokio::sync::Mutex`.  Entries are created lazily (creation itself is
//! serialized by the map's per-shard locking) and reused for the life of the
//! process -- the table is never evicted.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-path mutexes, safe for concurrent use from any number of
/// workers.
#[derive(Debug, Default)]
pub struct FileLockManager {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl FileLockManager {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a path to its absolute form.  Unresolvable paths fall back
    /// to the raw string, so they still lock consistently against themselves.
    fn normalize(path: &str) -> PathBuf {
        std::path::absolute(path).unwrap_or_else(|_| PathBuf::from(path))
    }

    /// Fetch (or lazily create) the mutex for a path.
    fn entry(&self, path: &str) -> Arc<Mutex<()>> {
        let key = Self::normalize(path);
        self.locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquire the lock for `path`, waiting if another worker holds it.
    /// Dropping the returned guard releases the lock.
    pub async fn lock(&self, path: &str) -> OwnedMutexGuard<()> {
        tracing::trace!(path = %path, "acquiring file lock");
        self.entry(path).lock_owned().await
    }

    /// Run `fut` while holding the lock for `path`.
    pub async fn with_lock<T, F>(&self, path: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let _guard = self.lock(path).await;
        fut.await
    }

    /// Number of distinct paths that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether the table has any entries.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_path_excludes() {
        let mgr = Arc::new(FileLockManager::new());
        let counter = Arc::new(std::sync::Mutex::new((0u32, 0u32))); // (current, max)

        let mut handles = Vec::new();
        for _ in 0..8 {
            let mgr = Arc::clone(&mgr);
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                let _guard = mgr.lock("/tmp/contended").await;
                {
                    let mut c = counter.lock().unwrap();
                    c.0 += 1;
                    c.1 = c.1.max(c.0);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.lock().unwrap().0 -= 1;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        // Never more than one holder at a time.
        assert_eq!(counter.lock().unwrap().1, 1);
    }

    #[tokio::test]
    async fn distinct_paths_do_not_block() {
        let mgr = FileLockManager::new();
        let _a = mgr.lock("/tmp/a").await;
        // Would deadlock if /tmp/b shared /tmp/a's mutex.
        let _b = mgr.lock("/tmp/b").await;
        assert_eq!(mgr.len(), 2);
    }

    #[tokio::test]
    async fn dot_components_normalize_to_the_same_lock() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("file.txt");
        let dotted = format!("{}/./file.txt", dir.path().display());

        let mgr = FileLockManager::new();
        let _guard = mgr.lock(plain.to_str().unwrap()).await;
        let alias = mgr.entry(&dotted);

        // Both spellings resolved to the same entry, so it is held.
        assert!(alias.try_lock().is_err());
        assert_eq!(mgr.len(), 1);
    }

    #[tokio::test]
    async fn relative_paths_resolve_against_the_working_directory() {
        // Reads the CWD to compute the expected absolute form; never mutates
        // process state.
        let expected = std::env::current_dir()
            .unwrap()
            .join("relative-lock-probe.txt");

        let mgr = FileLockManager::new();
        let _guard = mgr.lock("relative-lock-probe.txt").await;
        let absolute = mgr.entry(expected.to_str().unwrap());

        assert!(absolute.try_lock().is_err());
        assert_eq!(mgr.len(), 1);
    }

    #[tokio::test]
    async fn with_lock_runs_and_releases() {
        let mgr = FileLockManager::new();
        let value = mgr.with_lock("/tmp/x", async { 42 }).await;
        assert_eq!(value, 42);

        // Lock is free again afterwards.
        let _guard = mgr.lock("/tmp/x").await;
    }

    #[tokio::test]
    async fn entries_are_reused() {
        let mgr = FileLockManager::new();
        drop(mgr.lock("/tmp/reuse").await);
        drop(mgr.lock("/tmp/reuse").await);
        assert_eq!(mgr.len(), 1);
    }
}
