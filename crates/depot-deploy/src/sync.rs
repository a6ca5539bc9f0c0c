//! `SyncContext` (component P, spec.md §4.P): coarse-grained locking over
//! the canonical paths of a batch of artifacts and metadata, so two
//! concurrent installs/deploys touching the same files serialize instead
//! of corrupting each other's writes. Re-entry by the same session is
//! safe (reference-counted per owner); `release()` is idempotent.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug, Default)]
struct LockState {
    owner: Option<String>,
    count: usize,
}

/// Shared lock table backing every [`InMemorySyncContext`] produced by
/// one [`InMemorySyncContextFactory`]. A real distributed implementation
/// would replace this with a lock service; the in-process default only
/// needs to coordinate within one running session (spec.md §4.P
/// "pluggable for file-system locks or a distributed service").
#[derive(Default)]
struct LockTable {
    locks: Mutex<HashMap<PathBuf, LockState>>,
    condvar: Condvar,
}

impl LockTable {
    fn acquire_one(&self, path: &Path, owner: &str) {
        let mut locks = self.locks.lock().unwrap();
        loop {
            let state = locks.entry(path.to_path_buf()).or_default();
            match &state.owner {
                Some(current) if current == owner => {
                    state.count += 1;
                    return;
                }
                None => {
                    state.owner = Some(owner.to_string());
                    state.count = 1;
                    return;
                }
                Some(_) => {
                    locks = self.condvar.wait(locks).unwrap();
                }
            }
        }
    }

    fn release_one(&self, path: &Path, owner: &str) {
        let mut locks = self.locks.lock().unwrap();
        if let Some(state) = locks.get_mut(path) {
            if state.owner.as_deref() == Some(owner) {
                state.count = state.count.saturating_sub(1);
                if state.count == 0 {
                    locks.remove(path);
                }
            }
        }
        self.condvar.notify_all();
    }
}

/// A coordinate set this sync context locks: every item's primary file
/// plus its checksum side-cars, canonicalized for stable comparison
/// (spec.md §4.P "canonical file paths").
pub fn canonicalize_or_as_is(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

pub trait SyncContext: Send {
    /// Acquire locks over `paths` (already canonicalized), blocking
    /// until available. Paths are locked in a fixed sorted order so two
    /// contexts racing for the same overlapping set never deadlock.
    fn acquire(&mut self, paths: &[PathBuf]);

    /// Release every lock this context currently holds. Safe to call
    /// more than once (spec.md §4.P "release() is idempotent").
    fn release(&mut self);
}

pub trait SyncContextFactory: Send + Sync {
    fn new_context(&self, session_id: &str, exclusive: bool) -> Box<dyn SyncContext>;
}

pub struct InMemorySyncContext {
    table: Arc<LockTable>,
    owner: String,
    held: HashSet<PathBuf>,
}

impl SyncContext for InMemorySyncContext {
    fn acquire(&mut self, paths: &[PathBuf]) {
        let mut sorted: Vec<PathBuf> = paths.to_vec();
        sorted.sort();
        sorted.dedup();
        for path in &sorted {
            self.table.acquire_one(path, &self.owner);
            self.held.insert(path.clone());
        }
    }

    fn release(&mut self) {
        for path in self.held.drain() {
            self.table.release_one(&path, &self.owner);
        }
    }
}

impl Drop for InMemorySyncContext {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Default)]
pub struct InMemorySyncContextFactory {
    table: Arc<LockTable>,
}

impl InMemorySyncContextFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyncContextFactory for InMemorySyncContextFactory {
    fn new_context(&self, session_id: &str, _exclusive: bool) -> Box<dyn SyncContext> {
        Box::new(InMemorySyncContext {
            table: Arc::clone(&self.table),
            owner: session_id.to_string(),
            held: HashSet::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_owner_can_reacquire_without_blocking() {
        let factory = InMemorySyncContextFactory::new();
        let mut ctx = factory.new_context("session-1", true);
        let path = PathBuf::from("/repo/org/example/lib/1.0/lib-1.0.jar");
        ctx.acquire(&[path.clone()]);
        ctx.acquire(&[path]);
        ctx.release();
    }

    #[test]
    fn release_is_idempotent() {
        let factory = InMemorySyncContextFactory::new();
        let mut ctx = factory.new_context("session-1", true);
        ctx.acquire(&[PathBuf::from("/repo/a.jar")]);
        ctx.release();
        ctx.release();
    }

    #[test]
    fn different_owners_serialize_on_overlapping_paths() {
        let factory = Arc::new(InMemorySyncContextFactory::new());
        let path = PathBuf::from("/repo/org/example/lib/1.0/lib-1.0.jar");

        let f1 = Arc::clone(&factory);
        let p1 = path.clone();
        let handle = thread::spawn(move || {
            let mut ctx = f1.new_context("session-a", true);
            ctx.acquire(&[p1]);
            thread::sleep(Duration::from_millis(50));
            ctx.release();
        });

        thread::sleep(Duration::from_millis(10));
        let mut ctx_b = factory.new_context("session-b", true);
        let start = std::time::Instant::now();
        ctx_b.acquire(&[path]);
        ctx_b.release();
        handle.join().unwrap();

        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
