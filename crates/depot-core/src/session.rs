//! The resolution session: per-call configuration plus the transient
//! caches that make repeated lookups within one session cheap and
//! idempotent (spec.md §5 "Concurrency model", §3 invariant on
//! at-most-once update checks).

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::priority::RepositoryKeyFn;
use crate::repository::Authentication;
use crate::update_check::UpdateCheckMemo;

/// A cache of arbitrary descriptor/version-range lookups, keyed by a
/// caller-chosen string key. Distinct from [`DataCache`] in that entries
/// here are expected to be small, structured results (descriptors,
/// ranges) rather than raw bytes.
#[derive(Default)]
pub struct DescriptorCache {
    entries: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: Any + Send + Sync + Clone>(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().expect("descriptor cache poisoned");
        entries.get(key).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    pub fn put<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        let mut entries = self.entries.lock().expect("descriptor cache poisoned");
        entries.insert(key.into(), Arc::new(value));
    }
}

impl std::fmt::Debug for DescriptorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorCache").finish_non_exhaustive()
    }
}

/// A cache for larger opaque blobs (e.g. parsed metadata files), keyed
/// the same way as [`DescriptorCache`] but stored as raw bytes so callers
/// decide how to interpret them.
#[derive(Default)]
pub struct DataCache {
    entries: Mutex<HashMap<String, Arc<Vec<u8>>>>,
}

impl DataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        let entries = self.entries.lock().expect("data cache poisoned");
        entries.get(key).cloned()
    }

    pub fn put(&self, key: impl Into<String>, value: Vec<u8>) {
        let mut entries = self.entries.lock().expect("data cache poisoned");
        entries.insert(key.into(), Arc::new(value));
    }
}

impl std::fmt::Debug for DataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCache").finish_non_exhaustive()
    }
}

/// Credentials cache keyed by repository [`RepositoryKeyFn`] output, so
/// an interactive credential prompt or keyring lookup happens at most
/// once per repository per session.
#[derive(Debug, Default)]
pub struct AuthenticationCache {
    entries: Mutex<HashMap<String, Authentication>>,
}

impl AuthenticationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, repository_key: &str) -> Option<Authentication> {
        let entries = self.entries.lock().expect("auth cache poisoned");
        entries.get(repository_key).cloned()
    }

    pub fn put(&self, repository_key: impl Into<String>, auth: Authentication) {
        let mut entries = self.entries.lock().expect("auth cache poisoned");
        entries.insert(repository_key.into(), auth);
    }
}

/// Everything one resolution call shares across its lifetime: the
/// effective configuration, the session-scoped caches, and the
/// repository-key function used to address them.
pub struct Session {
    pub config: Config,
    pub descriptor_cache: DescriptorCache,
    pub data_cache: DataCache,
    pub auth_cache: AuthenticationCache,
    pub update_check_memo: Mutex<UpdateCheckMemo>,
    pub repository_key_fn: RepositoryKeyFn,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            descriptor_cache: DescriptorCache::new(),
            data_cache: DataCache::new(),
            auth_cache: AuthenticationCache::new(),
            update_check_memo: Mutex::new(UpdateCheckMemo::new()),
            repository_key_fn: RepositoryKeyFn::Nid,
        }
    }

    pub fn with_repository_key_fn(mut self, f: RepositoryKeyFn) -> Self {
        self.repository_key_fn = f;
        self
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
