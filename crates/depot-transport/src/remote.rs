//! `RemoteRepositoryManager` (component I, spec.md §4.I): merges a
//! dominant and recessive repository list, and resolves mirrors,
//! authentication, and proxies for a given repository.

use depot_core::priority::PrioritizedComponents;
use depot_core::repository::{Authentication, Proxy, RemoteRepository};

/// Selects a mirror for a given repository, e.g. by matching against a
/// configured mirror-of pattern. Kept as a trait so embedders can plug
/// in their own mirror configuration source (spec.md §6).
pub trait MirrorSelector: Send + Sync {
    fn select(&self, repository: &RemoteRepository) -> Option<RemoteRepository>;
}

pub trait AuthenticationSelector: Send + Sync {
    fn select(&self, repository: &RemoteRepository) -> Option<Authentication>;
}

pub trait ProxySelector: Send + Sync {
    fn select(&self, repository: &RemoteRepository) -> Option<Proxy>;
}

/// Aggregates repository lists from multiple sources (a project's own
/// declared repositories plus ones inherited from its ancestry) and
/// applies mirror/auth/proxy selection uniformly.
pub struct RemoteRepositoryManager {
    mirror_selectors: PrioritizedComponents<Box<dyn MirrorSelector>>,
    auth_selectors: PrioritizedComponents<Box<dyn AuthenticationSelector>>,
    proxy_selectors: PrioritizedComponents<Box<dyn ProxySelector>>,
}

impl Default for RemoteRepositoryManager {
    fn default() -> Self {
        Self {
            mirror_selectors: PrioritizedComponents::new(),
            auth_selectors: PrioritizedComponents::new(),
            proxy_selectors: PrioritizedComponents::new(),
        }
    }
}

impl RemoteRepositoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mirror_selector(&mut self, name: impl Into<String>, priority: f64, selector: Box<dyn MirrorSelector>) {
        self.mirror_selectors.add(name, priority, selector);
    }

    pub fn add_authentication_selector(
        &mut self,
        name: impl Into<String>,
        priority: f64,
        selector: Box<dyn AuthenticationSelector>,
    ) {
        self.auth_selectors.add(name, priority, selector);
    }

    pub fn add_proxy_selector(&mut self, name: impl Into<String>, priority: f64, selector: Box<dyn ProxySelector>) {
        self.proxy_selectors.add(name, priority, selector);
    }

    /// Merge a `dominant` repository list (e.g. from the current project)
    /// with a `recessive` one (e.g. inherited defaults): dominant entries
    /// win on id collision, recessive entries fill in the rest, order
    /// preserved (spec.md §4.I "aggregation").
    pub fn aggregate(
        &self,
        dominant: Vec<RemoteRepository>,
        recessive: Vec<RemoteRepository>,
    ) -> Vec<RemoteRepository> {
        let mut seen_ids: std::collections::HashSet<String> =
            dominant.iter().map(|r| r.id.clone()).collect();
        let mut merged = dominant;
        for repo in recessive {
            if seen_ids.insert(repo.id.clone()) {
                merged.push(repo);
            }
        }
        merged
    }

    /// Apply the first matching mirror, then authentication, then proxy
    /// for `repository`, in that priority order (spec.md §4.I).
    pub fn apply(&self, repository: RemoteRepository) -> RemoteRepository {
        let mirrored = self
            .mirror_selectors
            .ordered()
            .into_iter()
            .find_map(|selector| selector.select(&repository))
            .unwrap_or(repository);

        let mut resolved = mirrored;
        if resolved.authentication.is_none() {
            resolved.authentication = self
                .auth_selectors
                .ordered()
                .into_iter()
                .find_map(|selector| selector.select(&resolved));
        }
        if resolved.proxy.is_none() {
            resolved.proxy = self
                .proxy_selectors
                .ordered()
                .into_iter()
                .find_map(|selector| selector.select(&resolved));
        }
        resolved
    }
}
