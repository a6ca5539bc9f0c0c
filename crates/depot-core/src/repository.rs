//! `RemoteRepository` and its policies (spec.md §3 DATA MODEL, §4.D, §4.I).

use crate::update_check::UpdatePolicy;

/// `fail | warn | ignore` checksum enforcement (spec.md §4.D, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChecksumPolicyKind {
    Ignore,
    Warn,
    Fail,
}

impl ChecksumPolicyKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "ignore" => ChecksumPolicyKind::Ignore,
            "warn" => ChecksumPolicyKind::Warn,
            _ => ChecksumPolicyKind::Fail,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumPolicyKind::Ignore => "ignore",
            ChecksumPolicyKind::Warn => "warn",
            ChecksumPolicyKind::Fail => "fail",
        }
    }

    /// The stricter of two policies: `fail > warn > ignore` (spec.md §4.D
    /// "effective policy" merge, used when a request-level policy and a
    /// repository-level policy disagree).
    pub fn effective(a: ChecksumPolicyKind, b: ChecksumPolicyKind) -> ChecksumPolicyKind {
        a.max(b)
    }
}

/// Per-repository policy for one content nature (releases or snapshots).
#[derive(Debug, Clone)]
pub struct RepositoryPolicy {
    pub enabled: bool,
    pub update_policy: UpdatePolicy,
    pub checksum_policy: ChecksumPolicyKind,
}

impl RepositoryPolicy {
    pub fn new(enabled: bool, update_policy: UpdatePolicy, checksum_policy: ChecksumPolicyKind) -> Self {
        Self {
            enabled,
            update_policy,
            checksum_policy,
        }
    }

    pub fn default_enabled() -> Self {
        Self {
            enabled: true,
            update_policy: UpdatePolicy::Daily,
            checksum_policy: ChecksumPolicyKind::Warn,
        }
    }

    /// Merge two policies for the same content nature, as when a
    /// repository and its mirrored members disagree (spec.md §4.I): the
    /// result is enabled if either input is, and carries the stricter
    /// update/checksum policy of the two.
    pub fn effective(a: &RepositoryPolicy, b: &RepositoryPolicy) -> RepositoryPolicy {
        RepositoryPolicy {
            enabled: a.enabled || b.enabled,
            update_policy: UpdatePolicy::effective(&a.update_policy, &b.update_policy),
            checksum_policy: ChecksumPolicyKind::effective(a.checksum_policy, b.checksum_policy),
        }
    }
}

/// Network proxy configuration for a repository.
#[derive(Debug, Clone)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Repository credentials, looked up via `AuthenticationSelector` and
/// cached per session (spec.md §4.I).
#[derive(Debug, Clone)]
pub struct Authentication {
    pub username: Option<String>,
    pub password: Option<String>,
    pub private_key_path: Option<String>,
}

/// A single remote repository endpoint: a URL plus per-nature policies and
/// optional proxy/auth/mirroring (spec.md §3 DATA MODEL, §4.I).
#[derive(Debug, Clone)]
pub struct RemoteRepository {
    pub id: String,
    pub content_type: String,
    pub url: String,
    pub releases_policy: RepositoryPolicy,
    pub snapshots_policy: RepositoryPolicy,
    pub proxy: Option<Proxy>,
    pub authentication: Option<Authentication>,
    /// When this repository represents a mirror, the ids of the
    /// repositories it mirrors (spec.md §4.I `mirroredRepositories`).
    pub mirrored_repositories: Vec<String>,
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content_type: "default".to_string(),
            url: url.into(),
            releases_policy: RepositoryPolicy::default_enabled(),
            snapshots_policy: RepositoryPolicy::default_enabled(),
            proxy: None,
            authentication: None,
            mirrored_repositories: Vec::new(),
        }
    }

    pub fn with_releases_policy(mut self, policy: RepositoryPolicy) -> Self {
        self.releases_policy = policy;
        self
    }

    pub fn with_snapshots_policy(mut self, policy: RepositoryPolicy) -> Self {
        self.snapshots_policy = policy;
        self
    }

    pub fn with_proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = Some(authentication);
        self
    }

    /// The applicable policy for an artifact's nature (snapshot vs
    /// release), used to decide enablement and effective update/checksum
    /// behavior for a given fetch (spec.md §4.I).
    pub fn policy_for(&self, is_snapshot: bool) -> &RepositoryPolicy {
        if is_snapshot {
            &self.snapshots_policy
        } else {
            &self.releases_policy
        }
    }

    /// Stable key for this repository's id, used by tracking files and
    /// caches, with a URL-hash suffix to disambiguate repositories that
    /// reuse the same id against different URLs (`nid`, spec.md §4.F,
    /// GLOSSARY).
    pub fn nid(&self) -> String {
        format!("{}-{:x}", self.id, simple_hash(&self.url))
    }

    /// Human-readable variant of [`RemoteRepository::nid`] that keeps the
    /// URL host visible, used in progress/log output (`nid_hurl`).
    pub fn nid_hurl(&self) -> String {
        let host = self
            .url
            .split("://")
            .nth(1)
            .and_then(|rest| rest.split('/').next())
            .unwrap_or(&self.url);
        format!("{}-{}", self.id, host)
    }
}

fn simple_hash(s: &str) -> u32 {
    // FNV-1a: small, dependency-free, and stable across runs, which is
    // all `nid` needs — it is a cache-key suffix, not a checksum.
    let mut hash: u32 = 0x811c9dc5;
    for byte in s.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x01000193);
    }
    hash
}
