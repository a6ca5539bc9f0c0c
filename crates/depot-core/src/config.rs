//! Session-wide configuration: local repository layout, network
//! behavior, and default policies. Loaded from environment variables the
//! way the rest of the ambient stack favors explicit, inspectable
//! configuration over hidden defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::repository::ChecksumPolicyKind;
use crate::update_check::UpdatePolicy;

/// `simple | enhanced` local repository directory layout (spec.md §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalLayoutKind {
    Simple,
    Enhanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub local_repository: PathBuf,
    pub local_layout: LocalLayoutKind,
    pub offline: bool,
    pub default_update_policy: String,
    pub default_checksum_policy: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_concurrent_downloads: usize,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_repository: default_local_repository(),
            local_layout: LocalLayoutKind::Enhanced,
            offline: false,
            default_update_policy: "daily".to_string(),
            default_checksum_policy: "warn".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            max_concurrent_downloads: 5,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Overlay `DEPOT_*` environment variables onto the defaults.
    /// Malformed values are left at their current setting rather than
    /// failing the whole load — a single bad env var should not make
    /// resolution impossible.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("DEPOT_LOCAL_REPOSITORY") {
            self.local_repository = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("DEPOT_LOCAL_LAYOUT") {
            self.local_layout = match v.as_str() {
                "simple" => LocalLayoutKind::Simple,
                "enhanced" => LocalLayoutKind::Enhanced,
                _ => self.local_layout,
            };
        }
        if let Ok(v) = std::env::var("DEPOT_OFFLINE") {
            if let Ok(b) = v.parse() {
                self.offline = b;
            }
        }
        if let Ok(v) = std::env::var("DEPOT_UPDATE_POLICY") {
            self.default_update_policy = v;
        }
        if let Ok(v) = std::env::var("DEPOT_CHECKSUM_POLICY") {
            self.default_checksum_policy = v;
        }
        if let Ok(v) = std::env::var("DEPOT_MAX_CONCURRENT_DOWNLOADS") {
            if let Ok(n) = v.parse() {
                self.max_concurrent_downloads = n;
            }
        }
    }

    pub fn update_policy(&self) -> UpdatePolicy {
        UpdatePolicy::parse(&self.default_update_policy)
    }

    pub fn checksum_policy(&self) -> ChecksumPolicyKind {
        ChecksumPolicyKind::parse(&self.default_checksum_policy)
    }
}

fn default_local_repository() -> PathBuf {
    dirs_local_repository().unwrap_or_else(|| PathBuf::from(".depot/repository"))
}

/// `~/.m2`-equivalent default: `$HOME/.depot/repository`, falling back to
/// a workspace-relative directory when `HOME` is unset (e.g. CI
/// containers).
fn dirs_local_repository() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".depot").join("repository"))
}
