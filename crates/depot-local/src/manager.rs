//! `LocalRepositoryManager` (component E, spec.md §4.E): the on-disk
//! cache of installed and downloaded artifacts. Two layouts are
//! provided: [`SimpleLocalRepositoryManager`] (a flat Maven2 tree, no
//! origin separation) and [`EnhancedLocalRepositoryManager`] (splits
//! locally-installed files from per-remote-repository caches, which
//! lets the same GAV be cached from two different remotes without
//! collision).

use std::path::{Path, PathBuf};

use depot_core::artifact::Artifact;
use depot_core::metadata::Metadata;
use depot_transport::layout::Maven2Layout;

use crate::tracking::TrackingStore;

/// The outcome of a local lookup: whether the file is present, and if
/// so, whether tracking data says it came from `repository_key`
/// (spec.md §4.E, §4.F).
#[derive(Debug, Clone)]
pub struct LocalArtifactResult {
    pub file: Option<PathBuf>,
    pub available_from_origin: bool,
}

pub trait LocalRepositoryManager: Send + Sync {
    fn root(&self) -> &Path;

    /// Path a locally-installed (not downloaded) artifact lives at.
    fn path_for_local_artifact(&self, artifact: &Artifact) -> PathBuf;

    /// Path an artifact downloaded from `repository_key` lives at.
    fn path_for_remote_artifact(&self, artifact: &Artifact, repository_key: &str) -> PathBuf;

    fn path_for_local_metadata(&self, metadata: &Metadata) -> PathBuf;

    fn path_for_remote_metadata(&self, metadata: &Metadata, repository_key: &str) -> PathBuf;

    /// Look up `artifact`, preferring a local install, then checking
    /// whether the cached copy (if any) is tracked as having come from
    /// `repository_key`.
    fn find_artifact(&self, artifact: &Artifact, repository_key: &str) -> miette::Result<LocalArtifactResult> {
        let local_path = self.path_for_local_artifact(artifact);
        if local_path.is_file() {
            return Ok(LocalArtifactResult {
                file: Some(local_path),
                available_from_origin: true,
            });
        }

        let remote_path = self.path_for_remote_artifact(artifact, repository_key);
        if remote_path.is_file() {
            let dir = remote_path.parent().unwrap_or(&remote_path);
            let filename = remote_path.file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_default();
            let available_from_origin = TrackingStore::is_available_from(dir, &filename, repository_key)?;
            return Ok(LocalArtifactResult {
                file: Some(remote_path),
                available_from_origin,
            });
        }

        Ok(LocalArtifactResult {
            file: None,
            available_from_origin: false,
        })
    }

    /// Record that `artifact` was just cached from `repository_key`
    /// (spec.md §4.F).
    fn record_origin(&self, artifact: &Artifact, repository_key: &str) -> miette::Result<()> {
        let path = self.path_for_remote_artifact(artifact, repository_key);
        let dir = path.parent().unwrap_or(&path);
        let filename = path.file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_default();
        TrackingStore::record(dir, &filename, repository_key)
    }
}

/// A flat Maven2 tree with no origin separation: installed and
/// downloaded artifacts share the same path regardless of which
/// repository a download came from. Matches the classic single-user
/// `~/.m2/repository` layout.
pub struct SimpleLocalRepositoryManager {
    root: PathBuf,
    layout: Maven2Layout,
}

impl SimpleLocalRepositoryManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            layout: Maven2Layout,
        }
    }
}

impl LocalRepositoryManager for SimpleLocalRepositoryManager {
    fn root(&self) -> &Path {
        &self.root
    }

    fn path_for_local_artifact(&self, artifact: &Artifact) -> PathBuf {
        self.root.join(self.layout.artifact_path(artifact))
    }

    fn path_for_remote_artifact(&self, artifact: &Artifact, _repository_key: &str) -> PathBuf {
        self.root
            .join(self.layout.artifact_path_with_resolved_version(artifact, &artifact.version))
    }

    fn path_for_local_metadata(&self, metadata: &Metadata) -> PathBuf {
        self.root.join(self.layout.metadata_path(metadata))
    }

    fn path_for_remote_metadata(&self, metadata: &Metadata, _repository_key: &str) -> PathBuf {
        self.path_for_local_metadata(metadata)
    }
}

/// Splits locally-installed artifacts (under `installed/`) from
/// per-remote-repository caches (under `cache/<repository_key>/`), so a
/// GAV cached from two different repositories never collides, and a
/// locally-`install`ed artifact is never shadowed by a stale download
/// (spec.md §4.E "enhanced layout").
pub struct EnhancedLocalRepositoryManager {
    root: PathBuf,
    layout: Maven2Layout,
}

impl EnhancedLocalRepositoryManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            layout: Maven2Layout,
        }
    }

    fn installed_root(&self) -> PathBuf {
        self.root.join("installed")
    }

    fn cache_root(&self, repository_key: &str) -> PathBuf {
        self.root.join("cache").join(repository_key)
    }
}

impl LocalRepositoryManager for EnhancedLocalRepositoryManager {
    fn root(&self) -> &Path {
        &self.root
    }

    fn path_for_local_artifact(&self, artifact: &Artifact) -> PathBuf {
        self.installed_root().join(self.layout.artifact_path(artifact))
    }

    fn path_for_remote_artifact(&self, artifact: &Artifact, repository_key: &str) -> PathBuf {
        self.cache_root(repository_key)
            .join(self.layout.artifact_path_with_resolved_version(artifact, &artifact.version))
    }

    fn path_for_local_metadata(&self, metadata: &Metadata) -> PathBuf {
        self.installed_root().join(self.layout.metadata_path(metadata))
    }

    fn path_for_remote_metadata(&self, metadata: &Metadata, repository_key: &str) -> PathBuf {
        self.cache_root(repository_key).join(self.layout.metadata_path(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_layout_shares_path_regardless_of_origin() {
        let manager = SimpleLocalRepositoryManager::new("/repo");
        let artifact = Artifact::new("org.example", "lib", "1.0");
        assert_eq!(
            manager.path_for_remote_artifact(&artifact, "central"),
            manager.path_for_remote_artifact(&artifact, "other")
        );
    }

    #[test]
    fn enhanced_layout_separates_installed_from_cached() {
        let manager = EnhancedLocalRepositoryManager::new("/repo");
        let artifact = Artifact::new("org.example", "lib", "1.0");
        let local = manager.path_for_local_artifact(&artifact);
        let remote = manager.path_for_remote_artifact(&artifact, "central");
        assert_ne!(local, remote);
        assert!(local.starts_with("/repo/installed"));
        assert!(remote.starts_with("/repo/cache/central"));
    }

    #[test]
    fn enhanced_layout_separates_by_repository_key() {
        let manager = EnhancedLocalRepositoryManager::new("/repo");
        let artifact = Artifact::new("org.example", "lib", "1.0");
        let from_central = manager.path_for_remote_artifact(&artifact, "central");
        let from_other = manager.path_for_remote_artifact(&artifact, "other-mirror");
        assert_ne!(from_central, from_other);
    }

    #[test]
    fn find_artifact_prefers_local_install_over_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = EnhancedLocalRepositoryManager::new(tmp.path());
        let artifact = Artifact::new("org.example", "lib", "1.0");

        let local_path = manager.path_for_local_artifact(&artifact);
        std::fs::create_dir_all(local_path.parent().unwrap()).unwrap();
        std::fs::write(&local_path, b"installed").unwrap();

        let remote_path = manager.path_for_remote_artifact(&artifact, "central");
        std::fs::create_dir_all(remote_path.parent().unwrap()).unwrap();
        std::fs::write(&remote_path, b"cached").unwrap();

        let result = manager.find_artifact(&artifact, "central").unwrap();
        assert_eq!(result.file, Some(local_path));
    }

    #[test]
    fn find_artifact_reports_origin_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = EnhancedLocalRepositoryManager::new(tmp.path());
        let artifact = Artifact::new("org.example", "lib", "1.0");

        let remote_path = manager.path_for_remote_artifact(&artifact, "central");
        std::fs::create_dir_all(remote_path.parent().unwrap()).unwrap();
        std::fs::write(&remote_path, b"cached").unwrap();
        manager.record_origin(&artifact, "central").unwrap();

        let result = manager.find_artifact(&artifact, "central").unwrap();
        assert!(result.available_from_origin);

        // A different repository key resolves to a different cache
        // path entirely under the enhanced layout, so it reports as not
        // present rather than as an origin mismatch.
        let result_other = manager.find_artifact(&artifact, "other-mirror").unwrap();
        assert!(!result_other.available_from_origin);
        assert!(result_other.file.is_none());
    }
}
