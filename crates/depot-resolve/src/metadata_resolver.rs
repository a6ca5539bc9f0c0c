//! `MetadataResolver` (component J, spec.md §4.J): fetches and caches
//! `maven-metadata.xml` documents, deciding whether a remote recheck is
//! needed via the update-check state machine (component G) before
//! falling back to whatever is already on disk.

use std::sync::Arc;

use depot_core::metadata::{Metadata, SnapshotVersioning, VersioningIndex};
use depot_core::repository::RemoteRepository;
use depot_core::update_check::{self, UpdateCheckMemo};
use depot_local::manager::LocalRepositoryManager;
use depot_local::tracking::{TrackingStore, UpdateStatusStore};
use depot_transport::layout::Maven2Layout;
use depot_transport::transporter::{TransportRequest, Transporter};
use depot_util::errors::DepotError;
use tracing::debug;

use crate::metadata_xml::{parse_snapshot_versioning, parse_versioning_index};

pub struct MetadataResolver {
    transporter: Arc<dyn Transporter>,
    layout: Maven2Layout,
}

impl MetadataResolver {
    pub fn new(transporter: Arc<dyn Transporter>) -> Self {
        Self {
            transporter,
            layout: Maven2Layout,
        }
    }

    /// Resolve an artifact-level `group:artifact` metadata document
    /// (spec.md §4.J, §4.L step 1 input).
    #[allow(clippy::too_many_arguments)]
    pub async fn resolve_versioning_index(
        &self,
        local_repo: &dyn LocalRepositoryManager,
        repository: &RemoteRepository,
        repository_key: &str,
        memo: &mut UpdateCheckMemo,
        metadata: &Metadata,
        offline: bool,
        now_ms: u64,
    ) -> miette::Result<VersioningIndex> {
        let content = self
            .resolve_raw(local_repo, repository, repository_key, memo, metadata, offline, now_ms, MetadataRequestFlags::default())
            .await?;
        parse_versioning_index(&content)
    }

    /// Resolve a version-level `group:artifact:version` metadata
    /// document's snapshot block (spec.md §4.L step 5).
    #[allow(clippy::too_many_arguments)]
    pub async fn resolve_snapshot_versioning(
        &self,
        local_repo: &dyn LocalRepositoryManager,
        repository: &RemoteRepository,
        repository_key: &str,
        memo: &mut UpdateCheckMemo,
        metadata: &Metadata,
        offline: bool,
        now_ms: u64,
    ) -> miette::Result<SnapshotVersioning> {
        let content = self
            .resolve_raw(local_repo, repository, repository_key, memo, metadata, offline, now_ms, MetadataRequestFlags::default())
            .await?;
        parse_snapshot_versioning(&content)
    }

    /// Same as [`MetadataResolver::resolve_versioning_index`], but letting
    /// the caller opt into component J's two supplemented behaviors
    /// (spec.md §4.J, §8 boundary): `favor_local_repository` skips the
    /// remote check entirely whenever a local copy exists, and
    /// `delete_local_copy_if_missing` removes a stale local copy once the
    /// remote reports it no longer exists, instead of silently falling
    /// back to it.
    #[allow(clippy::too_many_arguments)]
    pub async fn resolve_versioning_index_with_flags(
        &self,
        local_repo: &dyn LocalRepositoryManager,
        repository: &RemoteRepository,
        repository_key: &str,
        memo: &mut UpdateCheckMemo,
        metadata: &Metadata,
        offline: bool,
        now_ms: u64,
        flags: MetadataRequestFlags,
    ) -> miette::Result<VersioningIndex> {
        let content = self
            .resolve_raw(local_repo, repository, repository_key, memo, metadata, offline, now_ms, flags)
            .await?;
        parse_versioning_index(&content)
    }

    #[allow(clippy::too_many_arguments)]
    async fn resolve_raw(
        &self,
        local_repo: &dyn LocalRepositoryManager,
        repository: &RemoteRepository,
        repository_key: &str,
        memo: &mut UpdateCheckMemo,
        metadata: &Metadata,
        offline: bool,
        now_ms: u64,
        flags: MetadataRequestFlags,
    ) -> miette::Result<String> {
        let item_key = metadata.key();
        let local_path = local_repo.path_for_remote_metadata(metadata, repository_key);
        let dir = local_path.parent().unwrap_or(&local_path).to_path_buf();
        let filename = local_path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();

        let has_local_file = local_path.is_file();

        if flags.favor_local_repository && has_local_file {
            debug!(%item_key, "favorLocalRepository set, skipping remote check entirely");
            return std::fs::read_to_string(&local_path).map_err(|e| DepotError::Io(e).into());
        }

        let last_update = UpdateStatusStore::last_updated(&dir, &filename, repository_key)?;
        let policy = repository.policy_for(metadata.nature_is_snapshot()).update_policy.clone();

        let required = if offline {
            false
        } else {
            update_check::check_required(
                memo,
                &item_key,
                repository_key,
                has_local_file,
                true,
                last_update,
                &policy,
                now_ms,
            )
        };

        if !required && has_local_file {
            debug!(%item_key, "using cached metadata, no recheck required");
            return std::fs::read_to_string(&local_path).map_err(|e| DepotError::Io(e).into());
        }

        if offline {
            if has_local_file {
                return std::fs::read_to_string(&local_path).map_err(|e| DepotError::Io(e).into());
            }
            return Err(DepotError::Offline {
                message: format!("{item_key} not cached and session is offline"),
            }
            .into());
        }

        let remote_path = self.layout.metadata_path(metadata);
        let request = TransportRequest { path: remote_path };
        let fetch_result = self.transporter.get(repository, &request).await;

        match fetch_result {
            Ok(response) => {
                let content = String::from_utf8_lossy(&response.data).into_owned();
                depot_util::fs::write_atomic_checked(&local_path, &response.data)?;
                TrackingStore::record(&dir, &filename, repository_key)?;
                UpdateStatusStore::record(&dir, &filename, repository_key, now_ms, None)?;
                Ok(content)
            }
            Err(e) => {
                UpdateStatusStore::record(&dir, &filename, repository_key, now_ms, Some(&e.to_string()))?;
                let is_not_found = e
                    .downcast_ref::<DepotError>()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false);
                if flags.delete_local_copy_if_missing && is_not_found && has_local_file {
                    debug!(%item_key, "deleteLocalCopyIfMissing set, removing stale local metadata");
                    let _ = std::fs::remove_file(&local_path);
                    return Err(e);
                }
                if has_local_file {
                    debug!(%item_key, "remote fetch failed, falling back to cached metadata");
                    std::fs::read_to_string(&local_path).map_err(|e| DepotError::Io(e).into())
                } else {
                    Err(e)
                }
            }
        }
    }
}

/// Per-request opt-ins for component J's two supplemented behaviors
/// (spec.md §4.J, §8 boundary).
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataRequestFlags {
    pub favor_local_repository: bool,
    pub delete_local_copy_if_missing: bool,
}

trait MetadataNatureExt {
    fn nature_is_snapshot(&self) -> bool;
}

impl MetadataNatureExt for Metadata {
    fn nature_is_snapshot(&self) -> bool {
        matches!(self.nature, depot_core::metadata::MetadataNature::Snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::metadata::MetadataNature;
    use depot_core::repository::RemoteRepository;
    use depot_local::manager::SimpleLocalRepositoryManager;

    struct StubTransporter {
        body: &'static str,
    }

    #[async_trait::async_trait]
    impl Transporter for StubTransporter {
        async fn get(
            &self,
            _repository: &RemoteRepository,
            _request: &TransportRequest,
        ) -> miette::Result<depot_transport::transporter::GetResponse> {
            Ok(depot_transport::transporter::GetResponse {
                data: self.body.as_bytes().to_vec(),
                content_length: Some(self.body.len() as u64),
            })
        }

        async fn get_resumable(
            &self,
            repository: &RemoteRepository,
            request: &TransportRequest,
            _range: depot_transport::transporter::RangeRequest,
        ) -> miette::Result<depot_transport::transporter::GetResponse> {
            self.get(repository, request).await
        }

        async fn peek(&self, _repository: &RemoteRepository, _request: &TransportRequest) -> miette::Result<bool> {
            Ok(true)
        }

        async fn put(
            &self,
            _repository: &RemoteRepository,
            _request: &TransportRequest,
            _data: &[u8],
        ) -> miette::Result<()> {
            Ok(())
        }
    }

    const SAMPLE: &str = r#"<metadata>
  <groupId>org.example</groupId>
  <artifactId>lib</artifactId>
  <versioning>
    <latest>1.2.0</latest>
    <release>1.2.0</release>
    <versions><version>1.0.0</version><version>1.2.0</version></versions>
    <lastUpdated>20240615143022</lastUpdated>
  </versioning>
</metadata>"#;

    #[tokio::test]
    async fn resolves_and_caches_versioning_index() {
        let tmp = tempfile::tempdir().unwrap();
        let local_repo = SimpleLocalRepositoryManager::new(tmp.path());
        let repository = RemoteRepository::new("central", "https://repo1.maven.org/maven2");
        let resolver = MetadataResolver::new(Arc::new(StubTransporter { body: SAMPLE }));
        let metadata = Metadata::group_artifact("org.example", "lib", MetadataNature::Release);
        let mut memo = UpdateCheckMemo::new();

        let index = resolver
            .resolve_versioning_index(&local_repo, &repository, "central", &mut memo, &metadata, false, 1000)
            .await
            .unwrap();

        assert_eq!(index.latest, Some("1.2.0".to_string()));
        assert_eq!(index.versions.len(), 2);

        let local_path = local_repo.path_for_remote_metadata(&metadata, "central");
        assert!(local_path.is_file());
    }

    #[tokio::test]
    async fn offline_without_cache_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let local_repo = SimpleLocalRepositoryManager::new(tmp.path());
        let repository = RemoteRepository::new("central", "https://repo1.maven.org/maven2");
        let resolver = MetadataResolver::new(Arc::new(StubTransporter { body: SAMPLE }));
        let metadata = Metadata::group_artifact("org.example", "lib", MetadataNature::Release);
        let mut memo = UpdateCheckMemo::new();

        let result = resolver
            .resolve_versioning_index(&local_repo, &repository, "central", &mut memo, &metadata, true, 1000)
            .await;
        assert!(result.is_err());
    }

    struct PanicTransporter;

    #[async_trait::async_trait]
    impl Transporter for PanicTransporter {
        async fn get(
            &self,
            _repository: &RemoteRepository,
            _request: &TransportRequest,
        ) -> miette::Result<depot_transport::transporter::GetResponse> {
            panic!("favorLocalRepository must not reach the network when a local copy exists");
        }

        async fn get_resumable(
            &self,
            repository: &RemoteRepository,
            request: &TransportRequest,
            _range: depot_transport::transporter::RangeRequest,
        ) -> miette::Result<depot_transport::transporter::GetResponse> {
            self.get(repository, request).await
        }

        async fn peek(&self, _repository: &RemoteRepository, _request: &TransportRequest) -> miette::Result<bool> {
            Ok(true)
        }

        async fn put(
            &self,
            _repository: &RemoteRepository,
            _request: &TransportRequest,
            _data: &[u8],
        ) -> miette::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn favor_local_repository_skips_remote_check_when_local_copy_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let local_repo = SimpleLocalRepositoryManager::new(tmp.path());
        let repository = RemoteRepository::new("central", "https://repo1.maven.org/maven2");
        let metadata = Metadata::group_artifact("org.example", "lib", MetadataNature::Release);
        let local_path = local_repo.path_for_remote_metadata(&metadata, "central");
        std::fs::create_dir_all(local_path.parent().unwrap()).unwrap();
        std::fs::write(&local_path, SAMPLE).unwrap();

        let resolver = MetadataResolver::new(Arc::new(PanicTransporter));
        let mut memo = UpdateCheckMemo::new();

        let index = resolver
            .resolve_versioning_index_with_flags(
                &local_repo,
                &repository,
                "central",
                &mut memo,
                &metadata,
                false,
                1000,
                MetadataRequestFlags {
                    favor_local_repository: true,
                    delete_local_copy_if_missing: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(index.latest, Some("1.2.0".to_string()));
    }

    struct NotFoundTransporter;

    #[async_trait::async_trait]
    impl Transporter for NotFoundTransporter {
        async fn get(
            &self,
            _repository: &RemoteRepository,
            _request: &TransportRequest,
        ) -> miette::Result<depot_transport::transporter::GetResponse> {
            Err(DepotError::NotFound {
                message: "gone from remote".to_string(),
            }
            .into())
        }

        async fn get_resumable(
            &self,
            repository: &RemoteRepository,
            request: &TransportRequest,
            _range: depot_transport::transporter::RangeRequest,
        ) -> miette::Result<depot_transport::transporter::GetResponse> {
            self.get(repository, request).await
        }

        async fn peek(&self, _repository: &RemoteRepository, _request: &TransportRequest) -> miette::Result<bool> {
            Ok(false)
        }

        async fn put(
            &self,
            _repository: &RemoteRepository,
            _request: &TransportRequest,
            _data: &[u8],
        ) -> miette::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn delete_local_copy_if_missing_removes_local_file_on_remote_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let local_repo = SimpleLocalRepositoryManager::new(tmp.path());
        let repository = RemoteRepository::new("central", "https://repo1.maven.org/maven2").with_releases_policy(
            depot_core::repository::RepositoryPolicy::new(
                true,
                depot_core::update_check::UpdatePolicy::Always,
                depot_core::repository::ChecksumPolicyKind::Warn,
            ),
        );
        let metadata = Metadata::group_artifact("org.example", "lib", MetadataNature::Release);
        let local_path = local_repo.path_for_remote_metadata(&metadata, "central");
        std::fs::create_dir_all(local_path.parent().unwrap()).unwrap();
        std::fs::write(&local_path, SAMPLE).unwrap();

        let resolver = MetadataResolver::new(Arc::new(NotFoundTransporter));
        let mut memo = UpdateCheckMemo::new();

        let result = resolver
            .resolve_versioning_index_with_flags(
                &local_repo,
                &repository,
                "central",
                &mut memo,
                &metadata,
                false,
                1000,
                MetadataRequestFlags {
                    favor_local_repository: false,
                    delete_local_copy_if_missing: true,
                },
            )
            .await;

        assert!(result.is_err());
        assert!(!local_path.exists());
    }
}
