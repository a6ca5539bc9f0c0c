//! `ArtifactResolver` (component K, spec.md §4.K): resolves one artifact
//! coordinate to a local file, trying a workspace override first, then
//! the local cache, then each candidate repository in turn — caching
//! not-found and transfer-error outcomes so a repeated lookup within the
//! same session replays the failure instead of re-asking the network
//! (spec.md §3 invariant, §7, §8 scenario 4).

use std::path::PathBuf;
use std::sync::Arc;

use depot_core::artifact::Artifact;
use depot_core::descriptor::WorkspaceReader;
use depot_core::metadata::{Metadata, MetadataNature};
use depot_core::repository::RemoteRepository;
use depot_core::update_check::{self, UpdateCheckMemo};
use depot_local::manager::LocalRepositoryManager;
use depot_local::tracking::UpdateStatusStore;
use depot_transport::connector::{DownloadTask, RepositoryConnector};
use depot_transport::layout::Maven2Layout;
use depot_transport::transporter::{TransportRequest, Transporter};
use depot_util::errors::DepotError;
use depot_util::hash::Algorithm;
use tracing::debug;

use crate::metadata_resolver::MetadataResolver;
use crate::version_resolver;

pub struct ArtifactResolutionResult {
    pub artifact: Artifact,
    pub repository_id: Option<String>,
}

pub struct ArtifactResolver {
    transporter: Arc<dyn Transporter>,
    connector: RepositoryConnector,
    metadata_resolver: MetadataResolver,
    layout: Maven2Layout,
}

impl ArtifactResolver {
    pub fn new(transporter: Arc<dyn Transporter>) -> Self {
        Self {
            connector: RepositoryConnector::new(Arc::clone(&transporter), 4),
            metadata_resolver: MetadataResolver::new(Arc::clone(&transporter)),
            transporter,
            layout: Maven2Layout,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn resolve(
        &self,
        workspace: Option<&dyn WorkspaceReader>,
        local_repo: &dyn LocalRepositoryManager,
        repositories: &[(RemoteRepository, String)],
        memo: &mut UpdateCheckMemo,
        artifact: &Artifact,
        offline: bool,
        now_ms: u64,
    ) -> miette::Result<ArtifactResolutionResult> {
        if let Some(workspace) = workspace {
            if let Some(file) = workspace.find_artifact(artifact) {
                debug!(%artifact, "resolved from workspace override");
                return Ok(ArtifactResolutionResult {
                    artifact: artifact.clone().with_file(file),
                    repository_id: None,
                });
            }
        }

        let item_key = format!("{}:{}", artifact.conflict_id(), artifact.version);
        let mut last_error = None;

        for (repository, repository_key) in repositories {
            match self
                .resolve_from_repository(local_repo, repository, repository_key, memo, artifact, offline, now_ms, &item_key)
                .await
            {
                Ok(path) => {
                    return Ok(ArtifactResolutionResult {
                        artifact: artifact.clone().with_file(path),
                        repository_id: Some(repository.id.clone()),
                    })
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DepotError::NotFound {
                message: format!("{item_key} not found in any configured repository"),
            }
            .into()
        }))
    }

    #[allow(clippy::too_many_arguments)]
    async fn resolve_from_repository(
        &self,
        local_repo: &dyn LocalRepositoryManager,
        repository: &RemoteRepository,
        repository_key: &str,
        memo: &mut UpdateCheckMemo,
        artifact: &Artifact,
        offline: bool,
        now_ms: u64,
        item_key: &str,
    ) -> miette::Result<PathBuf> {
        let found = local_repo.find_artifact(artifact, repository_key)?;
        let local_path = local_repo.path_for_remote_artifact(artifact, repository_key);
        let dir = local_path.parent().unwrap_or(&local_path).to_path_buf();
        let filename = local_path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        let last_update = UpdateStatusStore::last_updated(&dir, &filename, repository_key)?;
        let policy = &repository.policy_for(artifact.is_snapshot()).update_policy;

        let has_local_file = found.file.is_some();
        // A prior check that recorded a failure (not-found or transfer
        // error) still counts as "already checked" for update-policy
        // purposes, even though it left no file behind — otherwise a
        // missing file would force `required = true` forever and the
        // cached exception below could never be reached (spec.md §4.G,
        // §4.K step 4).
        let already_checked = has_local_file || last_update.is_some();
        let required = if offline {
            false
        } else {
            update_check::check_required(
                memo,
                item_key,
                repository_key,
                already_checked,
                true,
                last_update,
                policy,
                now_ms,
            )
        };

        if !required {
            if let Some(file) = found.file {
                return Ok(file);
            }
            // No local copy, and a recheck isn't due yet: replay the
            // cached outcome of the last check instead of asking the
            // network again (spec.md §4.K step 4, §7, §8 scenario 4).
            if let Some(error) = UpdateStatusStore::last_error(&dir, &filename, repository_key)? {
                return Err(if error.to_lowercase().contains("not found") {
                    DepotError::cached_not_found(&error).into()
                } else {
                    DepotError::cached_transfer(&error).into()
                });
            }
        }

        if offline {
            return found.file.ok_or_else(|| {
                DepotError::Offline {
                    message: format!("{item_key} not cached and session is offline"),
                }
                .into()
            });
        }

        // Snapshot artifacts are requested by their literal `-SNAPSHOT`
        // version but published under a timestamped filename; substitute
        // the canonical one before building the download path (spec.md
        // §4.L step 5) whenever the GAV-level metadata has one.
        let filename_version = if artifact.is_snapshot() {
            let gav_metadata =
                Metadata::group_artifact_version(&artifact.group_id, &artifact.artifact_id, &artifact.version, MetadataNature::Snapshot);
            let snapshot_versioning = self
                .metadata_resolver
                .resolve_snapshot_versioning(local_repo, repository, repository_key, memo, &gav_metadata, offline, now_ms)
                .await
                .ok();
            version_resolver::resolve_snapshot_filename_version(&artifact.version, snapshot_versioning.as_ref())
        } else {
            artifact.version.clone()
        };

        let remote_path = self.layout.artifact_path_with_resolved_version(artifact, &filename_version);
        let checksum_request = TransportRequest {
            path: self.layout.checksum_path(&remote_path, "sha256"),
        };
        let sidecar = self.transporter.get(repository, &checksum_request).await.ok();
        let provided_checksums: Vec<(Algorithm, String)> = sidecar
            .map(|r| {
                vec![(
                    Algorithm::Sha256,
                    depot_util::hash::extract_hash(&String::from_utf8_lossy(&r.data)),
                )]
            })
            .unwrap_or_default();

        let task = DownloadTask {
            remote_path,
            destination: local_path.clone(),
            provided_checksums,
            checksum_policy: repository.policy_for(artifact.is_snapshot()).checksum_policy,
        };

        // Route the fetch through the repository's connector (spec.md
        // §4.K step 4: "enqueue an ArtifactDownload against the
        // repository's RepositoryConnector") so batching/retry/resume
        // cover this path rather than a bespoke GET here.
        let outcome = self
            .connector
            .get_batch(Arc::new(repository.clone()), vec![task])
            .await
            .into_iter()
            .next()
            .expect("get_batch returns one outcome per task submitted");

        match outcome.result {
            Ok(()) => {
                depot_local::tracking::TrackingStore::record(&dir, &filename, repository_key)?;
                UpdateStatusStore::record(&dir, &filename, repository_key, now_ms, None)?;
                Ok(local_path)
            }
            Err(message) => {
                UpdateStatusStore::record(&dir, &filename, repository_key, now_ms, Some(&message))?;
                Err(if message.to_lowercase().contains("not found") {
                    DepotError::NotFound { message }.into()
                } else {
                    DepotError::Transfer { message }.into()
                })
            }
        }
    }
}
