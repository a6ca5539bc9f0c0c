//! Deployer (component O, spec.md §4.O): uploads a batch of artifacts
//! and metadata to one remote repository, merging metadata against
//! whatever is already published there.

use std::path::PathBuf;
use std::sync::Arc;

use depot_core::artifact::Artifact;
use depot_core::metadata::Metadata;
use depot_core::repository::RemoteRepository;
use depot_resolve::metadata_xml::{parse_versioning_index, render_versioning_index};
use depot_transport::connector::{RepositoryConnector, UploadTask};
use depot_transport::layout::Maven2Layout;
use depot_transport::transporter::{TransportRequest, Transporter};
use depot_util::errors::DepotError;
use tracing::{info, warn};

use crate::install::MergeableMetadata;
use crate::sync::SyncContextFactory;

#[derive(Debug, Clone)]
pub enum DeployEvent {
    ArtifactDeploying(String),
    ArtifactDeployed(String),
    MetadataDeploying(String),
    MetadataDeployed(String),
}

pub struct ArtifactUpload {
    pub artifact: Artifact,
    pub data: Vec<u8>,
}

pub struct MetadataUpload {
    pub mergeable: Box<dyn MergeableMetadata>,
}

#[derive(Default)]
pub struct DeployRequest {
    pub artifacts: Vec<ArtifactUpload>,
    pub metadata: Vec<MetadataUpload>,
}

#[derive(Debug, Clone, Default)]
pub struct DeployOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

pub struct Deployer {
    connector: RepositoryConnector,
    layout: Maven2Layout,
    sync_factory: Arc<dyn SyncContextFactory>,
}

impl Deployer {
    pub fn new(connector: RepositoryConnector, sync_factory: Arc<dyn SyncContextFactory>) -> Self {
        Self {
            connector,
            layout: Maven2Layout,
            sync_factory,
        }
    }

    /// Run the full deploy pipeline (spec.md §4.O steps 1-4): lock,
    /// resolve existing remote metadata to merge against, merge, upload
    /// everything in one batch, and report a `DeploymentError` if
    /// anything failed — after every item has already emitted its
    /// terminal event.
    pub async fn deploy(
        &self,
        repository: &RemoteRepository,
        transporter: Arc<dyn Transporter>,
        session_id: &str,
        request: DeployRequest,
        mut on_event: impl FnMut(DeployEvent),
    ) -> miette::Result<DeployOutcome> {
        let mut lock_paths: Vec<PathBuf> = Vec::new();
        for upload in &request.artifacts {
            lock_paths.push(PathBuf::from(
                self.layout
                    .artifact_path_with_resolved_version(&upload.artifact, &upload.artifact.version),
            ));
        }
        for item in &request.metadata {
            lock_paths.push(PathBuf::from(self.layout.metadata_path(item.mergeable.metadata())));
        }

        let mut sync = self.sync_factory.new_context(session_id, true);
        sync.acquire(&lock_paths);

        let mut tasks = Vec::new();
        let mut labels = Vec::new();

        for upload in &request.artifacts {
            let remote_path = self
                .layout
                .artifact_path_with_resolved_version(&upload.artifact, &upload.artifact.version);
            on_event(DeployEvent::ArtifactDeploying(remote_path.clone()));
            labels.push((remote_path.clone(), true));
            tasks.push(UploadTask {
                remote_path,
                data: upload.data.clone(),
            });
        }

        for item in &request.metadata {
            let metadata = item.mergeable.metadata();
            let remote_path = self.layout.metadata_path(metadata);
            on_event(DeployEvent::MetadataDeploying(remote_path.clone()));

            let current = self.fetch_current_index(repository, transporter.as_ref(), &remote_path).await;
            let merged = item.mergeable.merge(current);
            let group_id = metadata.group_id.clone().unwrap_or_default();
            let artifact_id = metadata.artifact_id.clone().unwrap_or_default();
            let rendered = render_versioning_index(&group_id, &artifact_id, &merged);

            labels.push((remote_path.clone(), false));
            tasks.push(UploadTask {
                remote_path,
                data: rendered.into_bytes(),
            });
        }

        let outcomes = self.connector.put_batch(Arc::new(repository.clone()), tasks).await;
        sync.release();

        let mut result = DeployOutcome::default();
        for outcome in &outcomes {
            let is_artifact = labels
                .iter()
                .find(|(path, _)| path == &outcome.remote_path)
                .map(|(_, is_artifact)| *is_artifact)
                .unwrap_or(true);
            match &outcome.result {
                Ok(()) => {
                    result.succeeded.push(outcome.remote_path.clone());
                    if is_artifact {
                        on_event(DeployEvent::ArtifactDeployed(outcome.remote_path.clone()));
                    } else {
                        on_event(DeployEvent::MetadataDeployed(outcome.remote_path.clone()));
                    }
                    info!(path = %outcome.remote_path, "deployed");
                }
                Err(message) => {
                    result.failed.push((outcome.remote_path.clone(), message.clone()));
                    if is_artifact {
                        on_event(DeployEvent::ArtifactDeployed(outcome.remote_path.clone()));
                    } else {
                        on_event(DeployEvent::MetadataDeployed(outcome.remote_path.clone()));
                    }
                    warn!(path = %outcome.remote_path, error = %message, "deploy failed");
                }
            }
        }

        if let Some((path, message)) = result.failed.first() {
            return Err(DepotError::Generic {
                message: format!("deployment failed: {} of {} item(s) failed, first: {path}: {message}", result.failed.len(), outcomes.len()),
            }
            .into());
        }

        Ok(result)
    }

    async fn fetch_current_index(
        &self,
        repository: &RemoteRepository,
        transporter: &dyn Transporter,
        remote_path: &str,
    ) -> Option<depot_core::metadata::VersioningIndex> {
        let request = TransportRequest {
            path: remote_path.to_string(),
        };
        let response = transporter.get(repository, &request).await.ok()?;
        parse_versioning_index(&String::from_utf8_lossy(&response.data)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::AddVersionMetadata;
    use crate::sync::InMemorySyncContextFactory;
    use depot_core::metadata::MetadataNature;
    use depot_transport::transporter::{GetResponse, RangeRequest};

    struct StubTransporter {
        existing_metadata: Option<&'static str>,
        fail_path: Option<&'static str>,
    }

    #[async_trait::async_trait]
    impl Transporter for StubTransporter {
        async fn get(&self, _repository: &RemoteRepository, request: &TransportRequest) -> miette::Result<GetResponse> {
            if let Some(content) = self.existing_metadata {
                if request.path.ends_with("maven-metadata.xml") {
                    return Ok(GetResponse {
                        data: content.as_bytes().to_vec(),
                        content_length: Some(content.len() as u64),
                    });
                }
            }
            Err(DepotError::NotFound {
                message: "no metadata yet".to_string(),
            }
            .into())
        }

        async fn get_resumable(
            &self,
            repository: &RemoteRepository,
            request: &TransportRequest,
            _range: RangeRequest,
        ) -> miette::Result<GetResponse> {
            self.get(repository, request).await
        }

        async fn peek(&self, _repository: &RemoteRepository, _request: &TransportRequest) -> miette::Result<bool> {
            Ok(true)
        }

        async fn put(&self, _repository: &RemoteRepository, request: &TransportRequest, _data: &[u8]) -> miette::Result<()> {
            if Some(request.path.as_str()) == self.fail_path {
                return Err(DepotError::Transfer {
                    message: "simulated upload failure".to_string(),
                }
                .into());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn deploys_artifact_and_merges_metadata() {
        let transporter: Arc<dyn Transporter> = Arc::new(StubTransporter {
            existing_metadata: None,
            fail_path: None,
        });
        let connector = RepositoryConnector::new(Arc::clone(&transporter), 4);
        let sync_factory = Arc::new(InMemorySyncContextFactory::new());
        let deployer = Deployer::new(connector, sync_factory);
        let repository = RemoteRepository::new("central", "https://repo.example.org/maven2");

        let request = DeployRequest {
            artifacts: vec![ArtifactUpload {
                artifact: Artifact::new("org.example", "lib", "1.0"),
                data: b"jar-bytes".to_vec(),
            }],
            metadata: vec![MetadataUpload {
                mergeable: Box::new(AddVersionMetadata {
                    metadata: Metadata::group_artifact("org.example", "lib", MetadataNature::Release),
                    version: "1.0".to_string(),
                }),
            }],
        };

        let mut events = Vec::new();
        let outcome = deployer
            .deploy(&repository, transporter, "session-1", request, |e| events.push(e))
            .await
            .unwrap();

        assert_eq!(outcome.succeeded.len(), 2);
        assert!(outcome.failed.is_empty());
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn first_failure_surfaces_as_error_but_all_items_still_report() {
        let transporter: Arc<dyn Transporter> = Arc::new(StubTransporter {
            existing_metadata: None,
            fail_path: Some("org/example/lib/1.0/lib-1.0.jar"),
        });
        let connector = RepositoryConnector::new(Arc::clone(&transporter), 4);
        let sync_factory = Arc::new(InMemorySyncContextFactory::new());
        let deployer = Deployer::new(connector, sync_factory);
        let repository = RemoteRepository::new("central", "https://repo.example.org/maven2");

        let request = DeployRequest {
            artifacts: vec![ArtifactUpload {
                artifact: Artifact::new("org.example", "lib", "1.0"),
                data: b"jar-bytes".to_vec(),
            }],
            metadata: vec![],
        };

        let mut events = Vec::new();
        let result = deployer
            .deploy(&repository, transporter, "session-1", request, |e| events.push(e))
            .await;

        assert!(result.is_err());
        assert_eq!(events.len(), 2);
    }
}
