//! `RepositorySystem`: the single entry point that wires a session
//! together with its transporter, local repository, and resolvers —
//! the facade every embedding caller is expected to use rather than
//! reaching into individual crates directly.

use std::sync::Arc;

use depot_core::artifact::Artifact;
use depot_core::dependency::Dependency;
use depot_core::descriptor::{ArtifactDescriptorReader, WorkspaceReader};
use depot_core::metadata::{Metadata, MetadataNature};
use depot_core::repository::RemoteRepository;
use depot_core::session::Session;
use depot_core::update_check::now_ms;
use depot_core::version::VersionConstraint;
use depot_deploy::deploy::{DeployEvent, DeployOutcome, DeployRequest, Deployer};
use depot_deploy::install::{InstallEvent, Installer, MergeableMetadata};
use depot_deploy::sync::SyncContextFactory;
use depot_graph::collector::{CollectionErrors, DependencyCollector, ManagementEntry, ResolvedVersion, VersionConstraintResolver};
use depot_graph::conflict::{ConflictResolution, ConflictResolver, ConflictStrategy};
use depot_graph::graph::DirtyGraph;
use depot_local::manager::LocalRepositoryManager;
use depot_resolve::artifact_resolver::{ArtifactResolutionResult, ArtifactResolver};
use depot_resolve::metadata_resolver::MetadataResolver;
use depot_resolve::version_resolver::{self, VersionResolutionResult};
use depot_transport::connector::RepositoryConnector;
use depot_transport::transporter::Transporter;

/// Everything a single embedding caller needs, bundled behind one type:
/// a session's caches and config, a transporter to speak to remotes
/// through, a local repository to cache into, and a sync-context
/// factory to serialize installs/deploys.
pub struct RepositorySystem {
    session: Session,
    transporter: Arc<dyn Transporter>,
    local_repo: Arc<dyn LocalRepositoryManager>,
    sync_factory: Arc<dyn SyncContextFactory>,
    artifact_resolver: ArtifactResolver,
    metadata_resolver: MetadataResolver,
}

impl RepositorySystem {
    pub fn new(
        session: Session,
        transporter: Arc<dyn Transporter>,
        local_repo: Arc<dyn LocalRepositoryManager>,
        sync_factory: Arc<dyn SyncContextFactory>,
    ) -> Self {
        Self {
            artifact_resolver: ArtifactResolver::new(Arc::clone(&transporter)),
            metadata_resolver: MetadataResolver::new(Arc::clone(&transporter)),
            session,
            transporter,
            local_repo,
            sync_factory,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Resolve one artifact coordinate to a local file (component K),
    /// trying a workspace override first, then each repository in turn.
    pub async fn resolve_artifact(
        &self,
        workspace: Option<&dyn WorkspaceReader>,
        repositories: &[RemoteRepository],
        artifact: &Artifact,
    ) -> miette::Result<ArtifactResolutionResult> {
        let keyed: Vec<(RemoteRepository, String)> = repositories
            .iter()
            .map(|r| (r.clone(), self.session.repository_key_fn.key(r)))
            .collect();
        let mut memo = self.session.update_check_memo.lock().expect("update check memo poisoned");
        self.artifact_resolver
            .resolve(
                workspace,
                self.local_repo.as_ref(),
                &keyed,
                &mut memo,
                artifact,
                self.session.config.offline,
                now_ms(),
            )
            .await
    }

    /// Resolve a version constraint against one repository's metadata
    /// plus any versions a workspace already knows about (components J
    /// and L together).
    pub async fn resolve_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        constraint: &VersionConstraint,
        repository: &RemoteRepository,
        workspace_versions: &[String],
    ) -> miette::Result<VersionResolutionResult> {
        let repository_key = self.session.repository_key_fn.key(repository);
        let metadata = Metadata::group_artifact(group_id, artifact_id, MetadataNature::ReleaseOrSnapshot);
        let index = {
            let mut memo = self.session.update_check_memo.lock().expect("update check memo poisoned");
            self.metadata_resolver
                .resolve_versioning_index(
                    self.local_repo.as_ref(),
                    repository,
                    &repository_key,
                    &mut memo,
                    &metadata,
                    self.session.config.offline,
                    now_ms(),
                )
                .await?
        };
        version_resolver::resolve_version_constraint(constraint, &index.versions, workspace_versions)
    }

    /// Build the dirty dependency graph rooted at `root_dependencies`
    /// (component M), resolving any range-constrained dependency's
    /// version via components J and L along the way (spec.md §4.M step
    /// 4c-d).
    pub async fn collect_dependencies(
        &self,
        reader: &dyn ArtifactDescriptorReader,
        root_dependencies: Vec<Dependency>,
        root_managed: Vec<ManagementEntry>,
        root_repositories: Vec<RemoteRepository>,
    ) -> miette::Result<(DirtyGraph, CollectionErrors)> {
        let resolver = CollectorVersionResolver { system: self };
        DependencyCollector::new(reader)
            .with_version_resolver(&resolver)
            .collect(root_dependencies, root_managed, root_repositories)
            .await
    }

    /// Resolve version conflicts in a previously-collected graph
    /// (component N), mutating it in place.
    pub fn resolve_conflicts(&self, graph: &mut DirtyGraph, strategy: ConflictStrategy, verbose: bool) -> ConflictResolution {
        ConflictResolver::new(strategy).verbose(verbose).resolve(graph)
    }

    /// Install an artifact (and any metadata to merge) into the local
    /// repository (component O).
    pub fn install(
        &self,
        artifact: &Artifact,
        metadata: &[Box<dyn MergeableMetadata>],
        on_event: impl FnMut(InstallEvent),
    ) -> miette::Result<Artifact> {
        Installer.install(self.local_repo.as_ref(), artifact, metadata, on_event)
    }

    /// Deploy a batch of artifacts and metadata to a remote (components
    /// O and P together: the deployer acquires its own sync context).
    pub async fn deploy(
        &self,
        repository: &RemoteRepository,
        session_id: &str,
        request: DeployRequest,
        on_event: impl FnMut(DeployEvent),
    ) -> miette::Result<DeployOutcome> {
        let connector = RepositoryConnector::new(Arc::clone(&self.transporter), self.session.config.max_concurrent_downloads);
        let deployer = Deployer::new(connector, Arc::clone(&self.sync_factory));
        deployer
            .deploy(repository, Arc::clone(&self.transporter), session_id, request, on_event)
            .await
    }
}

/// Adapts a [`RepositorySystem`]'s metadata resolver into the collector's
/// component-L collaborator: unions `maven-metadata.xml` across
/// `repositories` in declaration order, tracking which repository first
/// listed each version, then hands the union to
/// [`version_resolver::resolve_version_constraint`] (spec.md §4.L steps
/// 3-4).
struct CollectorVersionResolver<'a> {
    system: &'a RepositorySystem,
}

#[async_trait::async_trait]
impl<'a> VersionConstraintResolver for CollectorVersionResolver<'a> {
    async fn resolve_constraint(&self, artifact: &Artifact, repositories: &[RemoteRepository]) -> miette::Result<ResolvedVersion> {
        let constraint = VersionConstraint::parse(&artifact.version);
        let metadata = Metadata::group_artifact(&artifact.group_id, &artifact.artifact_id, MetadataNature::ReleaseOrSnapshot);

        let mut union_versions = Vec::new();
        let mut authoritative: std::collections::HashMap<String, String> = std::collections::HashMap::new();
        for repository in repositories {
            let repository_key = self.system.session.repository_key_fn.key(repository);
            let index = {
                let mut memo = self.system.session.update_check_memo.lock().expect("update check memo poisoned");
                self.system
                    .metadata_resolver
                    .resolve_versioning_index(
                        self.system.local_repo.as_ref(),
                        repository,
                        &repository_key,
                        &mut memo,
                        &metadata,
                        self.system.session.config.offline,
                        now_ms(),
                    )
                    .await
            };
            let Ok(index) = index else { continue };
            for version in index.versions {
                authoritative.entry(version.clone()).or_insert_with(|| repository_key.clone());
                union_versions.push(version);
            }
        }

        let resolved = version_resolver::resolve_version_constraint(&constraint, &union_versions, &[])?;
        let authoritative_repository = authoritative.get(&resolved.version).cloned();
        Ok(ResolvedVersion {
            version: resolved.version,
            was_range: resolved.was_range,
            authoritative_repository,
        })
    }
}
