//! Artifact descriptor contracts (spec.md §3 DATA MODEL
//! `ArtifactDescriptorResult`, §6 "External interfaces"). Computing the
//! effective model (parsing POMs, resolving parent chains, interpolating
//! properties) is explicitly out of scope (spec.md §1 Non-goals); these
//! types describe the *outcome* of that computation so the collector
//! (component M) can consume it without caring how it was produced.

use crate::artifact::Artifact;
use crate::dependency::Dependency;
use crate::repository::RemoteRepository;

/// The result of resolving one artifact's descriptor: its direct
/// dependencies, managed dependencies, any repositories it contributes,
/// and the relocation chain it was reached through.
#[derive(Debug, Clone, Default)]
pub struct ArtifactDescriptorResult {
    pub artifact: Option<Artifact>,
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    pub repositories: Vec<RemoteRepository>,
    /// Oldest-first chain of relocations followed to reach `artifact`
    /// (spec.md §4.M step 1).
    pub relocations: Vec<Artifact>,
    pub errors: Vec<String>,
}

/// A request to resolve one artifact's descriptor (spec.md §4.M step 1-2
/// collaborator boundary).
#[derive(Debug, Clone)]
pub struct ArtifactDescriptorRequest {
    pub artifact: Artifact,
    pub repositories: Vec<RemoteRepository>,
}

/// The collaborator that turns an artifact coordinate into its
/// descriptor. Implementations own model parsing, parent/import
/// resolution, and property interpolation; the collector only needs the
/// resulting dependency and repository lists (spec.md §1 Non-goals, §6).
pub trait ArtifactDescriptorReader: Send + Sync {
    fn read_descriptor(
        &self,
        request: &ArtifactDescriptorRequest,
    ) -> Result<ArtifactDescriptorResult, DescriptorError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DescriptorError {
    #[error("no descriptor found for {0}")]
    NotFound(String),
    #[error("failed to read descriptor for {0}: {1}")]
    ReadFailed(String, String),
}

/// A workspace-local override: lets an embedding build tool substitute
/// in-memory artifacts for ones that would otherwise be resolved from a
/// repository (spec.md §6 "WorkspaceReader").
pub trait WorkspaceReader: Send + Sync {
    /// A stable identifier for this workspace, used in descriptor caches.
    fn workspace_id(&self) -> &str;

    /// If this workspace has a local file for `artifact`'s coordinates
    /// (ignoring the requested version), return its path.
    fn find_artifact(&self, artifact: &Artifact) -> Option<std::path::PathBuf>;

    /// All versions of `group:artifact` known to this workspace, used by
    /// the range/metadata resolvers to fold in workspace-local versions
    /// alongside repository ones.
    fn find_versions(&self, group_id: &str, artifact_id: &str) -> Vec<String>;
}
