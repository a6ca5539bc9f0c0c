//! A Maven-compatible repository artifact resolver: version schemes,
//! repository layouts, transport, checksum policy, local caching,
//! metadata and artifact resolution, dependency graph collection and
//! conflict resolution, and the install/deploy pipeline, wired behind
//! one [`system::RepositorySystem`] entry point.
//!
//! Building the effective descriptor model (parsing project files,
//! resolving parent/import chains, interpolating properties) is left to
//! the embedding caller via [`depot_core::descriptor::ArtifactDescriptorReader`];
//! this crate resolves coordinates and manages the graph and cache
//! around that result, it does not parse project files itself.

pub mod system;

pub use depot_core::artifact::Artifact;
pub use depot_core::config::Config;
pub use depot_core::dependency::{Dependency, Exclusion, Scope};
pub use depot_core::repository::RemoteRepository;
pub use depot_core::session::Session;
pub use depot_core::version::{MavenVersion, VersionConstraint, VersionRange};
pub use depot_graph::conflict::ConflictStrategy;
pub use system::RepositorySystem;
