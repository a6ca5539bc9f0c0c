//! `DependencyNode`: the mutable per-edge payload attached to each node of
//! the dirty dependency graph (spec.md §3 DATA MODEL, §9 "Graph
//! representation").
//!
//! The graph's topology (indices, edges, cycle back-references) lives in
//! `depot-graph` as an arena of `petgraph` indices; this type is the value
//! each index carries. Nodes may appear multiple times in the dirty graph
//! — identity is per-edge, not per-coordinate — so this type derives no
//! notion of equality beyond what the caller needs for testing.

use crate::artifact::Artifact;
use crate::dependency::Dependency;
use crate::repository::RemoteRepository;

/// Which fields of this node's [`Dependency`] were overwritten by
/// `DependencyManagement` (spec.md §4.M step 4.b). Recorded only when
/// verbose management mode is enabled, so a report can show "version
/// 2.0 -> 1.5 (managed)" style annotations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagedBits {
    pub version: bool,
    pub scope: bool,
    pub optional: bool,
    pub exclusions: bool,
}

impl ManagedBits {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn any(&self) -> bool {
        self.version || self.scope || self.optional || self.exclusions
    }
}

/// The pre-management value of a field, recorded only in verbose mode.
#[derive(Debug, Clone, Default)]
pub struct PremanagedState {
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<bool>,
}

/// A dependency-graph node: one edge's worth of state during collection.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    pub dependency: Option<Dependency>,
    pub managed_bits: ManagedBits,
    pub premanaged: PremanagedState,
    /// Other artifact identities this node is also known by (rare; set by
    /// relocation chains that preserve an alias for diagnostics).
    pub aliases: Vec<Artifact>,
    /// The effective repository list for descriptor/version lookups
    /// rooted at this node (spec.md §4.M step 2).
    pub repositories: Vec<RemoteRepository>,
    /// Relocation chain followed to reach this node's artifact, oldest
    /// first (spec.md §4.M step 1).
    pub relocations: Vec<Artifact>,
    /// The concrete version this node resolved to (after range/constraint
    /// expansion, spec.md §4.L).
    pub version: Option<String>,
    /// The raw version constraint this node was requested at, before
    /// expansion.
    pub version_constraint: Option<String>,
    /// When `version_constraint` was a range, the repository whose
    /// metadata first (in declaration order) listed the resolved version
    /// (spec.md §4.L step 4). `None` for literal versions.
    pub authoritative_repository: Option<String>,
    /// Set once conflict resolution (component N) decides this node lost;
    /// loser subtrees are retained as leaves in verbose mode but are not
    /// traversable for file resolution (spec.md §3 invariant).
    pub conflict_loser_of: Option<String>,
}

impl DependencyNode {
    pub fn root() -> Self {
        Self {
            dependency: None,
            managed_bits: ManagedBits::empty(),
            premanaged: PremanagedState::default(),
            aliases: Vec::new(),
            repositories: Vec::new(),
            relocations: Vec::new(),
            version: None,
            version_constraint: None,
            authoritative_repository: None,
            conflict_loser_of: None,
        }
    }

    pub fn for_dependency(dependency: Dependency, repositories: Vec<RemoteRepository>) -> Self {
        let version = dependency.artifact.version.clone();
        Self {
            dependency: Some(dependency),
            managed_bits: ManagedBits::empty(),
            premanaged: PremanagedState::default(),
            aliases: Vec::new(),
            repositories,
            relocations: Vec::new(),
            version: Some(version.clone()),
            version_constraint: Some(version),
            authoritative_repository: None,
            conflict_loser_of: None,
        }
    }

    pub fn is_conflict_loser(&self) -> bool {
        self.conflict_loser_of.is_some()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.dependency.as_ref().map(|d| &d.artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::Scope;

    #[test]
    fn root_has_no_dependency() {
        let root = DependencyNode::root();
        assert!(root.dependency.is_none());
        assert!(!root.is_conflict_loser());
    }

    #[test]
    fn managed_bits_track_overrides() {
        let mut node =
            DependencyNode::for_dependency(Dependency::new(Artifact::new("g", "a", "1.0"), Scope::Compile), vec![]);
        node.managed_bits.version = true;
        node.premanaged.version = Some("0.9".to_string());
        assert!(node.managed_bits.version);
        assert!(!node.managed_bits.scope);
    }
}
