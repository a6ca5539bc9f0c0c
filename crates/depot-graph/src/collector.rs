//! `DependencyCollector` (component M, spec.md §4.M): walks descriptors
//! recursively to build the dirty graph, applying scope propagation,
//! dependency management, exclusions, optional-dependency handling,
//! relocation following, and cycle detection along the way.

use std::collections::{HashSet, VecDeque};

use depot_core::artifact::Artifact;
use depot_core::dependency::{Dependency, Exclusion, Scope};
use depot_core::descriptor::{ArtifactDescriptorReader, ArtifactDescriptorRequest};
use depot_core::node::DependencyNode;
use depot_core::repository::RemoteRepository;
use depot_core::version::VersionConstraint;
use tracing::{debug, warn};

use crate::graph::{DirtyGraph, NodeIndex};

/// One dependency's resolved version constraint: the concrete version
/// chosen and, when the constraint was a range, which repository's
/// metadata authoritatively listed it (spec.md §4.L, §4.M step 4c-d).
#[derive(Debug, Clone)]
pub struct ResolvedVersion {
    pub version: String,
    pub was_range: bool,
    pub authoritative_repository: Option<String>,
}

/// The collaborator that turns a dependency's version constraint into a
/// concrete version, fetching and unioning `maven-metadata.xml` across
/// `repositories` for ranges (component L). Injected into the collector
/// so range-constrained dependencies resolve to a real version instead
/// of being descended into literally (spec.md §4.M step 4c-d). Literal
/// constraints never reach this collaborator — the collector only calls
/// it when [`VersionConstraint::is_range`] is true.
#[async_trait::async_trait]
pub trait VersionConstraintResolver: Send + Sync {
    async fn resolve_constraint(&self, artifact: &Artifact, repositories: &[RemoteRepository]) -> miette::Result<ResolvedVersion>;
}

/// Scope propagation matrix (spec.md §4.M step 3): given the effective
/// scope a dependency was reached at (`parent`) and its own declared
/// scope (`child`), the scope it contributes at this position in the
/// graph, or `None` if it should not be added at all. `system` is never
/// propagated — it only has meaning at the declaring level.
pub fn propagate_scope(parent: Scope, child: Scope) -> Option<Scope> {
    use Scope::*;
    match (parent, child) {
        (_, System) => None,
        (Compile, Compile) => Some(Compile),
        (Compile, Runtime) => Some(Runtime),
        (Compile, Provided) => None,
        (Compile, Test) => None,
        (Provided, Compile) => Some(Provided),
        (Provided, Provided) => Some(Provided),
        (Provided, Runtime) => Some(Provided),
        (Provided, Test) => None,
        (Runtime, Compile) => Some(Runtime),
        (Runtime, Provided) => None,
        (Runtime, Runtime) => Some(Runtime),
        (Runtime, Test) => None,
        (Test, Compile) => Some(Test),
        (Test, Provided) => None,
        (Test, Runtime) => Some(Test),
        (Test, Test) => None,
        (System, _) => None,
    }
}

/// One dependency-management entry: an override applied when a
/// dependency at/below the declaring level matches its `group:artifact`
/// (and classifier/extension, spec.md §4.M step 4).
#[derive(Debug, Clone)]
pub struct ManagementEntry {
    pub group_id: String,
    pub artifact_id: String,
    pub classifier: String,
    pub extension: String,
    pub version: Option<String>,
    pub scope: Option<Scope>,
    pub optional: Option<bool>,
    pub exclusions: Vec<Exclusion>,
}

impl ManagementEntry {
    fn matches(&self, artifact: &Artifact) -> bool {
        self.group_id == artifact.group_id
            && self.artifact_id == artifact.artifact_id
            && self.classifier == artifact.classifier
            && self.extension == artifact.extension
    }
}

/// How many hops the collector will follow before assuming something is
/// pathologically deep (not a cycle, since those are caught separately,
/// but a safety bound against descriptor data that is simply enormous).
const MAX_DEPTH: usize = 64;

pub struct DependencyCollector<'a> {
    reader: &'a dyn ArtifactDescriptorReader,
    version_resolver: Option<&'a dyn VersionConstraintResolver>,
    verbose: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionErrors {
    pub messages: Vec<String>,
}

impl<'a> DependencyCollector<'a> {
    pub fn new(reader: &'a dyn ArtifactDescriptorReader) -> Self {
        Self {
            reader,
            version_resolver: None,
            verbose: false,
        }
    }

    /// Supply the component-L collaborator that resolves range
    /// constraints (spec.md §4.M step 4c-d). Without one, dependencies
    /// declared with a range descend using the literal constraint string
    /// as if it were a pinned version — fine for descriptor readers that
    /// never emit ranges, wrong otherwise.
    pub fn with_version_resolver(mut self, resolver: &'a dyn VersionConstraintResolver) -> Self {
        self.version_resolver = Some(resolver);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Collect the full dirty graph rooted at `root_dependencies`
    /// (spec.md §4.M).
    pub async fn collect(
        &self,
        root_dependencies: Vec<Dependency>,
        root_managed: Vec<ManagementEntry>,
        root_repositories: Vec<RemoteRepository>,
    ) -> miette::Result<(DirtyGraph, CollectionErrors)> {
        let mut graph = DirtyGraph::new();
        let root = graph.set_root(DependencyNode::root());
        let mut errors = CollectionErrors::default();

        let mut queue: VecDeque<(NodeIndex, Dependency, Vec<ManagementEntry>, Vec<RemoteRepository>, Vec<NodeIndex>)> =
            VecDeque::new();
        for dep in root_dependencies {
            queue.push_back((root, dep, root_managed.clone(), root_repositories.clone(), vec![root]));
        }

        while let Some((parent, mut dependency, management, repositories, ancestor_stack)) = queue.pop_front() {
            if ancestor_stack.len() > MAX_DEPTH {
                errors.messages.push(format!(
                    "{} exceeded maximum collection depth ({MAX_DEPTH}), stopping this branch",
                    dependency.artifact
                ));
                continue;
            }

            // The matrix governs scope *inheritance* along a transitive
            // edge; a root-level dependency always keeps its own
            // declared scope (spec.md §4.M step 3).
            let is_direct = graph.root() == Some(parent);
            if !is_direct {
                let parent_scope = graph
                    .node(parent)
                    .and_then(|n| n.dependency.as_ref())
                    .map(|d| d.scope)
                    .unwrap_or(Scope::Compile);
                let Some(effective_scope) = propagate_scope(parent_scope, dependency.scope) else {
                    continue;
                };
                dependency.scope = effective_scope;
            }

            let mut managed_bits = depot_core::node::ManagedBits::empty();
            let mut premanaged = depot_core::node::PremanagedState::default();
            if let Some(entry) = management.iter().find(|e| e.matches(&dependency.artifact)) {
                if let Some(version) = &entry.version {
                    premanaged.version = Some(dependency.artifact.version.clone());
                    dependency.artifact = dependency.artifact.with_version(version.clone());
                    managed_bits.version = true;
                }
                if let Some(scope) = entry.scope {
                    premanaged.scope = Some(dependency.scope.to_string());
                    dependency.scope = scope;
                    managed_bits.scope = true;
                }
                if let Some(optional) = entry.optional {
                    premanaged.optional = Some(dependency.optional);
                    dependency.optional = optional;
                    managed_bits.optional = true;
                }
                if !entry.exclusions.is_empty() {
                    dependency.exclusions.extend(entry.exclusions.iter().cloned());
                    managed_bits.exclusions = true;
                }
            }

            // Resolve the version constraint (spec.md §4.M step 4c):
            // literal versions pass straight through; ranges are handed
            // to the component-L collaborator, which also reports the
            // authoritative repository for the winning version (step
            // 4d's empty-result case surfaces as an `Err` here, which
            // fails the edge the same way a literal cycle or descriptor
            // failure does).
            let constraint = dependency.artifact.version.clone();
            let mut authoritative_repository = None;
            if VersionConstraint::parse(&constraint).is_range() {
                if let Some(resolver) = self.version_resolver {
                    match resolver.resolve_constraint(&dependency.artifact, &repositories).await {
                        Ok(resolved) => {
                            authoritative_repository = resolved.authoritative_repository;
                            dependency.artifact = dependency.artifact.with_version(resolved.version);
                        }
                        Err(e) => {
                            errors.messages.push(format!("{}: {e}", dependency.artifact));
                            warn!(artifact = %dependency.artifact, error = %e, "version range resolution failed");
                            let mut node = DependencyNode::for_dependency(dependency, repositories);
                            node.managed_bits = managed_bits;
                            node.premanaged = premanaged;
                            node.version_constraint = Some(constraint);
                            let _leaf = graph.add_child(parent, node);
                            continue;
                        }
                    }
                }
            }

            if let Some(cycle_root) = graph.would_cycle(&ancestor_stack, |idx| {
                graph
                    .node(idx)
                    .and_then(|n| n.artifact())
                    .map(|a| a.ga_key() == dependency.artifact.ga_key())
                    .unwrap_or(false)
            }) {
                debug!(dependency = %dependency.artifact, "cyclic back-edge detected, not expanding further");
                let mut node = DependencyNode::for_dependency(dependency, repositories);
                node.managed_bits = managed_bits;
                node.premanaged = premanaged;
                node.version_constraint = Some(constraint);
                node.authoritative_repository = authoritative_repository;
                let _leaf = graph.add_child(parent, node);
                let _ = cycle_root;
                continue;
            }

            let request = ArtifactDescriptorRequest {
                artifact: dependency.artifact.clone(),
                repositories: repositories.clone(),
            };

            let mut node = DependencyNode::for_dependency(dependency.clone(), repositories.clone());
            node.managed_bits = managed_bits;
            node.premanaged = premanaged;
            node.version_constraint = Some(constraint);
            node.authoritative_repository = authoritative_repository;

            let descriptor = match self.reader.read_descriptor(&request) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    errors.messages.push(format!("{}: {e}", dependency.artifact));
                    warn!(artifact = %dependency.artifact, error = %e, "descriptor read failed");
                    let _leaf = graph.add_child(parent, node);
                    continue;
                }
            };

            node.relocations = descriptor.relocations.clone();
            let idx = graph.add_child(parent, node);

            if dependency.optional {
                // The dependency itself is recorded (so a direct build
                // of this artifact still sees it), but its transitive
                // closure is not expanded for this graph — optional
                // dependencies are never pulled in by consumers
                // (spec.md §4.M step 3 "optional is terminal").
                continue;
            }

            let mut next_management = management.clone();
            next_management.extend(descriptor.managed_dependencies.iter().filter_map(to_management_entry));

            let child_repositories = if descriptor.repositories.is_empty() {
                repositories.clone()
            } else {
                descriptor.repositories.clone()
            };

            let mut next_ancestors = ancestor_stack.clone();
            next_ancestors.push(idx);

            for child_dep in descriptor.dependencies {
                if dependency.excludes(&child_dep.artifact.group_id, &child_dep.artifact.artifact_id) {
                    continue;
                }
                queue.push_back((
                    idx,
                    child_dep,
                    next_management.clone(),
                    child_repositories.clone(),
                    next_ancestors.clone(),
                ));
            }
        }

        Ok((graph, errors))
    }
}

fn to_management_entry(dep: &Dependency) -> Option<ManagementEntry> {
    Some(ManagementEntry {
        group_id: dep.artifact.group_id.clone(),
        artifact_id: dep.artifact.artifact_id.clone(),
        classifier: dep.artifact.classifier.clone(),
        extension: dep.artifact.extension.clone(),
        version: Some(dep.artifact.version.clone()),
        scope: Some(dep.scope),
        optional: Some(dep.optional),
        exclusions: dep.exclusions.iter().cloned().collect(),
    })
}

/// Collect the set of visited `group:artifact` keys reachable in the
/// built graph, used by tests and by reporting code (spec.md §8
/// "testable properties": no duplicate expansion of the same GA along
/// one path).
pub fn visited_ga_keys(graph: &DirtyGraph) -> HashSet<String> {
    graph
        .node_indices()
        .into_iter()
        .filter_map(|idx| graph.node(idx).and_then(|n| n.artifact()).map(|a| a.ga_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::descriptor::{ArtifactDescriptorResult, DescriptorError};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MapReader {
        descriptors: Mutex<HashMap<String, ArtifactDescriptorResult>>,
    }

    impl ArtifactDescriptorReader for MapReader {
        fn read_descriptor(
            &self,
            request: &ArtifactDescriptorRequest,
        ) -> Result<ArtifactDescriptorResult, DescriptorError> {
            self.descriptors
                .lock()
                .unwrap()
                .get(&request.artifact.to_string())
                .cloned()
                .ok_or_else(|| DescriptorError::NotFound(request.artifact.to_string()))
        }
    }

    fn artifact(ga: &str, v: &str) -> Artifact {
        let (g, a) = ga.split_once(':').unwrap();
        Artifact::new(g, a, v)
    }

    #[test]
    fn scope_propagation_matches_maven_matrix() {
        assert_eq!(propagate_scope(Scope::Compile, Scope::Compile), Some(Scope::Compile));
        assert_eq!(propagate_scope(Scope::Compile, Scope::Runtime), Some(Scope::Runtime));
        assert_eq!(propagate_scope(Scope::Compile, Scope::Provided), None);
        assert_eq!(propagate_scope(Scope::Compile, Scope::Test), None);
        assert_eq!(propagate_scope(Scope::Test, Scope::Compile), Some(Scope::Test));
        assert_eq!(propagate_scope(Scope::Runtime, Scope::Provided), None);
        assert_eq!(propagate_scope(Scope::Provided, Scope::Compile), Some(Scope::Provided));
    }

    #[test]
    fn system_scope_is_never_propagated() {
        assert_eq!(propagate_scope(Scope::Compile, Scope::System), None);
    }

    #[tokio::test]
    async fn collects_simple_chain() {
        let mut descriptors = HashMap::new();
        descriptors.insert(
            artifact("g:a", "1.0").to_string(),
            ArtifactDescriptorResult {
                artifact: Some(artifact("g:a", "1.0")),
                dependencies: vec![Dependency::new(artifact("g:b", "2.0"), Scope::Compile)],
                ..Default::default()
            },
        );
        descriptors.insert(
            artifact("g:b", "2.0").to_string(),
            ArtifactDescriptorResult {
                artifact: Some(artifact("g:b", "2.0")),
                ..Default::default()
            },
        );
        let reader = MapReader {
            descriptors: Mutex::new(descriptors),
        };
        let collector = DependencyCollector::new(&reader);
        let (graph, errors) = collector
            .collect(
                vec![Dependency::new(artifact("g:a", "1.0"), Scope::Compile)],
                vec![],
                vec![],
            )
            .await
            .unwrap();

        assert!(errors.messages.is_empty());
        let gas = visited_ga_keys(&graph);
        assert!(gas.contains("g:a"));
        assert!(gas.contains("g:b"));
    }

    #[tokio::test]
    async fn excluded_dependency_is_not_added() {
        let mut descriptors = HashMap::new();
        descriptors.insert(
            artifact("g:a", "1.0").to_string(),
            ArtifactDescriptorResult {
                artifact: Some(artifact("g:a", "1.0")),
                dependencies: vec![Dependency::new(artifact("g:excluded", "1.0"), Scope::Compile)],
                ..Default::default()
            },
        );
        let reader = MapReader {
            descriptors: Mutex::new(descriptors),
        };
        let collector = DependencyCollector::new(&reader);
        let root_dep = Dependency::new(artifact("g:a", "1.0"), Scope::Compile).excluding([Exclusion {
            group_id: "g".to_string(),
            artifact_id: Some("excluded".to_string()),
        }]);
        let (graph, _errors) = collector.collect(vec![root_dep], vec![], vec![]).await.unwrap();
        assert!(!visited_ga_keys(&graph).contains("g:excluded"));
    }

    #[tokio::test]
    async fn optional_dependency_is_recorded_but_not_expanded() {
        let mut descriptors = HashMap::new();
        descriptors.insert(
            artifact("g:a", "1.0").to_string(),
            ArtifactDescriptorResult {
                artifact: Some(artifact("g:a", "1.0")),
                dependencies: vec![Dependency::new(artifact("g:hidden", "1.0"), Scope::Compile)],
                ..Default::default()
            },
        );
        let reader = MapReader {
            descriptors: Mutex::new(descriptors),
        };
        let collector = DependencyCollector::new(&reader);
        let root_dep = Dependency::new(artifact("g:a", "1.0"), Scope::Compile).optional(true);
        let (graph, _errors) = collector.collect(vec![root_dep], vec![], vec![]).await.unwrap();
        let gas = visited_ga_keys(&graph);
        assert!(gas.contains("g:a"));
        assert!(!gas.contains("g:hidden"));
    }

    #[tokio::test]
    async fn cycle_is_detected_without_infinite_loop() {
        let mut descriptors = HashMap::new();
        descriptors.insert(
            artifact("g:a", "1.0").to_string(),
            ArtifactDescriptorResult {
                artifact: Some(artifact("g:a", "1.0")),
                dependencies: vec![Dependency::new(artifact("g:b", "1.0"), Scope::Compile)],
                ..Default::default()
            },
        );
        descriptors.insert(
            artifact("g:b", "1.0").to_string(),
            ArtifactDescriptorResult {
                artifact: Some(artifact("g:b", "1.0")),
                dependencies: vec![Dependency::new(artifact("g:a", "1.0"), Scope::Compile)],
                ..Default::default()
            },
        );
        let reader = MapReader {
            descriptors: Mutex::new(descriptors),
        };
        let collector = DependencyCollector::new(&reader);
        let (graph, errors) = collector
            .collect(vec![Dependency::new(artifact("g:a", "1.0"), Scope::Compile)], vec![], vec![])
            .await
            .unwrap();
        assert!(errors.messages.is_empty());
        assert!(graph.node_count() < 10);
    }

    #[tokio::test]
    async fn management_overrides_version_before_descriptor_lookup() {
        let mut descriptors = HashMap::new();
        descriptors.insert(
            artifact("g:a", "2.0").to_string(),
            ArtifactDescriptorResult {
                artifact: Some(artifact("g:a", "2.0")),
                ..Default::default()
            },
        );
        let reader = MapReader {
            descriptors: Mutex::new(descriptors),
        };
        let collector = DependencyCollector::new(&reader);
        let management = vec![ManagementEntry {
            group_id: "g".to_string(),
            artifact_id: "a".to_string(),
            classifier: String::new(),
            extension: "jar".to_string(),
            version: Some("2.0".to_string()),
            scope: None,
            optional: None,
            exclusions: vec![],
        }];
        let (graph, errors) = collector
            .collect(
                vec![Dependency::new(artifact("g:a", "1.0"), Scope::Compile)],
                management,
                vec![],
            )
            .await
            .unwrap();
        assert!(errors.messages.is_empty());
        let child = graph.children(graph.root().unwrap()).next().unwrap();
        assert_eq!(graph.node(child).unwrap().artifact().unwrap().version, "2.0");
        assert!(graph.node(child).unwrap().managed_bits.version);
    }

    struct StubVersionResolver {
        versions: Vec<String>,
        authoritative_repository: &'static str,
    }

    #[async_trait::async_trait]
    impl VersionConstraintResolver for StubVersionResolver {
        async fn resolve_constraint(&self, artifact: &Artifact, _repositories: &[RemoteRepository]) -> miette::Result<ResolvedVersion> {
            let constraint = VersionConstraint::parse(&artifact.version);
            let VersionConstraint::Range(range) = constraint else {
                unreachable!("test only exercises range constraints")
            };
            let candidates: Vec<_> = self.versions.iter().map(|v| depot_core::version::MavenVersion::parse(v)).collect();
            let resolved = range
                .select_highest(&candidates)
                .expect("test range matches a stubbed version")
                .as_str()
                .to_string();
            Ok(ResolvedVersion {
                version: resolved,
                was_range: true,
                authoritative_repository: Some(self.authoritative_repository.to_string()),
            })
        }
    }

    #[tokio::test]
    async fn range_dependency_resolves_to_highest_matching_version_via_resolver() {
        let mut descriptors = HashMap::new();
        descriptors.insert(
            artifact("g:a", "1.5").to_string(),
            ArtifactDescriptorResult {
                artifact: Some(artifact("g:a", "1.5")),
                ..Default::default()
            },
        );
        let reader = MapReader {
            descriptors: Mutex::new(descriptors),
        };
        let resolver = StubVersionResolver {
            versions: vec!["1.0".to_string(), "1.5".to_string(), "2.0".to_string()],
            authoritative_repository: "central",
        };
        let collector = DependencyCollector::new(&reader).with_version_resolver(&resolver);
        let root_dep = Dependency::new(artifact("g:a", "[1.0,2.0)"), Scope::Compile);
        let (graph, errors) = collector.collect(vec![root_dep], vec![], vec![]).await.unwrap();

        assert!(errors.messages.is_empty());
        let child = graph.children(graph.root().unwrap()).next().unwrap();
        let node = graph.node(child).unwrap();
        assert_eq!(node.artifact().unwrap().version, "1.5");
        assert_eq!(node.version_constraint.as_deref(), Some("[1.0,2.0)"));
        assert_eq!(node.authoritative_repository.as_deref(), Some("central"));
    }

    struct FailingVersionResolver;

    #[async_trait::async_trait]
    impl VersionConstraintResolver for FailingVersionResolver {
        async fn resolve_constraint(&self, _artifact: &Artifact, _repositories: &[RemoteRepository]) -> miette::Result<ResolvedVersion> {
            Err(depot_util::errors::DepotError::VersionResolution {
                message: "no version satisfies range".to_string(),
            }
            .into())
        }
    }

    #[tokio::test]
    async fn unsatisfiable_range_fails_the_edge_without_expanding() {
        let reader = MapReader {
            descriptors: Mutex::new(HashMap::new()),
        };
        let resolver = FailingVersionResolver;
        let collector = DependencyCollector::new(&reader).with_version_resolver(&resolver);
        let root_dep = Dependency::new(artifact("g:a", "[5.0,6.0)"), Scope::Compile);
        let (graph, errors) = collector.collect(vec![root_dep], vec![], vec![]).await.unwrap();

        assert_eq!(errors.messages.len(), 1);
        let child = graph.children(graph.root().unwrap()).next().unwrap();
        let node = graph.node(child).unwrap();
        assert_eq!(node.artifact().unwrap().version, "[5.0,6.0)");
        assert!(graph.children(child).next().is_none());
    }
}
