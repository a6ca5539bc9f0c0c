//! `ConflictResolver` (component N, spec.md §4.N): groups nodes by
//! conflict id, picks a winner per group, and prunes losers from the
//! dirty graph — either detaching their children (verbose mode, losers
//! kept as leaves) or removing their subtrees outright.

use std::collections::HashMap;

use depot_core::version::MavenVersion;

use crate::graph::{DirtyGraph, NodeIndex};

/// How to pick a winner among nodes sharing a conflict id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictStrategy {
    /// The node closest to the root wins; ties broken by declaration
    /// order (first-seen wins), matching Maven's "nearest definition"
    /// rule (spec.md §4.N step 1).
    NearestWins,
    /// The highest version wins regardless of depth.
    HighestVersionWins,
}

#[derive(Debug, Clone)]
pub struct ConflictResolution {
    pub winners: HashMap<String, NodeIndex>,
    pub losers: Vec<NodeIndex>,
}

pub struct ConflictResolver {
    strategy: ConflictStrategy,
    verbose: bool,
}

impl ConflictResolver {
    pub fn new(strategy: ConflictStrategy) -> Self {
        Self { strategy, verbose: false }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve conflicts and mutate `graph` in place: loser nodes are
    /// marked via `conflict_loser_of` and then pruned according to
    /// `verbose` (spec.md §4.N step 3).
    pub fn resolve(&self, graph: &mut DirtyGraph) -> ConflictResolution {
        let mut groups: HashMap<String, Vec<NodeIndex>> = HashMap::new();
        for idx in graph.node_indices() {
            let Some(node) = graph.node(idx) else { continue };
            let Some(artifact) = node.artifact() else { continue };
            groups.entry(artifact.conflict_id()).or_default().push(idx);
        }

        let mut winners = HashMap::new();
        let mut losers = Vec::new();

        for (conflict_id, mut candidates) in groups {
            if candidates.len() <= 1 {
                if let Some(&only) = candidates.first() {
                    winners.insert(conflict_id, only);
                }
                continue;
            }

            let winner = match self.strategy {
                ConflictStrategy::NearestWins => self.pick_nearest(graph, &candidates),
                ConflictStrategy::HighestVersionWins => self.pick_highest(graph, &candidates),
            };
            winners.insert(conflict_id, winner);
            candidates.retain(|&idx| idx != winner);
            losers.extend(candidates.iter().copied());
        }

        for &loser in &losers {
            let winner_id = graph
                .node(loser)
                .and_then(|n| n.artifact())
                .map(|a| a.conflict_id())
                .unwrap_or_default();
            if let Some(node) = graph.node_mut(loser) {
                node.conflict_loser_of = Some(winner_id);
            }
            if self.verbose {
                graph.detach_children(loser);
            } else {
                graph.remove_subtree(loser);
            }
        }

        ConflictResolution { winners, losers }
    }

    fn pick_nearest(&self, graph: &DirtyGraph, candidates: &[NodeIndex]) -> NodeIndex {
        // Stable sort: first-declared (lowest index, i.e. first inserted
        // into the arena) wins a depth tie, matching the order the
        // collector walked declarations in.
        let mut ranked: Vec<(usize, NodeIndex)> = candidates.iter().map(|&idx| (graph.depth(idx), idx)).collect();
        ranked.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.index().cmp(&b.1.index())));
        ranked[0].1
    }

    fn pick_highest(&self, graph: &DirtyGraph, candidates: &[NodeIndex]) -> NodeIndex {
        let mut best: Option<(MavenVersion, NodeIndex)> = None;
        for &idx in candidates {
            let Some(artifact) = graph.node(idx).and_then(|n| n.artifact()) else { continue };
            let version = MavenVersion::parse(&artifact.version);
            match &best {
                Some((best_version, _)) if *best_version >= version => {}
                _ => best = Some((version, idx)),
            }
        }
        best.map(|(_, idx)| idx).unwrap_or(candidates[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::artifact::Artifact;
    use depot_core::dependency::{Dependency, Scope};
    use depot_core::node::DependencyNode;

    fn dep_node(ga: &str, version: &str) -> DependencyNode {
        let (g, a) = ga.split_once(':').unwrap();
        DependencyNode::for_dependency(Dependency::new(Artifact::new(g, a, version), Scope::Compile), vec![])
    }

    #[test]
    fn nearest_wins_prefers_shallower_depth() {
        let mut graph = DirtyGraph::new();
        let root = graph.set_root(DependencyNode::root());
        let direct = graph.add_child(root, dep_node("g:a", "1.0"));
        let mid = graph.add_child(root, dep_node("g:mid", "1.0"));
        let transitive = graph.add_child(mid, dep_node("g:a", "2.0"));

        let resolver = ConflictResolver::new(ConflictStrategy::NearestWins);
        let resolution = resolver.resolve(&mut graph);

        let winner = resolution.winners.get("g:a::jar").copied();
        assert_eq!(winner, Some(direct));
        assert!(resolution.losers.contains(&transitive));
    }

    #[test]
    fn highest_version_wins_regardless_of_depth() {
        let mut graph = DirtyGraph::new();
        let root = graph.set_root(DependencyNode::root());
        let mid = graph.add_child(root, dep_node("g:mid", "1.0"));
        let deep_newer = graph.add_child(mid, dep_node("g:a", "9.0"));
        let _direct_older = graph.add_child(root, dep_node("g:a", "1.0"));

        let resolver = ConflictResolver::new(ConflictStrategy::HighestVersionWins);
        let resolution = resolver.resolve(&mut graph);

        assert_eq!(resolution.winners.get("g:a::jar").copied(), Some(deep_newer));
    }

    #[test]
    fn verbose_mode_keeps_loser_as_leaf() {
        let mut graph = DirtyGraph::new();
        let root = graph.set_root(DependencyNode::root());
        let direct = graph.add_child(root, dep_node("g:a", "1.0"));
        let mid = graph.add_child(root, dep_node("g:mid", "1.0"));
        let transitive = graph.add_child(mid, dep_node("g:a", "2.0"));
        let _grandchild = graph.add_child(transitive, dep_node("g:c", "1.0"));

        let resolver = ConflictResolver::new(ConflictStrategy::NearestWins).verbose(true);
        resolver.resolve(&mut graph);

        assert!(graph.node_indices().contains(&transitive));
        assert!(graph.node(transitive).unwrap().is_conflict_loser());
        assert_eq!(graph.children(transitive).count(), 0);
        let _ = direct;
    }

    #[test]
    fn non_verbose_mode_removes_loser_subtree() {
        let mut graph = DirtyGraph::new();
        let root = graph.set_root(DependencyNode::root());
        let _direct = graph.add_child(root, dep_node("g:a", "1.0"));
        let mid = graph.add_child(root, dep_node("g:mid", "1.0"));
        let transitive = graph.add_child(mid, dep_node("g:a", "2.0"));
        let grandchild = graph.add_child(transitive, dep_node("g:c", "1.0"));

        let resolver = ConflictResolver::new(ConflictStrategy::NearestWins);
        resolver.resolve(&mut graph);

        assert!(!graph.node_indices().contains(&transitive));
        assert!(!graph.node_indices().contains(&grandchild));
    }
}
