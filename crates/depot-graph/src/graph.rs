//! The dirty dependency graph: an arena of [`DependencyNode`]s connected
//! by `petgraph`, possibly cyclic and possibly carrying duplicate
//! coordinates (spec.md §3 invariant, §9 "Graph representation").
//!
//! `StableDiGraph` rather than a plain `DiGraph`: conflict resolution
//! (component N) needs to remove loser nodes' subtrees without
//! invalidating the indices still held by nodes that survive, which a
//! compacting graph would not allow.

use petgraph::graph::NodeIndex as PetNodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use depot_core::node::DependencyNode;

pub type NodeIndex = PetNodeIndex;

/// An edge carries no data of its own; all per-edge state lives on the
/// [`DependencyNode`] at its target, since a dependency edge and the
/// node it resolves to are in 1:1 correspondence (spec.md §3 DATA
/// MODEL).
#[derive(Debug, Clone, Copy, Default)]
pub struct Edge;

#[derive(Default)]
pub struct DirtyGraph {
    inner: StableDiGraph<DependencyNode, Edge>,
    root: Option<NodeIndex>,
}

impl DirtyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_root(&mut self, node: DependencyNode) -> NodeIndex {
        let idx = self.inner.add_node(node);
        self.root = Some(idx);
        idx
    }

    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    pub fn add_child(&mut self, parent: NodeIndex, node: DependencyNode) -> NodeIndex {
        let idx = self.inner.add_node(node);
        self.inner.add_edge(parent, idx, Edge);
        idx
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&DependencyNode> {
        self.inner.node_weight(idx)
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut DependencyNode> {
        self.inner.node_weight_mut(idx)
    }

    pub fn children(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.inner.neighbors_directed(idx, Direction::Outgoing)
    }

    pub fn parents(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.inner.neighbors_directed(idx, Direction::Incoming)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn node_indices(&self) -> Vec<NodeIndex> {
        self.inner.node_indices().collect()
    }

    /// Depth of `idx` from the root: the length of the shortest path
    /// from the root, used by the nearest-wins conflict strategy
    /// (spec.md §4.N). A node unreachable from the root (should not
    /// happen in a well-formed dirty graph) reports `usize::MAX`.
    pub fn depth(&self, idx: NodeIndex) -> usize {
        let Some(root) = self.root else { return usize::MAX };
        if root == idx {
            return 0;
        }
        let mut visited = std::collections::HashSet::new();
        let mut frontier = vec![root];
        let mut depth = 0;
        while !frontier.is_empty() {
            depth += 1;
            let mut next = Vec::new();
            for node in frontier {
                for child in self.children(node) {
                    if child == idx {
                        return depth;
                    }
                    if visited.insert(child) {
                        next.push(child);
                    }
                }
            }
            frontier = next;
        }
        usize::MAX
    }

    /// Detach `idx`'s outgoing edges (its children) without removing the
    /// node itself, so it remains visible as a leaf (spec.md §3
    /// invariant: "loser subtrees are retained as leaves in verbose
    /// mode"). Used when conflict resolution decides `idx` lost.
    pub fn detach_children(&mut self, idx: NodeIndex) {
        let edges: Vec<_> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        for edge in edges {
            self.inner.remove_edge(edge);
        }
    }

    /// Remove `idx` and everything only reachable through it. Used by
    /// the non-verbose conflict-resolution path, which discards loser
    /// subtrees entirely rather than keeping them as disconnected
    /// leaves.
    pub fn remove_subtree(&mut self, idx: NodeIndex) {
        let children: Vec<_> = self.children(idx).collect();
        for child in children {
            if self.parents(child).count() <= 1 {
                self.remove_subtree(child);
            }
        }
        self.inner.remove_node(idx);
    }

    /// True if `ancestor` is on the graph path from the root to
    /// `candidate`'s parent — i.e. adding an edge `ancestor -> candidate`
    /// would close a cycle. Used by the collector (component M) to
    /// detect and record cyclic back-edges rather than looping forever
    /// (spec.md §3 invariant "dirty graph ... possibly cyclic").
    pub fn would_cycle(&self, ancestor_stack: &[NodeIndex], candidate_ga_matches: impl Fn(NodeIndex) -> bool) -> Option<NodeIndex> {
        ancestor_stack.iter().copied().find(|&a| candidate_ga_matches(a))
    }
}
