//! Strongly-connected components of the trust graph.
//!
//! # Overview
//!
//! Single-pass Tarjan decomposition over the `signed_by` (incoming)
//! relation: discovery numbers, low-link propagation, an explicit
//! visitation stack, and a removed flag preventing revisits. SCC
//! membership is invariant under whole-graph edge reversal, so walking
//! the incoming lists yields the same partition as the forward graph.
//!
//! The DFS is iterative with an explicit frame stack — recursion depth
//! would otherwise scale with the longest signature chain in the
//! keyring.
//!
//! ## Strong set
//!
//! The largest component is tracked as it closes; ties keep the earlier
//! component. Roots are tried in ascending key index order, which makes
//! the winner a deterministic function of key insertion order rather
//! than an arbitrary pick among equals.

use tracing::{debug, instrument};

use crate::graph::KeyGraph;

/// One strongly-connected component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// The component label: the key index of its DFS root.
    pub rep: usize,
    /// Member key indices in closure (stack pop) order; the root is
    /// popped last.
    pub members: Vec<usize>,
}

impl Component {
    /// Number of keys in this component.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// `true` if the component has no members (never produced by
    /// [`SccForest::decompose`]).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The component partition of a [`KeyGraph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SccForest {
    /// Component label per key index (the label is the root's key index).
    pub component: Vec<usize>,
    /// All components in closure order.
    pub components: Vec<Component>,
    /// Label of the largest component, `None` for an empty graph.
    pub strong_rep: Option<usize>,
    /// Member count of the largest component.
    pub strong_size: usize,
}

/// One simulated recursion frame: a node and its next unexplored edge.
struct Frame {
    node: usize,
    next_edge: usize,
}

/// Per-decomposition working state.
struct TarjanState {
    /// Discovery order, 1-based; 0 means unvisited.
    dfs_num: Vec<usize>,
    /// Lowest discovery number reachable from the node's subtree.
    low: Vec<usize>,
    /// Set once a node's component has closed.
    removed: Vec<bool>,
    /// Visitation stack of open nodes.
    stack: Vec<usize>,
    next_dfs: usize,
}

impl SccForest {
    /// Decompose `graph` into strongly-connected components.
    #[must_use]
    #[instrument(skip(graph), fields(keys = graph.len()))]
    pub fn decompose(graph: &KeyGraph) -> Self {
        let n = graph.len();
        let mut state = TarjanState {
            dfs_num: vec![0; n],
            low: vec![0; n],
            removed: vec![false; n],
            stack: Vec::with_capacity(n),
            next_dfs: 0,
        };
        let mut forest = Self {
            component: vec![0; n],
            components: Vec::new(),
            strong_rep: None,
            strong_size: 0,
        };

        for root in 0..n {
            if state.dfs_num[root] == 0 {
                visit(graph, &mut state, &mut forest, root);
            }
        }

        debug!(
            components = forest.components.len(),
            strong_size = forest.strong_size,
            "decomposition complete"
        );
        forest
    }

    /// `true` if `index` belongs to the largest component.
    #[must_use]
    pub fn in_strong_set(&self, index: usize) -> bool {
        self.strong_rep == Some(self.component[index])
    }
}

/// Depth-first visit from `root`, closing every component it completes.
fn visit(graph: &KeyGraph, state: &mut TarjanState, forest: &mut SccForest, root: usize) {
    state.next_dfs += 1;
    state.dfs_num[root] = state.next_dfs;
    state.low[root] = state.next_dfs;
    state.stack.push(root);

    let mut frames = vec![Frame {
        node: root,
        next_edge: 0,
    }];

    while let Some(frame) = frames.last_mut() {
        let node = frame.node;
        let edge = frame.next_edge;
        frame.next_edge += 1;

        if let Some(&neighbor) = graph.signed_by(node).get(edge) {
            if state.removed[neighbor] {
                continue;
            }
            if state.dfs_num[neighbor] == 0 {
                state.next_dfs += 1;
                state.dfs_num[neighbor] = state.next_dfs;
                state.low[neighbor] = state.next_dfs;
                state.stack.push(neighbor);
                frames.push(Frame {
                    node: neighbor,
                    next_edge: 0,
                });
            } else if state.dfs_num[neighbor] < state.low[node] {
                // Back edge to an open node.
                state.low[node] = state.dfs_num[neighbor];
            }
            continue;
        }

        // Node exhausted: unwind one frame.
        frames.pop();

        if state.low[node] == state.dfs_num[node] {
            // `node` roots a component: pop the stack down to and
            // including it.
            let mut members = Vec::new();
            while let Some(popped) = state.stack.pop() {
                forest.component[popped] = node;
                state.removed[popped] = true;
                members.push(popped);
                if popped == node {
                    break;
                }
            }
            let size = members.len();
            forest.components.push(Component { rep: node, members });
            // Strictly greater only: an equal-sized later component
            // never displaces the first one discovered.
            if size > forest.strong_size {
                forest.strong_size = size;
                forest.strong_rep = Some(node);
            }
        }

        if let Some(parent) = frames.last() {
            let parent = parent.node;
            if state.low[node] < state.low[parent] {
                state.low[parent] = state.low[node];
            }
        }
    }
}
