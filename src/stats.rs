//! Structural profiling: node and child tallies per variant.

use std::fmt;

use crate::node::{Child, NodeKind, Slot, NUM_KINDS};

/// Inner-node census of a tree, indexed by [`NodeKind`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileReport {
    /// Inner nodes per variant.
    pub nodes: [usize; NUM_KINDS],
    /// Non-null children per parent variant.
    pub children: [usize; NUM_KINDS],
}

impl ProfileReport {
    /// Average fanout actually used by a variant.
    pub fn children_per_node(&self, kind: NodeKind) -> f64 {
        let nodes = self.nodes[kind as usize];
        if nodes == 0 {
            return 0.0;
        }
        self.children[kind as usize] as f64 / nodes as f64
    }

    /// Inner nodes across all variants.
    pub fn total_nodes(&self) -> usize {
        self.nodes.iter().sum()
    }
}

pub(crate) fn profile(root: &Slot) -> ProfileReport {
    let mut report = ProfileReport::default();
    count_nodes(root, &mut report.nodes);
    count_children(root, &mut report.children);
    report
}

fn count_nodes(slot: &Slot, nodes: &mut [usize; NUM_KINDS]) {
    if let Some(child) = slot {
        count_nodes_child(child, nodes);
    }
}

fn count_nodes_child(child: &Child, nodes: &mut [usize; NUM_KINDS]) {
    let Child::Inner(node) = child else { return };
    nodes[node.kind() as usize] += 1;
    node.each_child(|grandchild| count_nodes_child(grandchild, nodes));
}

fn count_children(slot: &Slot, children: &mut [usize; NUM_KINDS]) {
    let Some(Child::Inner(node)) = slot else {
        return;
    };
    count_children_inner(node, children);
}

fn count_children_inner(node: &crate::node::Inner, children: &mut [usize; NUM_KINDS]) {
    node.each_child(|child| {
        children[node.kind() as usize] += 1;
        if let Child::Inner(inner) = child {
            count_children_inner(inner, children);
        }
    });
}

const KINDS: [NodeKind; NUM_KINDS] = [
    NodeKind::Node4,
    NodeKind::Node16,
    NodeKind::Node48,
    NodeKind::Node256,
    NodeKind::Linear,
];

impl fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kind in KINDS {
            writeln!(
                f,
                "{:<8} nodes={:<8} children={:<10} children/node={:.2}",
                kind.name(),
                self.nodes[kind as usize],
                self.children[kind as usize],
                self.children_per_node(kind),
            )?;
        }
        Ok(())
    }
}
