//! Locally materialized tree nodes.

use serde::{Deserialize, Serialize};

use crate::{NodeId, RemoteRecord};

/// A node of the materialized tree with fully resolved children.
///
/// Nodes are built once, bottom-up, and never mutated afterwards. `children[i]`
/// is the subtree built from `related_item_ids[i]` of the record this node was
/// built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: String,
    pub children: Vec<Node>,
}

impl Node {
    #[must_use]
    pub fn new(id: NodeId, kind: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            id,
            kind: kind.into(),
            children,
        }
    }

    #[must_use]
    pub fn leaf(id: NodeId, kind: impl Into<String>) -> Self {
        Self::new(id, kind, Vec::new())
    }

    /// Build a node from its record and the subtrees for its related ids.
    ///
    /// `children` must line up one-to-one with `record.related_item_ids`.
    #[must_use]
    pub fn assemble(record: RemoteRecord, children: Vec<Node>) -> Self {
        debug_assert_eq!(
            record.related_item_ids.len(),
            children.len(),
            "children must line up with related ids of record {}",
            record.id
        );
        Self {
            id: record.id,
            kind: record.kind,
            children,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Number of levels in this subtree. A lone leaf has height 1.
    #[must_use]
    pub fn height(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Node::height)
            .max()
            .unwrap_or(0)
    }

    /// Ids in pre-order, children visited in stored order.
    #[must_use]
    pub fn ids_depth_first(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.node_count());
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            ids.push(node.id);
            stack.extend(node.children.iter().rev());
        }
        ids
    }
}
