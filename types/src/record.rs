//! Flat records as returned by the remote graph service.

use serde::{Deserialize, Serialize};

use crate::NodeId;

/// One node of the remote graph, as the lookup service returns it.
///
/// `related_item_ids` references the next level down and is empty for leaf
/// records. The order of `related_item_ids` is the order children appear in
/// the materialized tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub related_item_ids: Vec<NodeId>,
}

impl RemoteRecord {
    #[must_use]
    pub fn new(id: NodeId, kind: impl Into<String>, related_item_ids: Vec<NodeId>) -> Self {
        Self {
            id,
            kind: kind.into(),
            related_item_ids,
        }
    }

    #[must_use]
    pub fn leaf(id: NodeId, kind: impl Into<String>) -> Self {
        Self::new(id, kind, Vec::new())
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.related_item_ids.is_empty()
    }
}

/// Type tag the remote service reports for a record requested as `kind`.
#[must_use]
pub fn record_kind(kind: &str) -> String {
    format!("{kind}-node")
}
