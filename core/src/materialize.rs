//! Tree materialization over a [`RemoteLookup`].
//!
//! # Strategies
//!
//! Both strategies fetch the same records and build the same tree; they only
//! differ in how the fetches are scheduled.
//!
//! - [`Strategy::DepthFirst`]: every node fans out over its own related ids and
//!   each child recurses the same way. A subtree is complete before its parent
//!   node is assembled.
//! - [`Strategy::BreadthFirst`]: one fan-out per level over the concatenated
//!   related ids of the whole previous level. Each parent then takes back the
//!   contiguous run of results produced from its own related-id list.
//!
//! # Depth guard
//!
//! Termination normally comes from the remote data: the deepest level's records
//! have no related ids. A record that still lists children at
//! `max_depth - 1` fails the call with [`MaterializeError::DepthExceeded`]
//! rather than recursing further.

use std::fmt;
use std::future::Future;
use std::slice;
use std::str::FromStr;
use std::time::Instant;

use canopy_lookup::{LookupError, RemoteLookup};
use canopy_types::{LevelProgression, Node, NodeId, RemoteRecord};
use futures_util::FutureExt;
use futures_util::future::{AbortHandle, Abortable, Aborted, BoxFuture};
use serde::{Deserialize, Serialize};

use crate::fan_out::{FanOutError, fan_out};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    DepthFirst,
    BreadthFirst,
}

impl Strategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DepthFirst => "depth-first",
            Self::BreadthFirst => "breadth-first",
        }
    }

}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy {0:?}, expected depth-first or breadth-first")]
pub struct UnknownStrategy(String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "depth-first" | "depth" | "dfs" => Ok(Self::DepthFirst),
            "breadth-first" | "breadth" | "bfs" => Ok(Self::BreadthFirst),
            _ => Err(UnknownStrategy(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeOptions {
    pub strategy: Strategy,
    /// Type label requested at each depth.
    pub levels: LevelProgression,
    /// Number of levels the tree may have, root included. At least 1.
    pub max_depth: usize,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        let levels = LevelProgression::default();
        Self {
            strategy: Strategy::default(),
            max_depth: levels.len(),
            levels,
        }
    }
}

impl MaterializeOptions {
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Also resets `max_depth` to the progression length.
    #[must_use]
    pub fn with_levels(mut self, levels: LevelProgression) -> Self {
        self.max_depth = levels.len();
        self.levels = levels;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("failed to fetch {kind} {id}")]
    Lookup {
        id: NodeId,
        kind: String,
        #[source]
        source: LookupError,
    },
    #[error("record {id} lists children at depth {depth}, deeper than the maximum of {max_depth}")]
    DepthExceeded {
        id: NodeId,
        depth: usize,
        max_depth: usize,
    },
    #[error("materialization cancelled")]
    Cancelled,
}

/// Builds trees by fanning out over a [`RemoteLookup`].
///
/// Holds no per-call state: every call re-issues all of its fetches and owns
/// the tree it returns.
#[derive(Debug)]
pub struct Materializer<L> {
    lookup: L,
    options: MaterializeOptions,
}

impl<L: RemoteLookup> Materializer<L> {
    pub fn new(lookup: L) -> Self {
        Self::with_options(lookup, MaterializeOptions::default())
    }

    pub fn with_options(lookup: L, options: MaterializeOptions) -> Self {
        Self { lookup, options }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    pub fn options(&self) -> &MaterializeOptions {
        &self.options
    }

    /// Materialize the tree rooted at `(root_id, root_type)`.
    ///
    /// Resolves to the complete tree or to the first failure observed anywhere
    /// in it. Never resolves to a tree with missing branches.
    pub async fn materialize(
        &self,
        root_id: NodeId,
        root_type: &str,
    ) -> Result<Node, MaterializeError> {
        let started = Instant::now();
        let strategy = self.options.strategy;

        let result = match strategy {
            Strategy::DepthFirst => self.subtree(root_id, root_type, 0).await,
            Strategy::BreadthFirst => self.level_by_level(root_id, root_type).await,
        };

        match &result {
            Ok(tree) => tracing::info!(
                root = %root_id,
                strategy = strategy.as_str(),
                nodes = tree.node_count(),
                height = tree.height(),
                elapsed_ms = started.elapsed().as_millis(),
                "Materialized tree"
            ),
            Err(err) => tracing::debug!(
                root = %root_id,
                strategy = strategy.as_str(),
                error = %err,
                "Materialization failed"
            ),
        }
        result
    }

    /// Like [`materialize`](Self::materialize), but cancellable.
    ///
    /// Aborting the handle resolves the future with
    /// [`MaterializeError::Cancelled`] and drops every fetch still in flight.
    pub fn materialize_abortable<'a>(
        &'a self,
        root_id: NodeId,
        root_type: &'a str,
    ) -> (
        AbortHandle,
        impl Future<Output = Result<Node, MaterializeError>> + Send + 'a,
    ) {
        let (handle, registration) = AbortHandle::new_pair();
        let task = Abortable::new(self.materialize(root_id, root_type), registration);
        let future = async move {
            task.await.unwrap_or_else(|Aborted| {
                tracing::debug!(root = %root_id, "Materialization aborted");
                Err(MaterializeError::Cancelled)
            })
        };
        (handle, future)
    }

    async fn fetch(
        &self,
        id: NodeId,
        kind: &str,
        depth: usize,
    ) -> Result<RemoteRecord, MaterializeError> {
        let record = self
            .lookup
            .fetch(id, kind)
            .await
            .map_err(|source| MaterializeError::Lookup {
                id,
                kind: kind.to_string(),
                source,
            })?;

        let max_depth = self.options.max_depth.max(1);
        if !record.is_leaf() && depth + 1 >= max_depth {
            return Err(MaterializeError::DepthExceeded {
                id,
                depth: depth + 1,
                max_depth,
            });
        }
        Ok(record)
    }

    fn subtree<'a>(
        &'a self,
        id: NodeId,
        kind: &'a str,
        depth: usize,
    ) -> BoxFuture<'a, Result<Node, MaterializeError>> {
        async move {
            let record = self.fetch(id, kind, depth).await?;
            if record.is_leaf() {
                return Ok(Node::assemble(record, Vec::new()));
            }

            let child_kind = self.options.levels.label(depth + 1);
            let children = fan_out(record.related_item_ids.iter().copied(), |child| {
                self.subtree(child, child_kind, depth + 1)
            })
            .await
            .map_err(FanOutError::into_source)?;

            Ok(Node::assemble(record, children))
        }
        .boxed()
    }

    async fn level_by_level(
        &self,
        root_id: NodeId,
        root_type: &str,
    ) -> Result<Node, MaterializeError> {
        let root = self.fetch(root_id, root_type, 0).await?;

        // levels[d] holds the records at depth d + 1, in the order their ids
        // appear across the related-id lists of depth d.
        let mut levels: Vec<Vec<RemoteRecord>> = Vec::new();
        loop {
            let frontier = levels.last().map_or(slice::from_ref(&root), Vec::as_slice);
            let child_ids: Vec<NodeId> = frontier
                .iter()
                .flat_map(|record| record.related_item_ids.iter().copied())
                .collect();
            if child_ids.is_empty() {
                break;
            }

            let depth = levels.len() + 1;
            let kind = self.options.levels.label(depth);
            tracing::debug!(depth, kind, width = child_ids.len(), "Fetching level");

            let records = fan_out(child_ids, |id| self.fetch(id, kind, depth))
                .await
                .map_err(FanOutError::into_source)?;
            levels.push(records);
        }

        Ok(assemble_levels(root, levels))
    }
}

/// Rebuild the tree bottom-up from per-level records.
///
/// Walking a level in order, each record owns the next `related_item_ids.len()`
/// nodes built from the level below it.
fn assemble_levels(root: RemoteRecord, levels: Vec<Vec<RemoteRecord>>) -> Node {
    let mut below: Vec<Node> = Vec::new();
    for records in levels.into_iter().rev() {
        let mut owned = below.into_iter();
        below = records
            .into_iter()
            .map(|record| {
                let children: Vec<Node> = owned
                    .by_ref()
                    .take(record.related_item_ids.len())
                    .collect();
                Node::assemble(record, children)
            })
            .collect();
    }
    Node::assemble(root, below)
}
