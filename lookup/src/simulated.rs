//! Randomized stand-ins for the remote service.
//!
//! Every fetch waits out a fixed latency and then invents its answer: a
//! contiguous run of child ids starting somewhere in `[1000, 2000)`, with a
//! random branching factor. Records of a leaf type never have children, which
//! is what bounds the tree.

use std::ops::Range;
use std::thread;
use std::time::Duration;

use canopy_types::{NodeId, RemoteRecord, record_kind};

use crate::{LookupError, RemoteLookup, Thing, ValueSource};

pub const DEFAULT_LATENCY: Duration = Duration::from_millis(100);
pub const DEFAULT_BRANCHING: Range<usize> = 5..10;
const FIRST_CHILD_ID: Range<u64> = 1000..2000;
const VALUE_RANGE: Range<i64> = 0..100;

#[derive(Debug, Clone)]
pub struct SimulatedLookup {
    latency: Duration,
    branching: Range<usize>,
    leaf_kinds: Vec<String>,
}

impl Default for SimulatedLookup {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            branching: DEFAULT_BRANCHING,
            leaf_kinds: vec!["service".to_string()],
        }
    }
}

impl SimulatedLookup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Branching factor range, end exclusive. An empty range means exactly
    /// `branching.start` children.
    #[must_use]
    pub fn with_branching(mut self, branching: Range<usize>) -> Self {
        self.branching = branching;
        self
    }

    #[must_use]
    pub fn with_leaf_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leaf_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    fn is_leaf_kind(&self, kind: &str) -> bool {
        self.leaf_kinds.iter().any(|leaf| leaf == kind)
    }

    fn related_ids(&self, kind: &str) -> Vec<NodeId> {
        if self.is_leaf_kind(kind) {
            return Vec::new();
        }
        let count = if self.branching.is_empty() {
            self.branching.start
        } else {
            rand::random_range(self.branching.clone())
        };
        let first: u64 = rand::random_range(FIRST_CHILD_ID);
        (first..first + count as u64).map(NodeId::new).collect()
    }
}

impl RemoteLookup for SimulatedLookup {
    async fn fetch(&self, id: NodeId, kind: &str) -> Result<RemoteRecord, LookupError> {
        tokio::time::sleep(self.latency).await;
        let related_item_ids = self.related_ids(kind);
        tracing::debug!(
            %id,
            kind,
            children = related_item_ids.len(),
            "Simulated lookup"
        );
        Ok(RemoteRecord::new(id, record_kind(kind), related_item_ids))
    }
}

/// Value source backed by a blocking, synchronous simulated API.
///
/// The blocking call runs on tokio's blocking pool so it never stalls the
/// scheduler thread driving the fan-out.
#[derive(Debug, Clone)]
pub struct SimulatedValues {
    latency: Duration,
}

impl Default for SimulatedValues {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
        }
    }
}

impl SimulatedValues {
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

fn simulate_synchronous_api(latency: Duration) -> i64 {
    thread::sleep(latency);
    rand::random_range(VALUE_RANGE)
}

impl ValueSource for SimulatedValues {
    async fn fetch_value(&self, index: usize) -> Result<Thing, LookupError> {
        let latency = self.latency;
        let value = tokio::task::spawn_blocking(move || simulate_synchronous_api(latency))
            .await
            .map_err(|e| LookupError::Task(e.to_string()))?;
        tracing::debug!(index, value, "Simulated value");
        Ok(Thing::new(value, format!("thing-{index}")))
    }
}
