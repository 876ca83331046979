//! Deterministic in-memory lookups.
//!
//! Records are keyed by id and returned verbatim, optionally after a per-id
//! delay or replaced by an injected failure. Every fetch is recorded so callers
//! can check what was asked for and how many fetches were in flight at once.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use canopy_types::{NodeId, RemoteRecord};
use thiserror::Error;

use crate::{LookupError, RemoteLookup, Thing, ValueSource};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fixture {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Counts concurrent fetches. Decrements on drop so cancelled fetches are
/// accounted for too.
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self)
    }
}

struct InFlightGuard<'a>(&'a InFlight);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct ScriptedLookup {
    records: HashMap<NodeId, RemoteRecord>,
    delays: HashMap<NodeId, Duration>,
    failures: HashMap<NodeId, String>,
    fetched: Mutex<Vec<NodeId>>,
    in_flight: InFlight,
}

impl ScriptedLookup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RemoteRecord>,
    {
        records
            .into_iter()
            .fold(Self::new(), |lookup, record| lookup.with_record(record))
    }

    /// Load records from a JSON array of `{id, type, relatedItemIds}` objects.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let records: Vec<RemoteRecord> =
            serde_json::from_str(&content).map_err(|source| FixtureError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), records = records.len(), "Loaded fixture");
        Ok(Self::from_records(records))
    }

    /// Later records for the same id replace earlier ones.
    #[must_use]
    pub fn with_record(mut self, record: RemoteRecord) -> Self {
        self.records.insert(record.id, record);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, id: NodeId, delay: Duration) -> Self {
        self.delays.insert(id, delay);
        self
    }

    #[must_use]
    pub fn with_failure(mut self, id: NodeId, reason: impl Into<String>) -> Self {
        self.failures.insert(id, reason.into());
        self
    }

    /// Ids in the order their fetches started.
    #[must_use]
    pub fn fetched_ids(&self) -> Vec<NodeId> {
        self.fetched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Highest number of fetches that were in flight at the same time.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.in_flight.peak.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.current.load(Ordering::SeqCst)
    }
}

impl RemoteLookup for ScriptedLookup {
    async fn fetch(&self, id: NodeId, kind: &str) -> Result<RemoteRecord, LookupError> {
        self.fetched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id);
        let _guard = self.in_flight.enter();

        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }

        if let Some(reason) = self.failures.get(&id) {
            return Err(LookupError::unavailable(id, kind, reason.clone()));
        }

        self.records
            .get(&id)
            .cloned()
            .ok_or_else(|| LookupError::unavailable(id, kind, "no such record"))
    }
}

/// Deterministic value source: index `i` yields `values[i]` after `delays[i]`.
#[derive(Debug, Default)]
pub struct ScriptedValues {
    values: Vec<i64>,
    delays: Vec<Duration>,
    failures: HashMap<usize, String>,
    completed: Mutex<Vec<usize>>,
}

impl ScriptedValues {
    pub fn new(values: impl IntoIterator<Item = i64>) -> Self {
        Self {
            values: values.into_iter().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delays(mut self, delays: impl IntoIterator<Item = Duration>) -> Self {
        self.delays = delays.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_failure(mut self, index: usize, reason: impl Into<String>) -> Self {
        self.failures.insert(index, reason.into());
        self
    }

    /// Indices in the order their fetches completed successfully.
    #[must_use]
    pub fn completion_order(&self) -> Vec<usize> {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ValueSource for ScriptedValues {
    async fn fetch_value(&self, index: usize) -> Result<Thing, LookupError> {
        if let Some(delay) = self.delays.get(index) {
            tokio::time::sleep(*delay).await;
        }

        if let Some(reason) = self.failures.get(&index) {
            return Err(LookupError::ValueUnavailable {
                index,
                reason: reason.clone(),
            });
        }

        let value = *self
            .values
            .get(index)
            .ok_or_else(|| LookupError::ValueUnavailable {
                index,
                reason: "no such value".to_string(),
            })?;

        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(index);
        Ok(Thing::new(value, format!("thing-{index}")))
    }
}
