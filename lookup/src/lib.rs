//! Clients for the remote graph service.
//!
//! The core never talks to the network directly: it is handed something that
//! implements [`RemoteLookup`] (for tree materialization) or [`ValueSource`]
//! (for flat aggregation). This crate provides three families of adapters:
//!
//! - [`SimulatedLookup`] / [`SimulatedValues`]: randomized stand-ins with a fixed
//!   latency, for running the binary without a backing service.
//! - [`HttpLookup`]: JSON over HTTP via `reqwest`.
//! - [`ScriptedLookup`] / [`ScriptedValues`]: deterministic in-memory data with
//!   injectable delays and failures, used by tests and the `fixture` backend.
//!
//! None of the adapters retry. A failed fetch is reported once and the caller
//! decides what to do with it.

mod http;
mod scripted;
mod simulated;

use std::future::Future;
use std::sync::Arc;

use canopy_types::{NodeId, RemoteRecord};
use serde::{Deserialize, Serialize};

pub use http::HttpLookup;
pub use scripted::{FixtureError, ScriptedLookup, ScriptedValues};
pub use simulated::{SimulatedLookup, SimulatedValues};

/// Fetches one record of the remote graph.
///
/// On success the returned record's `id` equals the requested id and its
/// `kind` is derived from the requested type label. Implementations must
/// complete after a bounded delay.
pub trait RemoteLookup: Send + Sync {
    fn fetch(
        &self,
        id: NodeId,
        kind: &str,
    ) -> impl Future<Output = Result<RemoteRecord, LookupError>> + Send;
}

impl<L: RemoteLookup + ?Sized> RemoteLookup for Arc<L> {
    fn fetch(
        &self,
        id: NodeId,
        kind: &str,
    ) -> impl Future<Output = Result<RemoteRecord, LookupError>> + Send {
        (**self).fetch(id, kind)
    }
}

impl<L: RemoteLookup + ?Sized> RemoteLookup for &L {
    fn fetch(
        &self,
        id: NodeId,
        kind: &str,
    ) -> impl Future<Output = Result<RemoteRecord, LookupError>> + Send {
        (**self).fetch(id, kind)
    }
}

/// A single independently fetched value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thing {
    pub value: i64,
    pub name: String,
}

impl Thing {
    #[must_use]
    pub fn new(value: i64, name: impl Into<String>) -> Self {
        Self {
            value,
            name: name.into(),
        }
    }
}

/// Fetches independent, non-hierarchical values by position.
pub trait ValueSource: Send + Sync {
    fn fetch_value(&self, index: usize) -> impl Future<Output = Result<Thing, LookupError>> + Send;
}

impl<V: ValueSource + ?Sized> ValueSource for Arc<V> {
    fn fetch_value(&self, index: usize) -> impl Future<Output = Result<Thing, LookupError>> + Send {
        (**self).fetch_value(index)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("lookup of {kind} {id} failed: {reason}")]
    Unavailable {
        id: NodeId,
        kind: String,
        reason: String,
    },
    #[error("request for {kind} {id} failed")]
    Request {
        id: NodeId,
        kind: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("lookup of {kind} {id} returned HTTP {status}")]
    Status {
        id: NodeId,
        kind: String,
        status: reqwest::StatusCode,
    },
    #[error("requested record {requested} but service returned {returned}")]
    IdMismatch { requested: NodeId, returned: NodeId },
    #[error("value {index} unavailable: {reason}")]
    ValueUnavailable { index: usize, reason: String },
    #[error("blocking lookup task failed: {0}")]
    Task(String),
}

impl LookupError {
    pub fn unavailable(id: NodeId, kind: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            id,
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}

/// Runtime-selected lookup backend.
///
/// [`RemoteLookup`] is not object safe, so the binary picks one of the
/// concrete adapters through this enum instead of a trait object.
#[derive(Debug)]
pub enum LookupBackend {
    Simulated(SimulatedLookup),
    Http(HttpLookup),
    Fixture(ScriptedLookup),
}

impl RemoteLookup for LookupBackend {
    async fn fetch(&self, id: NodeId, kind: &str) -> Result<RemoteRecord, LookupError> {
        match self {
            Self::Simulated(lookup) => lookup.fetch(id, kind).await,
            Self::Http(lookup) => lookup.fetch(id, kind).await,
            Self::Fixture(lookup) => lookup.fetch(id, kind).await,
        }
    }
}
