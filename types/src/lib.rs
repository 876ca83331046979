//! Core domain types for Canopy.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies:
//! the flat records the remote graph service returns, the tree nodes built from them,
//! and the level progression that names each depth.

mod ids;
mod level;
mod node;
mod record;

pub use ids::NodeId;
pub use level::{DEFAULT_LEVELS, EmptyProgressionError, LevelProgression};
pub use node::Node;
pub use record::{RemoteRecord, record_kind};
