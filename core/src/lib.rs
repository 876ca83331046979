//! Concurrent tree materialization for Canopy.
//!
//! Everything here is built on a single combinator, [`fan_out`]: start one
//! async operation per input, poll them all concurrently, and join the results
//! back in input order, failing as a whole on the first error observed.
//!
//! - [`Materializer`] applies it recursively to turn a root id into a complete
//!   [`Node`](canopy_types::Node) tree.
//! - [`aggregate_total`] applies it once, over independent values, and sums.

mod aggregate;
mod fan_out;
mod materialize;

pub use aggregate::{AggregateError, DEFAULT_AGGREGATE_COUNT, aggregate_total, collect_values};
pub use fan_out::{FanOutError, fan_out};
pub use materialize::{
    MaterializeError, MaterializeOptions, Materializer, Strategy, UnknownStrategy,
};
