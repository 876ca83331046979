//! Flat aggregation: fetch independent values concurrently, then reduce.

use std::time::Instant;

use canopy_lookup::{LookupError, Thing, ValueSource};

use crate::fan_out::{FanOutError, fan_out};

/// Number of values fetched when the caller does not say otherwise.
pub const DEFAULT_AGGREGATE_COUNT: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("aggregation failed at value {index} of {width}")]
    Branch {
        index: usize,
        width: usize,
        #[source]
        source: LookupError,
    },
    #[error("sum of {count} values overflows")]
    Overflow { count: usize },
}

impl From<FanOutError<LookupError>> for AggregateError {
    fn from(err: FanOutError<LookupError>) -> Self {
        Self::Branch {
            index: err.index,
            width: err.width,
            source: err.source,
        }
    }
}

/// Fetch `count` values concurrently, in index order.
pub async fn collect_values<V>(source: &V, count: usize) -> Result<Vec<Thing>, AggregateError>
where
    V: ValueSource + ?Sized,
{
    Ok(fan_out(0..count, |index| source.fetch_value(index)).await?)
}

/// Fetch `count` values concurrently and sum them.
pub async fn aggregate_total<V>(source: &V, count: usize) -> Result<i64, AggregateError>
where
    V: ValueSource + ?Sized,
{
    let started = Instant::now();
    let things = collect_values(source, count).await?;
    let total = things
        .iter()
        .try_fold(0_i64, |total, thing| total.checked_add(thing.value))
        .ok_or(AggregateError::Overflow { count })?;

    tracing::info!(
        count,
        total,
        elapsed_ms = started.elapsed().as_millis(),
        "Aggregated values"
    );
    Ok(total)
}
