//! Flat aggregation over independent values

use std::time::Duration;

use canopy_core::{AggregateError, aggregate_total, collect_values};
use canopy_lookup::ScriptedValues;
use tokio::time::Instant;

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[tokio::test(start_paused = true)]
async fn racing_values_still_sum_and_stay_ordered() {
    // Completion order is 2, 5, 3, 7.
    let values = ScriptedValues::new([3, 7, 2, 5]).with_delays([ms(30), ms(40), ms(10), ms(20)]);

    let total = aggregate_total(&values, 4).await.unwrap();
    assert_eq!(total, 17);
    assert_eq!(values.completion_order(), vec![2, 3, 0, 1]);

    let ordered: Vec<i64> = collect_values(&values, 4)
        .await
        .unwrap()
        .into_iter()
        .map(|thing| thing.value)
        .collect();
    assert_eq!(ordered, vec![3, 7, 2, 5]);
}

#[tokio::test(start_paused = true)]
async fn values_are_fetched_concurrently() {
    let count = 20;
    let values = ScriptedValues::new(1..=20).with_delays(vec![ms(100); count]);

    let started = Instant::now();
    let total = aggregate_total(&values, count).await.unwrap();

    assert_eq!(total, 210);
    assert!(started.elapsed() < ms(200), "took {:?}", started.elapsed());
}

#[tokio::test(start_paused = true)]
async fn first_failure_to_land_is_reported() {
    let values = ScriptedValues::new([1, 2, 3, 4])
        .with_delays([ms(10), ms(50), ms(10), ms(5)])
        .with_failure(1, "slow failure")
        .with_failure(3, "fast failure");

    let err = aggregate_total(&values, 4).await.unwrap_err();
    match err {
        AggregateError::Branch { index, width, .. } => {
            assert_eq!(index, 3);
            assert_eq!(width, 4);
        }
        other => panic!("expected Branch, got {other:?}"),
    }
    assert!(err_chain_mentions(&values, 4, "fast failure").await);
}

async fn err_chain_mentions(values: &ScriptedValues, count: usize, needle: &str) -> bool {
    let Err(err) = aggregate_total(values, count).await else {
        return false;
    };
    let mut source: Option<&dyn std::error::Error> = Some(&err);
    while let Some(current) = source {
        if current.to_string().contains(needle) {
            return true;
        }
        source = current.source();
    }
    false
}
