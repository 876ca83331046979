//! Tree materialization against deterministic lookups

use std::time::Duration;

use canopy_core::{MaterializeError, MaterializeOptions, Materializer, Strategy};
use canopy_lookup::{LookupError, ScriptedLookup};
use canopy_types::RemoteRecord;
use tokio::time::Instant;

use crate::common::{
    application_ids, id, scenario_lookup, scenario_tree, service_ids, staggered_lookup,
    uniform_lookup,
};

const STRATEGIES: [Strategy; 2] = [Strategy::DepthFirst, Strategy::BreadthFirst];
const LATENCY: Duration = Duration::from_millis(100);

fn materializer(lookup: &ScriptedLookup, strategy: Strategy) -> Materializer<&ScriptedLookup> {
    Materializer::with_options(lookup, MaterializeOptions::default().with_strategy(strategy))
}

#[tokio::test]
async fn scenario_tree_matches_for_both_strategies() {
    for strategy in STRATEGIES {
        let lookup = scenario_lookup();
        let tree = materializer(&lookup, strategy)
            .materialize(id(1), "root")
            .await
            .unwrap();
        assert_eq!(tree, scenario_tree(), "{strategy:?}");
        assert_eq!(lookup.fetch_count(), 4, "{strategy:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn children_follow_related_ids_not_completion_order() {
    // c answers first, a answers last.
    let lookup = ScriptedLookup::from_records([
        RemoteRecord::new(id(1), "root-node", vec![id(10), id(11), id(12)]),
        RemoteRecord::leaf(id(10), "application-node"),
        RemoteRecord::leaf(id(11), "application-node"),
        RemoteRecord::leaf(id(12), "application-node"),
    ])
    .with_delay(id(10), Duration::from_millis(30))
    .with_delay(id(11), Duration::from_millis(20))
    .with_delay(id(12), Duration::from_millis(10));

    for strategy in STRATEGIES {
        let tree = materializer(&lookup, strategy)
            .materialize(id(1), "root")
            .await
            .unwrap();
        let children: Vec<_> = tree.children.iter().map(|child| child.id).collect();
        assert_eq!(children, vec![id(10), id(11), id(12)], "{strategy:?}");
    }
}

#[tokio::test]
async fn leaves_are_not_expanded() {
    let lookup = scenario_lookup();
    let tree = materializer(&lookup, Strategy::DepthFirst)
        .materialize(id(1), "root")
        .await
        .unwrap();

    assert!(tree.children[1].is_leaf());
    assert!(tree.children[0].children[0].is_leaf());

    let mut fetched = lookup.fetched_ids();
    fetched.sort();
    assert_eq!(fetched, vec![id(1), id(10), id(11), id(100)]);
}

#[tokio::test(start_paused = true)]
async fn failure_at_any_depth_fails_the_whole_tree() {
    for strategy in STRATEGIES {
        // A slow sibling is still in flight when service 1101 fails.
        let lookup = uniform_lookup(3, LATENCY)
            .with_failure(id(1101), "connection reset")
            .with_delay(id(1200), Duration::from_secs(60));

        let started = Instant::now();
        let err = materializer(&lookup, strategy)
            .materialize(id(1), "root")
            .await
            .unwrap_err();

        match err {
            MaterializeError::Lookup { id: at, kind, source } => {
                assert_eq!(at, id(1101), "{strategy:?}");
                assert_eq!(kind, "service", "{strategy:?}");
                assert!(matches!(source, LookupError::Unavailable { .. }));
            }
            other => panic!("{strategy:?}: expected Lookup, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(1), "{strategy:?}");
        assert_eq!(lookup.in_flight(), 0, "{strategy:?}: fetches outlived the call");
    }
}

#[tokio::test(start_paused = true)]
async fn root_failure_issues_no_further_fetches() {
    let lookup = scenario_lookup().with_failure(id(1), "down");
    let err = materializer(&lookup, Strategy::DepthFirst)
        .materialize(id(1), "root")
        .await
        .unwrap_err();
    assert!(matches!(err, MaterializeError::Lookup { .. }));
    assert_eq!(lookup.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn each_level_costs_one_latency_not_one_per_sibling() {
    let width = 5;
    for strategy in STRATEGIES {
        let lookup = uniform_lookup(width, LATENCY);
        let started = Instant::now();
        let tree = materializer(&lookup, strategy)
            .materialize(id(1), "root")
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(tree.node_count(), 1 + 5 + 25);
        // Three levels: serial fetching would take 31 latencies.
        assert!(elapsed >= LATENCY * 3, "{strategy:?}: {elapsed:?}");
        assert!(elapsed < LATENCY * 4, "{strategy:?}: {elapsed:?}");
        assert_eq!(lookup.peak_in_flight(), 25, "{strategy:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn strategies_build_identical_trees() {
    let width = 6;
    let depth_first = {
        let lookup = staggered_lookup(width, Duration::from_millis(10));
        materializer(&lookup, Strategy::DepthFirst)
            .materialize(id(1), "root")
            .await
            .unwrap()
    };
    let breadth_first = {
        let lookup = staggered_lookup(width, Duration::from_millis(10));
        materializer(&lookup, Strategy::BreadthFirst)
            .materialize(id(1), "root")
            .await
            .unwrap()
    };

    assert_eq!(depth_first, breadth_first);

    let applications: Vec<_> = depth_first.children.iter().map(|app| app.id).collect();
    assert_eq!(applications, application_ids(width));
    for (i, app) in depth_first.children.iter().enumerate() {
        let services: Vec<_> = app.children.iter().map(|service| service.id).collect();
        assert_eq!(services, service_ids(app.id, i as u64));
    }
}

#[tokio::test]
async fn cyclic_data_hits_the_depth_guard() {
    // A record that lists itself would recurse forever without a limit.
    let lookup = ScriptedLookup::from_records([RemoteRecord::new(
        id(1),
        "root-node",
        vec![id(1)],
    )]);

    for strategy in STRATEGIES {
        let err = materializer(&lookup, strategy)
            .materialize(id(1), "root")
            .await
            .unwrap_err();
        assert!(
            matches!(err, MaterializeError::DepthExceeded { max_depth: 3, .. }),
            "{strategy:?}: {err:?}"
        );
    }
    // Root, then depth 1, then depth 2 is where the guard fires.
    assert_eq!(lookup.fetch_count(), 6);
}

#[tokio::test]
async fn each_call_refetches_everything() {
    let lookup = scenario_lookup();
    let materializer = materializer(&lookup, Strategy::DepthFirst);

    let first = materializer.materialize(id(1), "root").await.unwrap();
    let second = materializer.materialize(id(1), "root").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(lookup.fetch_count(), 8);
}
