//! Shared test utilities and fixtures
//!
//! Deterministic lookups shaped like the remote graph: a root, its
//! applications, and their services.

#![allow(dead_code)]

use std::time::Duration;

use canopy_lookup::ScriptedLookup;
use canopy_types::{Node, NodeId, RemoteRecord};

pub fn id(value: u64) -> NodeId {
    NodeId::new(value)
}

/// Root 1 with applications 10 and 11; 10 owns service 100, 11 is a leaf.
pub fn scenario_records() -> Vec<RemoteRecord> {
    vec![
        RemoteRecord::new(id(1), "root-node", vec![id(10), id(11)]),
        RemoteRecord::new(id(10), "application-node", vec![id(100)]),
        RemoteRecord::leaf(id(11), "application-node"),
        RemoteRecord::leaf(id(100), "service-node"),
    ]
}

pub fn scenario_lookup() -> ScriptedLookup {
    ScriptedLookup::from_records(scenario_records())
}

pub fn scenario_tree() -> Node {
    Node::new(
        id(1),
        "root-node",
        vec![
            Node::new(
                id(10),
                "application-node",
                vec![Node::leaf(id(100), "service-node")],
            ),
            Node::leaf(id(11), "application-node"),
        ],
    )
}

pub fn application_ids(width: u64) -> Vec<NodeId> {
    (0..width).map(|i| id(10 + i)).collect()
}

pub fn service_ids(application: NodeId, width: u64) -> Vec<NodeId> {
    (0..width)
        .map(|i| id(application.value() * 100 + i))
        .collect()
}

/// Three levels, `width` children per branch node, `latency` per fetch.
pub fn uniform_lookup(width: u64, latency: Duration) -> ScriptedLookup {
    let mut lookup = ScriptedLookup::new()
        .with_record(RemoteRecord::new(id(1), "root-node", application_ids(width)))
        .with_delay(id(1), latency);

    for application in application_ids(width) {
        let services = service_ids(application, width);
        lookup = lookup
            .with_record(RemoteRecord::new(
                application,
                "application-node",
                services.clone(),
            ))
            .with_delay(application, latency);
        for service in services {
            lookup = lookup
                .with_record(RemoteRecord::leaf(service, "service-node"))
                .with_delay(service, latency);
        }
    }
    lookup
}

/// Like [`uniform_lookup`], but later siblings answer sooner, and the number of
/// services varies per application (the first application has none).
pub fn staggered_lookup(width: u64, step: Duration) -> ScriptedLookup {
    let applications = application_ids(width);
    let mut lookup = ScriptedLookup::new()
        .with_record(RemoteRecord::new(id(1), "root-node", applications.clone()))
        .with_delay(id(1), step);

    for (i, application) in applications.into_iter().enumerate() {
        let services = service_ids(application, i as u64);
        let sibling_delay = step * (width as u32 - i as u32);
        lookup = lookup
            .with_record(RemoteRecord::new(
                application,
                "application-node",
                services.clone(),
            ))
            .with_delay(application, sibling_delay);
        for (j, service) in services.into_iter().enumerate() {
            lookup = lookup
                .with_record(RemoteRecord::leaf(service, "service-node"))
                .with_delay(service, step * (i as u32 + 1 - j as u32));
        }
    }
    lookup
}
