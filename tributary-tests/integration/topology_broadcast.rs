//! SPTA topology views at network scale

use tributary_core::NetworkModel;
use tributary_core::routing::{Distance, NodeId, SptaNode, SptaPayload};
use tributary_sim::{build_chain, drain_fifo};

fn id(name: &str) -> NodeId {
    NodeId::new(name)
}

fn assert_distance(model: &NetworkModel<SptaNode>, name: &str, expected: Distance) {
    let node = model
        .node(&id(name))
        .unwrap_or_else(|| panic!("node {name} does not exist"));
    node.verify_quiescent_distance(expected).unwrap();
}

#[test]
fn test_topology_spreads_over_multiple_hops() {
    let mut model: NetworkModel<SptaNode> = NetworkModel::new();
    build_chain(&mut model, &[1, 1, 1]);
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();
    assert_distance(&model, "3", Distance::new(3));

    // The head of the chain has learned the far end's edge.
    let display = model.node(&id("3")).unwrap().to_string();
    assert!(display.contains("1: {0: 1}"), "incomplete view: {display}");
}

#[test]
fn test_new_link_gets_a_snapshot_then_deltas() {
    let mut model: NetworkModel<SptaNode> = NetworkModel::new();
    model.update_link(&id("1"), &id("0"), Distance::new(5));
    drain_fifo(&mut model);

    // A fresh incoming link is brought up to date with one full copy.
    model.update_link(&id("2"), &id("1"), Distance::new(1));
    assert_eq!(model.pending().len(), 1);
    assert!(matches!(
        model.pending()[0].payload,
        SptaPayload::Snapshot { .. }
    ));
    drain_fifo(&mut model);
    assert_distance(&model, "2", Distance::new(6));

    // From then on only edge deltas travel.
    model.update_link(&id("1"), &id("0"), Distance::new(7));
    assert_eq!(model.pending().len(), 1);
    match &model.pending()[0].payload {
        SptaPayload::Update { edges } => {
            assert_eq!(edges.len(), 1);
            assert_eq!(edges[0].from, id("1"));
            assert_eq!(edges[0].to, id("0"));
            assert_eq!(edges[0].cost, Distance::new(7));
        }
        other => panic!("expected an update, got {other}"),
    }
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();
    assert_distance(&model, "2", Distance::new(8));
}

#[test]
fn test_removed_leg_drops_the_peers_view() {
    let mut model: NetworkModel<SptaNode> = NetworkModel::new();
    model.update_link(&id("2"), &id("0"), Distance::new(10));
    model.update_link(&id("1"), &id("0"), Distance::new(1));
    model.update_link(&id("2"), &id("1"), Distance::new(1));
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();
    assert_distance(&model, "2", Distance::new(2));

    model.remove_link(&id("2"), &id("1"));
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();
    assert_distance(&model, "2", Distance::new(10));

    // 1's edges left node 2's merged table along with the view.
    let display = model.node(&id("2")).unwrap().to_string();
    assert!(!display.contains("1:"), "stale view survived: {display}");
}
