//! MDVA diffusing computations at network scale

use tributary_core::NetworkModel;
use tributary_core::routing::{Distance, LinkFlags, MdvaKind, MdvaNode, NodeId};
use tributary_sim::drain_fifo;

fn id(name: &str) -> NodeId {
    NodeId::new(name)
}

fn assert_distance(model: &NetworkModel<MdvaNode>, name: &str, expected: Distance) {
    let node = model
        .node(&id(name))
        .unwrap_or_else(|| panic!("node {name} does not exist"));
    node.verify_quiescent_distance(expected).unwrap();
}

#[test]
fn test_worsening_cost_runs_a_query_reply_round() {
    let mut model: NetworkModel<MdvaNode> = NetworkModel::new();
    model.update_link(&id("1"), &id("0"), Distance::new(10));
    model.update_link(&id("2"), &id("1"), Distance::new(10));
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();

    // Worsening the only route freezes node 1 until its upstream answers.
    model.update_link(&id("1"), &id("0"), Distance::new(50));
    assert!(model.node(&id("1")).unwrap().is_active());
    assert_eq!(model.pending().len(), 1);
    assert_eq!(model.pending()[0].payload.kind, MdvaKind::Query);
    assert_eq!(model.pending()[0].to, id("2"));

    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();
    assert!(!model.node(&id("1")).unwrap().is_active());
    assert_distance(&model, "1", Distance::new(50));
    assert_distance(&model, "2", Distance::new(60));
}

#[test]
fn test_losing_the_awaited_link_cannot_deadlock() {
    let mut model: NetworkModel<MdvaNode> = NetworkModel::new();
    model.update_link(&id("1"), &id("0"), Distance::new(10));
    model.update_link(&id("2"), &id("1"), Distance::new(10));
    drain_fifo(&mut model);

    model.update_link(&id("1"), &id("0"), Distance::new(50));
    assert!(model.node(&id("1")).unwrap().is_active());

    // The reply node 1 waits for can never arrive: the link to its
    // upstream dies, taking the in-flight query with it. Link loss must
    // count as the reply.
    model.remove_link(&id("1"), &id("2"));
    assert!(model.is_quiescent());
    assert!(!model.node(&id("1")).unwrap().is_active());
    assert!(!model.node(&id("2")).unwrap().is_active());

    model.verify_quiescent_state().unwrap();
    assert_distance(&model, "1", Distance::new(50));
    assert_distance(&model, "2", Distance::INF);
}

#[test]
fn test_mutual_links_settle_without_livelock() {
    let mut model: NetworkModel<MdvaNode> = NetworkModel::new();
    model.update_link(&id("1"), &id("0"), Distance::new(1));
    model.update_link(&id("2"), &id("1"), Distance::new(1));
    model.update_link(&id("1"), &id("2"), Distance::new(1));
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();
    assert_distance(&model, "1", Distance::new(1));
    assert_distance(&model, "2", Distance::new(2));

    // The diffusing computation crosses the 1<->2 cycle and still ends.
    model.update_link(&id("1"), &id("0"), Distance::new(10));
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();
    assert_distance(&model, "1", Distance::new(10));
    assert_distance(&model, "2", Distance::new(11));
}

#[test]
fn test_dag_membership_is_wider_than_the_route() {
    let mut model: NetworkModel<MdvaNode> = NetworkModel::new();
    model.update_link(&id("2"), &id("0"), Distance::new(10));
    model.update_link(&id("1"), &id("0"), Distance::new(1));
    model.update_link(&id("2"), &id("1"), Distance::new(10));
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();

    // Both neighbors report less than node 2's feasible distance, so both
    // links are in the DAG, but only the direct one carries the traffic.
    let two = model.node(&id("2")).unwrap();
    assert_eq!(two.link_flags(&id("0")), LinkFlags::BOLD | LinkFlags::ROUTE);
    assert_eq!(two.link_flags(&id("1")), LinkFlags::BOLD);
}
