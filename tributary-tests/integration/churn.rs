//! Convergence under topology churn
//!
//! Links and nodes disappear, costs worsen, and traffic is cut down
//! mid-flight; every protocol has to settle back onto true shortest paths.

use tributary_core::NetworkModel;
use tributary_core::routing::{
    DfbNode, Distance, DpvaNode, LinkFlags, MdvaNode, NodeId, ProtocolNode, SptaNode,
};
use tributary_sim::{build_chain, build_diamond, drain_fifo};

fn id(name: &str) -> NodeId {
    NodeId::new(name)
}

fn assert_distance<N: ProtocolNode>(model: &NetworkModel<N>, name: &str, expected: Distance) {
    let node = model
        .node(&id(name))
        .unwrap_or_else(|| panic!("node {name} does not exist"));
    node.verify_quiescent_distance(expected).unwrap();
}

fn reroutes_after_losing_the_cheap_leg<N: ProtocolNode>() {
    let mut model: NetworkModel<N> = NetworkModel::new();
    build_diamond(&mut model);
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();

    model.remove_link(&id("1"), &id("0"));
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();

    assert_distance(&model, "1", Distance::INF);
    assert_distance(&model, "3", Distance::new(11));
    assert_distance(&model, "4", Distance::new(12));

    let three = model.node(&id("3")).unwrap();
    assert!(three.link_flags(&id("2")).contains(LinkFlags::ROUTE));
    assert!(!three.link_flags(&id("1")).contains(LinkFlags::ROUTE));
}

#[test]
fn test_reroute_dfb() {
    reroutes_after_losing_the_cheap_leg::<DfbNode>();
}

#[test]
fn test_reroute_dpva() {
    reroutes_after_losing_the_cheap_leg::<DpvaNode>();
}

#[test]
fn test_reroute_mdva() {
    reroutes_after_losing_the_cheap_leg::<MdvaNode>();
}

#[test]
fn test_reroute_spta() {
    reroutes_after_losing_the_cheap_leg::<SptaNode>();
}

fn partition_marks_everything_unreachable<N: ProtocolNode>() {
    let mut model: NetworkModel<N> = NetworkModel::new();
    build_chain(&mut model, &[10, 10]);
    drain_fifo(&mut model);

    model.remove_link(&id("1"), &id("0"));
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();

    assert_distance(&model, "1", Distance::INF);
    assert_distance(&model, "2", Distance::INF);
}

#[test]
fn test_partition_dfb() {
    partition_marks_everything_unreachable::<DfbNode>();
}

#[test]
fn test_partition_dpva() {
    partition_marks_everything_unreachable::<DpvaNode>();
}

#[test]
fn test_partition_mdva() {
    partition_marks_everything_unreachable::<MdvaNode>();
}

#[test]
fn test_partition_spta() {
    partition_marks_everything_unreachable::<SptaNode>();
}

fn in_flight_traffic_dies_with_the_link<N: ProtocolNode>() {
    let mut model: NetworkModel<N> = NetworkModel::new();
    build_diamond(&mut model);

    // Deliver only part of the initial traffic, then cut the cheap leg
    // while the rest is still in flight.
    for _ in 0..2 {
        if !model.is_quiescent() {
            model.process_message(0);
        }
    }
    model.remove_link(&id("1"), &id("0"));
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();
    assert_distance(&model, "3", Distance::new(11));
}

#[test]
fn test_mid_flight_removal_dfb() {
    in_flight_traffic_dies_with_the_link::<DfbNode>();
}

#[test]
fn test_mid_flight_removal_dpva() {
    in_flight_traffic_dies_with_the_link::<DpvaNode>();
}

#[test]
fn test_mid_flight_removal_mdva() {
    in_flight_traffic_dies_with_the_link::<MdvaNode>();
}

#[test]
fn test_mid_flight_removal_spta() {
    in_flight_traffic_dies_with_the_link::<SptaNode>();
}

fn node_removal_cuts_its_subtree<N: ProtocolNode>() {
    let mut model: NetworkModel<N> = NetworkModel::new();
    build_diamond(&mut model);
    drain_fifo(&mut model);

    model.remove_node(&id("3"));
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();

    assert!(model.node(&id("3")).is_none());
    assert_eq!(model.link_cost(&id("4"), &id("3")), Distance::INF);
    assert_distance(&model, "1", Distance::new(1));
    assert_distance(&model, "2", Distance::new(10));
    assert_distance(&model, "4", Distance::INF);
}

#[test]
fn test_node_removal_dfb() {
    node_removal_cuts_its_subtree::<DfbNode>();
}

#[test]
fn test_node_removal_dpva() {
    node_removal_cuts_its_subtree::<DpvaNode>();
}

#[test]
fn test_node_removal_mdva() {
    node_removal_cuts_its_subtree::<MdvaNode>();
}

#[test]
fn test_node_removal_spta() {
    node_removal_cuts_its_subtree::<SptaNode>();
}

fn cost_increase_moves_the_route<N: ProtocolNode>() {
    let mut model: NetworkModel<N> = NetworkModel::new();
    model.update_link(&id("1"), &id("0"), Distance::new(2));
    model.update_link(&id("2"), &id("0"), Distance::new(5));
    model.update_link(&id("3"), &id("1"), Distance::new(1));
    model.update_link(&id("3"), &id("2"), Distance::new(1));
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();
    assert_distance(&model, "3", Distance::new(3));

    model.update_link(&id("1"), &id("0"), Distance::new(50));
    drain_fifo(&mut model);
    model.verify_quiescent_state().unwrap();

    assert_distance(&model, "3", Distance::new(6));
    let three = model.node(&id("3")).unwrap();
    assert!(three.link_flags(&id("2")).contains(LinkFlags::ROUTE));
    assert!(!three.link_flags(&id("1")).contains(LinkFlags::ROUTE));
}

#[test]
fn test_cost_increase_dfb() {
    cost_increase_moves_the_route::<DfbNode>();
}

#[test]
fn test_cost_increase_dpva() {
    cost_increase_moves_the_route::<DpvaNode>();
}

#[test]
fn test_cost_increase_mdva() {
    cost_increase_moves_the_route::<MdvaNode>();
}

#[test]
fn test_cost_increase_spta() {
    cost_increase_moves_the_route::<SptaNode>();
}
