//! Cross-protocol convergence on static topologies
//!
//! Every protocol gets the same networks and must settle to the same
//! shortest-path distances, regardless of delivery order.

use tributary_core::NetworkModel;
use tributary_core::routing::{
    DfbNode, Distance, DpvaNode, LinkFlags, MdvaNode, NodeId, ProtocolNode, SptaNode,
};
use tributary_sim::{StressRng, build_chain, build_diamond, drain_fifo, drain_randomly};

fn assert_distance<N: ProtocolNode>(model: &NetworkModel<N>, name: &str, expected: Distance) {
    let node = model
        .node(&NodeId::new(name))
        .unwrap_or_else(|| panic!("node {name} does not exist"));
    node.verify_quiescent_distance(expected).unwrap();
}

fn chain_settles_to_summed_costs<N: ProtocolNode>() {
    let mut model: NetworkModel<N> = NetworkModel::new();
    build_chain(&mut model, &[10, 10]);
    drain_fifo(&mut model);

    model.verify_quiescent_state().unwrap();
    assert_distance(&model, "0", Distance::ZERO);
    assert_distance(&model, "1", Distance::new(10));
    assert_distance(&model, "2", Distance::new(20));
}

#[test]
fn test_chain_settles_dfb() {
    chain_settles_to_summed_costs::<DfbNode>();
}

#[test]
fn test_chain_settles_dpva() {
    chain_settles_to_summed_costs::<DpvaNode>();
}

#[test]
fn test_chain_settles_mdva() {
    chain_settles_to_summed_costs::<MdvaNode>();
}

#[test]
fn test_chain_settles_spta() {
    chain_settles_to_summed_costs::<SptaNode>();
}

fn diamond_routes_over_the_cheap_leg<N: ProtocolNode>() {
    let mut model: NetworkModel<N> = NetworkModel::new();
    build_diamond(&mut model);
    drain_fifo(&mut model);

    model.verify_quiescent_state().unwrap();
    assert_distance(&model, "3", Distance::new(2));
    assert_distance(&model, "4", Distance::new(3));

    let three = model.node(&NodeId::new("3")).unwrap();
    assert!(three.link_flags(&NodeId::new("1")).contains(LinkFlags::ROUTE));
    assert!(!three.link_flags(&NodeId::new("2")).contains(LinkFlags::ROUTE));
}

#[test]
fn test_diamond_routes_dfb() {
    diamond_routes_over_the_cheap_leg::<DfbNode>();
}

#[test]
fn test_diamond_routes_dpva() {
    diamond_routes_over_the_cheap_leg::<DpvaNode>();
}

#[test]
fn test_diamond_routes_mdva() {
    diamond_routes_over_the_cheap_leg::<MdvaNode>();
}

#[test]
fn test_diamond_routes_spta() {
    diamond_routes_over_the_cheap_leg::<SptaNode>();
}

fn random_drain_converges_like_fifo<N: ProtocolNode>() {
    let mut fifo: NetworkModel<N> = NetworkModel::new();
    build_diamond(&mut fifo);
    drain_fifo(&mut fifo);
    fifo.verify_quiescent_state().unwrap();

    // A shuffled FIFO-respecting order must reach the same verified state.
    let mut shuffled: NetworkModel<N> = NetworkModel::new();
    let mut rng = StressRng::from_seed(97);
    build_diamond(&mut shuffled);
    drain_randomly(&mut shuffled, &mut rng);
    shuffled.verify_quiescent_state().unwrap();
}

#[test]
fn test_random_drain_dfb() {
    random_drain_converges_like_fifo::<DfbNode>();
}

#[test]
fn test_random_drain_dpva() {
    random_drain_converges_like_fifo::<DpvaNode>();
}

#[test]
fn test_random_drain_mdva() {
    random_drain_converges_like_fifo::<MdvaNode>();
}

#[test]
fn test_random_drain_spta() {
    random_drain_converges_like_fifo::<SptaNode>();
}
