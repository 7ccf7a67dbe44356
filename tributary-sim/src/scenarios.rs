//! Topology builders and drain strategies shared by tests and benchmarks.

use tributary_core::NetworkModel;
use tributary_core::routing::message::{Message, Payload};
use tributary_core::routing::{Distance, NodeId, ProtocolNode};

use crate::rng::StressRng;

/// Delivers pending messages oldest-first until the network is quiescent.
///
/// The oldest pending message is always first over its link, so this never
/// violates the FIFO delivery contract.
pub fn drain_fifo<N: ProtocolNode>(model: &mut NetworkModel<N>) {
    while !model.is_quiescent() {
        model.process_message(0);
    }
}

/// Delivers pending messages in random FIFO-respecting order until the
/// network is quiescent.
pub fn drain_randomly<N: ProtocolNode>(model: &mut NetworkModel<N>, rng: &mut StressRng) {
    while let Some(index) = random_first_index(model.pending(), rng) {
        model.process_message(index);
    }
}

/// Picks a uniformly random deliverable message, `None` when nothing is
/// pending.
pub fn random_first_index<P: Payload>(
    pending: &[Message<P>],
    rng: &mut StressRng,
) -> Option<usize> {
    let eligible: Vec<usize> = pending
        .iter()
        .enumerate()
        .filter(|(_, message)| message.first_over_link)
        .map(|(index, _)| index)
        .collect();
    if eligible.is_empty() {
        None
    } else {
        Some(eligible[rng.random_index(eligible.len())])
    }
}

/// Builds a one-way chain toward the destination.
///
/// `costs[i]` is the cost of the link from node `i + 1` down to node `i`,
/// so `&[10, 10]` produces `2 -> 1 -> 0` with both links at cost 10.
pub fn build_chain<N: ProtocolNode>(model: &mut NetworkModel<N>, costs: &[u32]) {
    for (index, cost) in costs.iter().enumerate() {
        let from = NodeId::numbered(index as u32 + 1);
        let to = NodeId::numbered(index as u32);
        model.update_link(&from, &to, Distance::new(*cost));
    }
}

/// Builds a five-node diamond with one cheap and one expensive path.
///
/// Node 4 reaches the destination over `4 -> 3 -> 1 -> 0` at cost 3; the
/// alternative `3 -> 2 -> 0` leg costs 11. Removing the link `1 -> 0`
/// forces everything over the expensive leg.
pub fn build_diamond<N: ProtocolNode>(model: &mut NetworkModel<N>) {
    let cheap = Distance::new(1);
    model.update_link(&NodeId::numbered(1), &NodeId::numbered(0), cheap);
    model.update_link(&NodeId::numbered(2), &NodeId::numbered(0), Distance::new(10));
    model.update_link(&NodeId::numbered(3), &NodeId::numbered(1), cheap);
    model.update_link(&NodeId::numbered(3), &NodeId::numbered(2), cheap);
    model.update_link(&NodeId::numbered(4), &NodeId::numbered(3), cheap);
}

#[cfg(test)]
mod tests {
    use tributary_core::routing::DfbNode;

    use super::*;

    #[test]
    fn test_chain_converges_to_summed_costs() {
        let mut model: NetworkModel<DfbNode> = NetworkModel::new();
        build_chain(&mut model, &[10, 10]);
        drain_fifo(&mut model);

        assert!(model.verify_quiescent_state().is_ok());
        let two = model.node(&NodeId::numbered(2)).unwrap();
        assert!(two.verify_quiescent_distance(Distance::new(20)).is_ok());
        let one = model.node(&NodeId::numbered(1)).unwrap();
        assert!(one.verify_quiescent_distance(Distance::new(10)).is_ok());
    }

    #[test]
    fn test_random_drain_is_deterministic_per_seed() {
        let run = |seed: u64| {
            let mut model: NetworkModel<DfbNode> = NetworkModel::new();
            let mut rng = StressRng::from_seed(seed);
            build_diamond(&mut model);
            drain_randomly(&mut model, &mut rng);
            assert!(model.verify_quiescent_state().is_ok());
            model.nodes().map(ToString::to_string).collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn test_random_first_index_only_picks_deliverable_messages() {
        let mut model: NetworkModel<DfbNode> = NetworkModel::new();
        build_diamond(&mut model);
        let mut rng = StressRng::from_seed(5);
        while let Some(index) = random_first_index(model.pending(), &mut rng) {
            assert!(model.pending()[index].first_over_link);
            model.process_message(index);
        }
        assert!(model.is_quiescent());
    }
}
