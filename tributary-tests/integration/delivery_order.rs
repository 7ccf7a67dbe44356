//! Per-link FIFO delivery under interleaving and random churn

use std::collections::BTreeSet;

use proptest::prelude::*;
use tributary_core::{Algorithm, Distance, NodeId, PendingMessage, build_simulator};

/// Exactly the oldest pending message of every directed link may carry the
/// first-over-link marker.
fn assert_first_markers(pending: &[PendingMessage]) {
    let mut seen: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
    for message in pending {
        let oldest = seen.insert((message.from.clone(), message.to.clone()));
        assert_eq!(
            message.first_over_link, oldest,
            "message {}->{} carries the wrong first-over-link marker",
            message.from, message.to
        );
    }
}

#[test]
fn test_links_deliver_independently() {
    let mut sim = build_simulator(Algorithm::Dfb);
    sim.update_link(&NodeId::new("1"), &NodeId::new("0"), Distance::new(5));
    sim.update_link(&NodeId::new("2"), &NodeId::new("0"), Distance::new(7));

    // Two greetings over two different links; either may be delivered first.
    let pending = sim.pending_messages();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|message| message.first_over_link));

    sim.process_message(1);
    while !sim.is_quiescent() {
        sim.process_message(0);
    }
    sim.verify_quiescent_state().unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Arbitrary interleavings of link updates, removals, and partial
    /// drains never break the per-link markers, and the network always
    /// settles onto true shortest paths afterwards.
    #[test]
    fn test_random_churn_keeps_markers_and_converges(
        algo_index in 0usize..4,
        ops in prop::collection::vec((0u32..5, 0u32..5, 0u32..12, 0usize..6), 1..40),
    ) {
        let algorithm = Algorithm::ALL[algo_index];
        let mut sim = build_simulator(algorithm);
        for (from, to, cost, deliveries) in ops {
            if from == to {
                continue;
            }
            let from = NodeId::numbered(from);
            let to = NodeId::numbered(to);
            if cost == 0 {
                sim.remove_link(&from, &to);
            } else {
                sim.update_link(&from, &to, Distance::new(cost));
            }
            assert_first_markers(&sim.pending_messages());

            for _ in 0..deliveries {
                if sim.is_quiescent() {
                    break;
                }
                sim.process_message(0);
                assert_first_markers(&sim.pending_messages());
            }
        }
        while !sim.is_quiescent() {
            sim.process_message(0);
        }
        prop_assert!(
            sim.verify_quiescent_state().is_ok(),
            "{algorithm} settled on wrong distances"
        );
    }
}
