//! Convergence benchmarks: how fast each protocol settles a small topology.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use tributary_core::registry::{Algorithm, build_simulator};
use tributary_core::routing::{Distance, NodeId};

/// Builds an eight-node chain through the facade and drains it to
/// quiescence.
fn converge_chain(algorithm: Algorithm) {
    let mut sim = build_simulator(algorithm);
    for index in 0..8u32 {
        sim.update_link(
            &NodeId::numbered(index + 1),
            &NodeId::numbered(index),
            Distance::new(3),
        );
    }
    while !sim.is_quiescent() {
        sim.process_message(0);
    }
    black_box(sim.verify_quiescent_state()).expect("chain must converge");
}

fn chain_convergence(c: &mut Criterion) {
    for algorithm in Algorithm::ALL {
        c.bench_function(&format!("chain_convergence_{algorithm}"), |b| {
            b.iter(|| converge_chain(algorithm));
        });
    }
}

criterion_group!(benches, chain_convergence);
criterion_main!(benches);
