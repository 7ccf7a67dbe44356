//! Randomized mutate-drain-verify soak testing.
//!
//! Each batch applies a random burst of topology mutations, drains the
//! message queue in random FIFO-respecting order while occasionally
//! injecting more churn, and then checks every node against true shortest
//! paths. The workload scales from tiny networks to the configured maximum
//! over the course of the run.

use std::io::{self, Write};

use tracing::debug;

use tributary_core::NetworkModel;
use tributary_core::config::StressConfig;
use tributary_core::registry::Algorithm;
use tributary_core::routing::dfb::DfbNode;
use tributary_core::routing::dpva::DpvaNode;
use tributary_core::routing::mdva::MdvaNode;
use tributary_core::routing::node::{ConvergenceViolation, ProtocolNode};
use tributary_core::routing::spta::SptaNode;
use tributary_core::routing::{Distance, NodeId};

use crate::rng::StressRng;
use crate::scenarios::random_first_index;

/// How a stress run ended.
#[derive(Debug)]
pub enum StressOutcome {
    /// Every batch converged and verified.
    Passed,
    /// A batch converged to wrong distances or got stuck active.
    Failed {
        /// Zero-based batch in which the violation surfaced.
        batch: u32,
        /// The first violation the verifier found.
        violation: ConvergenceViolation,
        /// One state line per node at the moment of failure.
        node_dump: Vec<String>,
    },
}

/// Result of a stress run.
#[derive(Debug)]
pub struct StressReport {
    /// The protocol under test.
    pub algorithm: Algorithm,
    /// Seed the run started from.
    pub seed: u64,
    /// Batches completed, including a failing one.
    pub batches_run: u32,
    /// Pass or failure details.
    pub outcome: StressOutcome,
}

impl StressReport {
    /// Whether the run completed without a violation.
    pub fn passed(&self) -> bool {
        matches!(self.outcome, StressOutcome::Passed)
    }
}

/// Runs the stress workload for one algorithm.
///
/// Progress dots go to `progress`: one dot per hundred batches, a newline
/// every ten thousand. The run stops at the first verification failure.
///
/// # Errors
///
/// - `io::Error` - If writing progress output fails
pub fn run_stress(
    algorithm: Algorithm,
    config: &StressConfig,
    progress: &mut dyn Write,
) -> io::Result<StressReport> {
    match algorithm {
        Algorithm::Dfb => StressRunner::<DfbNode>::new(algorithm, config).run(progress),
        Algorithm::Dpva => StressRunner::<DpvaNode>::new(algorithm, config).run(progress),
        Algorithm::Mdva => StressRunner::<MdvaNode>::new(algorithm, config).run(progress),
        Algorithm::Spta => StressRunner::<SptaNode>::new(algorithm, config).run(progress),
    }
}

struct StressRunner<'a, N: ProtocolNode> {
    algorithm: Algorithm,
    config: &'a StressConfig,
    model: NetworkModel<N>,
    rng: StressRng,
}

impl<'a, N: ProtocolNode> StressRunner<'a, N> {
    fn new(algorithm: Algorithm, config: &'a StressConfig) -> Self {
        Self {
            algorithm,
            config,
            model: NetworkModel::new(),
            rng: StressRng::from_seed(config.seed),
        }
    }

    fn run(mut self, progress: &mut dyn Write) -> io::Result<StressReport> {
        for batch in 0..self.config.batches {
            if let Err(violation) = self.process_batch(batch) {
                let node_dump = self.model.nodes().map(ToString::to_string).collect();
                return Ok(StressReport {
                    algorithm: self.algorithm,
                    seed: self.rng.seed(),
                    batches_run: batch + 1,
                    outcome: StressOutcome::Failed {
                        batch,
                        violation,
                        node_dump,
                    },
                });
            }
            if (batch + 1) % 100 == 0 {
                progress.write_all(b".")?;
                progress.flush()?;
            }
            if (batch + 1) % 10_000 == 0 {
                progress.write_all(b"\n")?;
            }
        }
        Ok(StressReport {
            algorithm: self.algorithm,
            seed: self.rng.seed(),
            batches_run: self.config.batches,
            outcome: StressOutcome::Passed,
        })
    }

    /// One mutate-drain-verify cycle.
    fn process_batch(&mut self, batch: u32) -> Result<(), ConvergenceViolation> {
        let updates =
            self.config.min_updates + self.rng.random_below(self.config.update_span_at(batch));
        debug!("Batch {batch}: {updates} updates");
        for _ in 0..updates {
            self.random_update(batch);
        }
        while !self.model.is_quiescent() {
            // More churn mid-drain with some probability.
            while self.rng.random_bool(self.config.mid_drain_probability) {
                self.random_update(batch);
            }
            // A removal may have just dropped the rest of the queue.
            let Some(index) = random_first_index(self.model.pending(), &mut self.rng) else {
                break;
            };
            self.model.process_message(index);
        }
        self.model.verify_quiescent_state()
    }

    fn random_update(&mut self, batch: u32) {
        let universe = self.config.nodes_at(batch);
        if self.rng.random_bool(self.config.remove_node_probability) {
            let id = NodeId::numbered(self.rng.random_below(universe));
            self.model.remove_node(&id);
            return;
        }
        let (from, to) = loop {
            let from = NodeId::numbered(self.rng.random_below(universe));
            let to = NodeId::numbered(self.rng.random_below(universe));
            if from != to {
                break (from, to);
            }
        };
        if self.rng.random_bool(self.config.remove_link_probability) {
            self.model.remove_link(&from, &to);
        } else {
            let cost = self.config.min_cost + self.rng.random_below(self.config.cost_span_at(batch));
            self.model.update_link(&from, &to, Distance::new(cost));
        }
    }
}
