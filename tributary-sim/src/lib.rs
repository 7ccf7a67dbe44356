//! Tributary Simulation Harness - randomized soak testing for routing protocols
//!
//! This crate drives the deterministic network engine from `tributary-core`
//! with randomized workloads: batches of topology mutations, randomized
//! FIFO-respecting message draining with mid-drain churn, and a
//! shortest-path verification after every batch. The same seed always
//! produces the same run, so any reported failure is replayable.

pub mod rng;
pub mod scenarios;
pub mod stress;

pub use rng::StressRng;
pub use scenarios::{build_chain, build_diamond, drain_fifo, drain_randomly, random_first_index};
pub use stress::{StressOutcome, StressReport, run_stress};
