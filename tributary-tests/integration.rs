//! Integration tests for Tributary
//!
//! These tests drive whole simulated networks through the public API:
//! topology churn, FIFO-respecting message draining, and shortest-path
//! verification across all four routing protocols.

#[path = "integration/convergence.rs"]
mod convergence;

#[path = "integration/churn.rs"]
mod churn;

#[path = "integration/delivery_order.rs"]
mod delivery_order;

#[path = "integration/diffusing.rs"]
mod diffusing;

#[path = "integration/topology_broadcast.rs"]
mod topology_broadcast;

#[path = "integration/stress_soak.rs"]
mod stress_soak;
