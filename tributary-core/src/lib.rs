//! Tributary Core - deterministic routing-protocol simulation engine
//!
//! This crate provides the building blocks for simulating distributed
//! routing protocols over a dynamic directed graph: node identity and
//! distance arithmetic, the message/node contracts, four protocol state
//! machines, the network model with its quiescence verifier, and the
//! algorithm registry.

pub mod config;
pub mod model;
pub mod registry;
pub mod routing;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::StressConfig;
pub use model::NetworkModel;
pub use registry::{Algorithm, PendingMessage, Simulator, build_simulator, switch_algorithm};
pub use routing::{ConvergenceViolation, Distance, LinkFlags, NodeId, ProtocolNode};

/// Core errors that can bubble up from any Tributary subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TributaryError {
    #[error("Unknown algorithm: {name}")]
    UnknownAlgorithm { name: String },

    #[error("Convergence check failed: {0}")]
    Convergence(#[from] ConvergenceViolation),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TributaryError {
    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(self, TributaryError::UnknownAlgorithm { .. })
    }
}

pub type Result<T> = std::result::Result<T, TributaryError>;
