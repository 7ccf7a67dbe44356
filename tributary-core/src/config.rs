//! Centralized configuration for Tributary.
//!
//! All stress-harness tunables live here so the workload shape is not
//! hard-coded into the harness itself.

/// Stress-harness workload configuration.
///
/// The node count, per-batch update count, and link costs all scale
/// linearly from their minimum to their maximum over the course of the
/// run, so early batches exercise tiny networks and late batches large
/// ones. Supports environment variable overrides for runtime tuning.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Seed for the deterministic random generator
    pub seed: u64,
    /// Total number of mutate-drain-verify batches
    pub batches: u32,
    /// Node-universe size at the start of the run
    pub min_nodes: u32,
    /// Node-universe size at the end of the run
    pub max_nodes: u32,
    /// Topology mutations per batch at the start of the run
    pub min_updates: u32,
    /// Topology mutations per batch at the end of the run
    pub max_updates: u32,
    /// Smallest random link cost
    pub min_cost: u32,
    /// Largest random link cost at the end of the run
    pub max_cost: u32,
    /// Probability that a mutation removes a link
    pub remove_link_probability: f64,
    /// Probability that a mutation removes a node
    pub remove_node_probability: f64,
    /// Probability of injecting another mutation between deliveries
    pub mid_drain_probability: f64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            batches: 100_000,
            min_nodes: 2,
            max_nodes: 20,
            min_updates: 1,
            max_updates: 20,
            min_cost: 1,
            max_cost: 100, // 19 nodes x 100 still stays under the DFB ceiling
            remove_link_probability: 0.25,
            remove_node_probability: 0.01,
            mid_drain_probability: 0.25,
        }
    }
}

impl StressConfig {
    /// Creates a configuration small enough for unit and CI tests while
    /// still reaching the full node universe by the end of the run.
    pub fn quick() -> Self {
        Self {
            batches: 400,
            ..Default::default()
        }
    }

    /// Creates configuration with environment variable overrides.
    ///
    /// `TRIBUTARY_STRESS_SEED` and `TRIBUTARY_STRESS_BATCHES` override the
    /// defaults; unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(seed) = std::env::var("TRIBUTARY_STRESS_SEED") {
            if let Ok(value) = seed.parse::<u64>() {
                config.seed = value;
            }
        }

        if let Ok(batches) = std::env::var("TRIBUTARY_STRESS_BATCHES") {
            if let Ok(value) = batches.parse::<u32>() {
                config.batches = value;
            }
        }

        config
    }

    /// Node-universe size for a given batch, scaled over the run.
    pub fn nodes_at(&self, batch: u32) -> u32 {
        self.min_nodes + (self.max_nodes - self.min_nodes) * batch / self.batches
    }

    /// Upper bound (exclusive span) of mutations for a given batch.
    pub fn update_span_at(&self, batch: u32) -> u32 {
        (self.max_updates - self.min_updates) * batch / self.batches + 1
    }

    /// Upper bound (exclusive span) of link costs for a given batch.
    pub fn cost_span_at(&self, batch: u32) -> u32 {
        (self.max_cost - self.min_cost) * batch / self.batches + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = StressConfig::default();

        assert_eq!(config.seed, 1);
        assert_eq!(config.batches, 100_000);
        assert_eq!(config.min_nodes, 2);
        assert_eq!(config.max_nodes, 20);
        assert_eq!(config.min_cost, 1);
        assert_eq!(config.max_cost, 100);
        assert!(config.remove_link_probability > config.remove_node_probability);
    }

    #[test]
    fn test_workload_scales_over_the_run() {
        let config = StressConfig::default();

        assert_eq!(config.nodes_at(0), 2);
        assert_eq!(config.nodes_at(config.batches / 2), 11);
        assert_eq!(config.nodes_at(config.batches), 20);

        assert_eq!(config.update_span_at(0), 1);
        assert_eq!(config.update_span_at(config.batches), 20);

        assert_eq!(config.cost_span_at(0), 1);
        assert_eq!(config.cost_span_at(config.batches), 100);
    }

    #[test]
    fn test_quick_config_reaches_the_full_universe() {
        let config = StressConfig::quick();
        assert!(config.batches < StressConfig::default().batches);
        assert_eq!(config.nodes_at(config.batches), config.max_nodes);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("TRIBUTARY_STRESS_SEED", "77");
            std::env::set_var("TRIBUTARY_STRESS_BATCHES", "123");
        }

        let config = StressConfig::from_env();
        assert_eq!(config.seed, 77);
        assert_eq!(config.batches, 123);

        unsafe {
            std::env::remove_var("TRIBUTARY_STRESS_SEED");
            std::env::remove_var("TRIBUTARY_STRESS_BATCHES");
        }
    }
}
