//! Short randomized soaks through the public stress API

use std::io;

use tributary_core::{Algorithm, StressConfig};
use tributary_sim::run_stress;

#[test]
fn test_quick_soak_passes_for_every_algorithm() {
    let mut config = StressConfig::quick();
    config.seed = 7;
    for algorithm in Algorithm::ALL {
        let report = run_stress(algorithm, &config, &mut io::sink()).unwrap();
        assert!(report.passed(), "{algorithm} failed its soak");
        assert_eq!(report.batches_run, config.batches);
    }
}

#[test]
fn test_identical_seeds_produce_identical_progress() {
    let mut config = StressConfig::quick();
    config.batches = 500;
    let run = || {
        let mut progress = Vec::new();
        let report = run_stress(Algorithm::Dpva, &config, &mut progress).unwrap();
        (report.passed(), report.batches_run, progress)
    };
    assert_eq!(run(), run());
}
