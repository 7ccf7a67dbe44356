//! CLI command implementations

use std::io::{self, BufRead};
use std::process;

use clap::Subcommand;
use tracing::debug;
use tributary_core::routing::DEST_NAME;
use tributary_core::{Algorithm, Distance, NodeId, Result, StressConfig, build_simulator};
use tributary_sim::{StressOutcome, run_stress};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Edit a topology interactively and watch the protocol converge
    Console {
        /// Routing algorithm to simulate
        #[arg(value_enum)]
        algorithm: Algorithm,
    },
    /// Soak an algorithm under randomized topology churn
    Stress {
        /// Routing algorithm to test
        #[arg(value_enum)]
        algorithm: Algorithm,
        /// Number of update batches to run
        #[arg(long)]
        batches: Option<u32>,
        /// Seed for the deterministic random generator
        #[arg(long)]
        seed: Option<u64>,
    },
    /// List the registered algorithms
    Algorithms,
}

/// Dispatches a parsed command to its handler.
///
/// # Errors
///
/// - `TributaryError::Io` - If reading input or writing progress fails
pub fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Console { algorithm } => run_console(algorithm),
        Commands::Stress {
            algorithm,
            batches,
            seed,
        } => run_stress_test(algorithm, batches, seed),
        Commands::Algorithms => {
            list_algorithms();
            Ok(())
        }
    }
}

/// Runs the interactive console: one link command per line, full drain and
/// a node-state dump after each.
///
/// # Errors
///
/// - `TributaryError::Io` - If reading from stdin fails
fn run_console(algorithm: Algorithm) -> Result<()> {
    debug!("Starting {algorithm} console");
    let mut sim = build_simulator(algorithm);
    print_help();
    sim.create_node(&NodeId::dest());

    for line in io::stdin().lock().lines() {
        let line = line?;
        let Some(command) = parse_link_command(&line) else {
            println!("Wrong command");
            print_help();
            continue;
        };
        sim.update_link(&command.from, &command.to, command.cost);
        while !sim.is_quiescent() {
            sim.process_message(0);
        }
        for summary in sim.node_summaries() {
            println!("{summary}");
        }
    }
    Ok(())
}

fn print_help() {
    println!("Type: <from> <to> <dist> to add link");
    println!("Use dist 0 to remove link");
    println!("Node '{DEST_NAME}' is a destination");
}

/// Runs the randomized stress workload and reports the verdict.
///
/// A convergence failure prints the offending node states and exits with a
/// non-zero status.
///
/// # Errors
///
/// - `TributaryError::Io` - If writing progress output fails
fn run_stress_test(algorithm: Algorithm, batches: Option<u32>, seed: Option<u64>) -> Result<()> {
    let mut config = StressConfig::from_env();
    if let Some(batches) = batches {
        config.batches = batches;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }

    println!("Testing {algorithm}");
    let report = run_stress(algorithm, &config, &mut io::stdout())?;
    match report.outcome {
        StressOutcome::Passed => println!("=== PASSED SUCCESSFULLY ==="),
        StressOutcome::Failed {
            violation,
            node_dump,
            ..
        } => {
            println!();
            println!("=== FAIL: {violation} ===");
            for line in &node_dump {
                println!("{line}");
            }
            process::exit(1);
        }
    }
    Ok(())
}

fn list_algorithms() {
    for algorithm in Algorithm::ALL {
        println!("{algorithm}");
        for line in algorithm.description_lines() {
            println!("  {line}");
        }
    }
}

/// A validated console command: set (or remove) one directed link.
#[derive(Debug, PartialEq, Eq)]
struct LinkCommand {
    from: NodeId,
    to: NodeId,
    cost: Distance,
}

/// Parses a `<from> <to> <dist>` line; distance 0 turns into a removal.
///
/// Returns `None` on the wrong number of tokens or a non-numeric distance,
/// so the console can recover with a usage message.
fn parse_link_command(line: &str) -> Option<LinkCommand> {
    let mut tokens = line.split_whitespace();
    let from = tokens.next()?;
    let to = tokens.next()?;
    let dist = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }

    let value: u32 = dist.parse().ok()?;
    let cost = if value == 0 {
        Distance::INF
    } else {
        Distance::new(value)
    };
    Some(LinkCommand {
        from: NodeId::new(from),
        to: NodeId::new(to),
        cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_command_accepts_three_tokens() {
        let command = parse_link_command("1 2 5").unwrap();
        assert_eq!(command.from, NodeId::new("1"));
        assert_eq!(command.to, NodeId::new("2"));
        assert_eq!(command.cost, Distance::new(5));
    }

    #[test]
    fn test_parse_link_command_ignores_extra_whitespace() {
        let command = parse_link_command("  7   0  12 ").unwrap();
        assert_eq!(command.from, NodeId::new("7"));
        assert_eq!(command.to, NodeId::dest());
        assert_eq!(command.cost, Distance::new(12));
    }

    #[test]
    fn test_parse_link_command_zero_distance_means_removal() {
        let command = parse_link_command("1 2 0").unwrap();
        assert_eq!(command.cost, Distance::INF);
    }

    #[test]
    fn test_parse_link_command_rejects_malformed_lines() {
        assert_eq!(parse_link_command(""), None);
        assert_eq!(parse_link_command("1 2"), None);
        assert_eq!(parse_link_command("1 2 3 4"), None);
        assert_eq!(parse_link_command("1 2 fast"), None);
        assert_eq!(parse_link_command("1 2 -3"), None);
    }
}
