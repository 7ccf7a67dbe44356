//! Tributary CLI - interactive console and stress harness for the
//! routing-protocol simulator.

mod commands;

use clap::Parser;
use tributary_core::tracing_setup::{self, CliLogLevel};

#[derive(Parser)]
#[command(name = "tributary")]
#[command(about = "Deterministic simulator for distributed routing protocols")]
struct Cli {
    /// Console log verbosity
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    /// Also write a trace-level log file into this directory
    #[arg(long)]
    logs_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_setup::init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())?;

    commands::handle_command(cli.command)?;
    Ok(())
}
