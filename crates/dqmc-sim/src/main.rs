use std::error::Error;
use std::fs;
use std::path::Path;

use clap::{Parser, Subcommand};
use commands::{
    chains::{self, ChainsArgs},
    check::{self, CheckArgs},
    run::{self, RunArgs},
};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "dqmc-sim", about = "Determinant quantum Monte Carlo for the Hubbard model")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one chain from a YAML configuration.
    Run(RunArgs),
    /// Run several configurations as independent parallel chains.
    Chains(ChainsArgs),
    /// Validate a configuration and print it with every default resolved.
    Check(CheckArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Chains(args) => chains::run(&args),
        Command::Check(args) => check::run(&args),
    };
    if let Err(err) = &result {
        error!(%err, "dqmc-sim failed");
    }
    result
}

pub(crate) fn write_json<P: AsRef<Path>, T: serde::Serialize>(
    path: P,
    value: &T,
) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
