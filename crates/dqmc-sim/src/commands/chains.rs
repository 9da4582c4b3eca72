use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use dqmc_mcmc::{run_chains, RunConfig, RunSummary};
use serde::Serialize;
use tracing::{error, info};

use crate::write_json;

#[derive(Args, Debug)]
pub struct ChainsArgs {
    /// YAML configuration per chain; repeat the flag for every chain.
    #[arg(long = "config", required = true)]
    pub configs: Vec<PathBuf>,
    /// Output directory; chain `k` writes into `chain-k`.
    #[arg(long)]
    pub out: PathBuf,
    /// Master seed the chain seeds are derived from. Defaults to the first configuration's.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ChainReport {
    config: PathBuf,
    summary: Option<RunSummary>,
    error: Option<String>,
}

pub fn run(args: &ChainsArgs) -> Result<(), Box<dyn Error>> {
    let mut configs = Vec::with_capacity(args.configs.len());
    for (index, path) in args.configs.iter().enumerate() {
        let mut config = RunConfig::load(path)?;
        config.output.run_directory = Some(args.out.join(format!("chain-{index}")));
        configs.push(config);
    }
    let master_seed = args
        .seed
        .or_else(|| configs.first().map(|c| c.seed_policy.master_seed))
        .unwrap_or_default();

    let results = run_chains(&configs, master_seed);
    let mut failures = 0;
    let mut reports = Vec::with_capacity(results.len());
    for (path, result) in args.configs.iter().zip(results) {
        match result {
            Ok(outcome) => reports.push(ChainReport {
                config: path.clone(),
                summary: Some(outcome.summary),
                error: None,
            }),
            Err(err) => {
                error!(config = %path.display(), %err, "chain failed");
                failures += 1;
                reports.push(ChainReport {
                    config: path.clone(),
                    summary: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }
    write_json(args.out.join("chains.json"), &reports)?;
    info!(chains = reports.len(), failures, "chains finished");
    if failures > 0 {
        return Err(format!("{failures} of {} chains failed", reports.len()).into());
    }
    Ok(())
}
