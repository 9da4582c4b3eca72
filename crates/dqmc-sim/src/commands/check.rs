use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use dqmc_mcmc::RunConfig;
use serde_json::json;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// YAML configuration to validate.
    #[arg(long)]
    pub config: PathBuf,
}

pub fn run(args: &CheckArgs) -> Result<(), Box<dyn Error>> {
    let mut config = RunConfig::load(&args.config)?;
    config.monte_carlo.nwarm = Some(config.resolved_nwarm());
    let payload = json!({
        "dtau": config.model.dtau(),
        "chunks": config.model.num_chunks(),
        "config": serde_json::to_value(&config)?,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
