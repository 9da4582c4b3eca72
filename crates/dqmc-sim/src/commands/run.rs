use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use dqmc_mcmc::{resume, RunConfig, RunSummary};
use tracing::info;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML configuration describing the run.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for run artefacts.
    #[arg(long)]
    pub out: PathBuf,
    /// Auxiliary-field file to start from instead of a random field.
    #[arg(long)]
    pub field: Option<PathBuf>,
    /// Overrides the master seed of the configuration.
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let mut config = RunConfig::load(&args.config)?;
    config.output.run_directory = Some(args.out.clone());
    let seed = args.seed.unwrap_or(config.seed_policy.master_seed);

    let outcome = match &args.field {
        Some(path) => resume(&config, seed, path)?,
        None => dqmc_mcmc::run(&config, seed)?,
    };
    fs::copy(&args.config, args.out.join("config.yaml"))?;
    info!(out = %args.out.display(), "run finished");
    print_summary(&outcome.summary);
    Ok(())
}

pub(crate) fn print_summary(summary: &RunSummary) {
    println!(
        "bins {}  acceptance {:.4}  max wrap {:.3e} / {:.3e}",
        summary.bins_completed,
        summary.acceptance_rate,
        summary.max_wrap_eqtime,
        summary.max_wrap_dynamic
    );
    if let Some(eqtime) = &summary.eqtime {
        println!("{:<24}{:>15.8} +- {:.8}", "sign", eqtime.sign.mean, eqtime.sign.error);
        for (name, estimate) in &eqtime.observables {
            println!("{name:<24}{:>15.8} +- {:.8}", estimate.mean, estimate.error);
        }
    }
    if let Some(dynamic) = &summary.dynamic {
        let rho = &dynamic.superfluid_stiffness;
        println!("{:<24}{:>15.8} +- {:.8}", "superfluid_stiffness", rho.mean, rho.error);
    }
}
