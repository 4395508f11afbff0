mod progress;

use std::path::PathBuf;

use anyhow::Context;
use bjtrainer::{LookupTableBuilder, Rule};
use bjtrainer_drivers::{init_logging, load_config, DEFAULT_CONFIG_PATH};
use clap::Parser;
use tracing::info;

use crate::progress::ProgressLogger;

const PROGRESS_EVERY: usize = 50;

/// Simulates every two-card hand against every upcard and writes the EV
/// lookup table used for difficulty classification.
#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file
    #[arg(short, long, default_value_t = String::from(DEFAULT_CONFIG_PATH))]
    config: String,

    /// Worker threads, 0 for one per core
    #[arg(short = 'j', long, value_name = "N")]
    threads: Option<usize>,

    /// Trials per hand and action
    #[arg(short, long, value_name = "N")]
    trials: Option<u32>,

    /// Base seed for the per-entry shoes
    #[arg(short, long)]
    seed: Option<u64>,

    /// Where to write the table
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = CommandLineArgs::parse();
    let config = load_config(&args.config)?;
    init_logging(&config.logging)?;

    let rule: Rule = config.rule.clone().try_into()?;
    let settings = &config.ev_lookup_builder;
    let builder = LookupTableBuilder::new(rule)
        .with_trials(args.trials.unwrap_or(settings.trials_per_scenario))
        .with_number_of_threads(args.threads.unwrap_or(settings.number_of_threads))
        .with_seed(args.seed.unwrap_or(settings.seed));
    let output = args.output.unwrap_or_else(|| settings.output.clone());

    info!(
        h17 = rule.dealer_hit_on_soft17,
        das = rule.allow_das,
        splits = rule.split_all_limits,
        seed = builder.seed(),
        "house rules"
    );
    let mut progress = ProgressLogger::new(PROGRESS_EVERY);
    let table = builder.build(&mut progress)?;
    table.validate().context("built table is incomplete")?;
    table
        .write_to_path(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(path = %output.display(), entries = table.len(), "wrote EV lookup table");
    Ok(())
}
