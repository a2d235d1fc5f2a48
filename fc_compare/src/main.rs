mod aggregate;
mod cli;
mod config;
mod coverage;
mod experiment;
mod filestore;
mod key;
mod matrix;
mod output;
mod pairwise;
mod process;
mod rank;
mod region;
mod retrieve;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    let cfg = cli::handle_cli().with_context(|| "Error processing command line arguments")?;
    process::process_experiment(&cfg)
}
