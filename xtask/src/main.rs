// Tooling crate: unwrap/expect/panic are acceptable here.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod logging;
mod run;
mod targets;

use anyhow::Result;
use clap::Parser;
use firmware_build::TargetRegistry;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Launchpad Pro firmware build tasks", long_about = None)]
#[command(version)]
struct Cli {
    /// Targets to run, in order: build, nobuild, size, upload, restore.
    /// Defaults to `build size`.
    #[arg(value_name = "TARGET")]
    targets: Vec<String>,

    #[command(flatten)]
    overrides: run::Overrides,

    /// Print full tool command lines and debug logs
    #[arg(short, long)]
    verbose: bool,

    /// List available targets and exit
    #[arg(long)]
    list_targets: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let registry = TargetRegistry::standard();
    if cli.list_targets {
        targets::run(&registry);
        return Ok(());
    }

    run::run(&registry, &cli.targets, &cli.overrides, cli.verbose)
}
