use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod checkpoint;
mod cli;
mod config;
mod lookup;
mod lookup_log;
mod policy;
mod record;
mod runner;
mod status;
mod store;
mod util;
mod workflow;

use cli::{Command, RootArgs};

/// Logs go to stderr so stdout stays clean for progress lines and `--json`.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "cenrich=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let config = args.config.as_deref();
    match &args.command {
        Command::Run(run) => workflow::run_enrich(config, run),
        Command::Status(status) => workflow::run_status(config, status),
        Command::Models(models) => workflow::run_models(config, models),
    }
}
