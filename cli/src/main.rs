mod commands;
mod config;
mod output;
mod rpc;

use anyhow::Result;
use clap::Parser;
use multisig_sdk::MultisigClient;
use tracing_subscriber::EnvFilter;

use crate::{commands::Command, config::ConfigArgs, rpc::RpcCluster};

#[derive(Parser, Debug)]
#[command(name = "multisig", version, about = "Manage multisig proposals")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.config.log_level.as_deref());

    let config = cli.config.resolve()?;
    let cluster = RpcCluster::connect(&config)?;
    let client = MultisigClient::new(&cluster, &cluster, config.program_id);
    commands::run(&client, cli.command)
}
