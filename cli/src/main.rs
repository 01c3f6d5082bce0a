// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use clap::{Parser, Subcommand};
use serde::Serialize;
use stderrlog::Timestamp;

use pushtx_provider::json_rpc::{JsonRpcProvider, Url};
use pushtx_provider::types::ChainId;
use pushtx_provider::util::parse_chain_id;
use pushtx_sdk::network::{get_network, DEFAULT_NETWORKS_CONFIG_PATH, LOCALNET_NETWORK_NAME};

use crate::info::handle_info;
use crate::key::{handle_key, KeyArgs};
use crate::push::{handle_push, PushArgs};

mod info;
mod key;
mod push;

#[derive(Clone, Debug, Parser)]
#[command(name = "pushtx", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Network preset, or a network defined in the networks config.
    #[arg(short, long, env = "PUSHTX_NETWORK", default_value = LOCALNET_NETWORK_NAME)]
    network: String,
    /// Path to network definitions (TOML).
    #[arg(long, env = "PUSHTX_NETWORKS_CONFIG", default_value = DEFAULT_NETWORKS_CONFIG_PATH)]
    networks_config: String,
    /// Node RPC URL. Overrides the network's URL.
    #[arg(long, env = "PUSHTX_RPC_URL")]
    rpc_url: Option<Url>,
    /// Chain the node must serve. Overrides the network's chain id.
    #[arg(long, env = "PUSHTX_CHAIN_ID", value_parser = parse_chain_id)]
    chain_id: Option<ChainId>,
    /// Logging verbosity (repeat for more verbose logging).
    #[arg(short, long, env = "PUSHTX_LOG_VERBOSITY", action = clap::ArgAction::Count)]
    verbosity: u8,
    /// Silence logging.
    #[arg(short, long, env = "PUSHTX_LOG_QUIET", default_value_t = false)]
    quiet: bool,
}

#[derive(Clone, Debug, Subcommand)]
enum Commands {
    /// Encode, sign and broadcast a contract action.
    Push(PushArgs),
    /// Get chain head information.
    Info,
    /// Key related commands.
    #[clap(alias = "keys")]
    Key(KeyArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    stderrlog::new()
        .modules([module_path!(), "pushtx_sdk", "pushtx_signer", "pushtx_provider"])
        .quiet(cli.quiet)
        .verbosity(cli.verbosity as usize)
        .timestamp(Timestamp::Millisecond)
        .init()?;

    match &cli.command.clone() {
        Commands::Push(args) => handle_push(cli, args).await,
        Commands::Info => handle_info(cli).await,
        Commands::Key(args) => handle_key(args),
    }
}

/// Returns a provider for the rpc url override or the network preset.
fn get_provider(cli: &Cli) -> anyhow::Result<JsonRpcProvider> {
    match &cli.rpc_url {
        Some(url) => JsonRpcProvider::new_http(url.clone(), None),
        None => get_network(&cli.network, Some(&cli.networks_config))?.provider(),
    }
}

/// Returns the chain id pushes are checked against, if any.
fn get_chain_id(cli: &Cli) -> anyhow::Result<Option<ChainId>> {
    if cli.chain_id.is_some() || cli.rpc_url.is_some() {
        return Ok(cli.chain_id);
    }
    Ok(get_network(&cli.network, Some(&cli.networks_config))?.chain_id)
}

/// Print serializable to stdout as pretty formatted JSON.
fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&value)?;
    println!("{}", json);
    Ok(())
}
