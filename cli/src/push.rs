// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use clap::Args;
use clap_stdin::FileOrStdin;
use tokio::io::AsyncReadExt;
use tracing::debug;

use pushtx_provider::name::Name;
use pushtx_provider::packed::CompressionMode;
use pushtx_provider::tx::PermissionLevel;
use pushtx_provider::util::{parse_compression, parse_name, parse_permission_level};
use pushtx_sdk::observer::{RecordingObserver, TracingObserver};
use pushtx_sdk::{ActionArgs, Pipeline, PushOptions};
use pushtx_signer::key::{parse_private_key, PrivateKey};
use pushtx_signer::{Wallet, WalletManager};

use crate::{get_chain_id, get_provider, print_json, Cli};

#[derive(Clone, Debug, Args)]
pub struct PushArgs {
    /// Contract account.
    #[arg(value_parser = parse_name)]
    contract: Name,
    /// Action name.
    #[arg(value_parser = parse_name)]
    action: Name,
    /// Input file (or stdin) containing the JSON action arguments.
    #[clap(default_value = "-")]
    input: FileOrStdin,
    /// JSON action arguments given inline instead of from a file.
    #[arg(short, long, conflicts_with = "input")]
    data: Option<String>,
    /// Private key (PVT_K1_...) for signing. Repeat for multiple keys.
    /// Only the keys the node reports as required are used.
    #[arg(short, long = "private-key", env = "PUSHTX_PRIVATE_KEY", value_parser = parse_private_key, value_delimiter = ',', hide_env_values = true)]
    private_keys: Vec<PrivateKey>,
    /// Authorization for the action, as actor@permission.
    /// A bare actor uses the active permission.
    #[arg(long, value_parser = parse_permission_level, default_value = "eosio@active")]
    permission: PermissionLevel,
    /// Compression of the broadcast payload ("none" or "zlib").
    #[arg(long, value_parser = parse_compression, default_value = "none")]
    compression: CompressionMode,
    /// How long after the head block the transaction stays valid.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    expiration: Duration,
    /// Give up if the push has not finished in time, e.g. "60s".
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
    /// Print each stage's request and response.
    #[arg(long, default_value_t = false)]
    trace: bool,
}

/// Push command handler.
pub async fn handle_push(cli: Cli, args: &PushArgs) -> anyhow::Result<()> {
    let provider = Arc::new(get_provider(&cli)?);
    let chain_id = get_chain_id(&cli)?;

    let json_args = match &args.data {
        Some(data) => data.clone(),
        None => {
            let mut reader = args.input.clone().into_async_reader().await?;
            let mut buf = String::new();
            reader.read_to_string(&mut buf).await?;
            buf
        }
    };

    debug!(keys = args.private_keys.len(), "loading signing keys");
    let wallets = WalletManager::new();
    wallets
        .insert(Wallet::with_keys("cli", "", args.private_keys.clone()))
        .await?;

    let recorder = RecordingObserver::new();
    let pipeline = Pipeline::with_observer(
        provider,
        Arc::new(wallets),
        (TracingObserver, recorder.clone()),
    )
    .with_options(PushOptions {
        authorization: args.permission,
        expiration_window: args.expiration,
        compression: args.compression,
        chain_id,
    });

    let action = ActionArgs::new(args.contract.to_string(), args.action.to_string(), json_args);
    let result = match args.timeout {
        Some(timeout) => pipeline.run_with_timeout(action, timeout).await,
        None => pipeline.run(action).await,
    };

    if args.trace {
        print_json(&recorder.events())?;
    }
    match result {
        Ok(receipt) => print_json(&receipt),
        Err(err) => {
            if let Some(raw) = err.raw_response() {
                print_json(raw)?;
            }
            let stage = err.stage();
            Err(anyhow!(err).context(format!("push failed at stage {stage}")))
        }
    }
}
