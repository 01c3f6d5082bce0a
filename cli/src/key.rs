// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use clap::{Args, Subcommand};
use serde_json::json;

use pushtx_signer::key::{parse_private_key, random_private_key, PrivateKey};

use crate::print_json;

#[derive(Clone, Debug, Args)]
pub struct KeyArgs {
    #[command(subcommand)]
    command: KeyCommands,
}

#[derive(Clone, Debug, Subcommand)]
enum KeyCommands {
    /// Create a new random key pair.
    Create,
    /// Print the public key of a private key.
    Public(PublicKeyArgs),
}

#[derive(Clone, Debug, Args)]
struct PublicKeyArgs {
    /// Private key (PVT_K1_...).
    #[arg(short, long, env = "PUSHTX_PRIVATE_KEY", value_parser = parse_private_key, hide_env_values = true)]
    private_key: PrivateKey,
}

/// Key commands handler.
pub fn handle_key(args: &KeyArgs) -> anyhow::Result<()> {
    match &args.command {
        KeyCommands::Create => {
            let sk = random_private_key();
            print_json(&json!({
                "private_key": sk.to_string(),
                "public_key": sk.public_key(),
            }))
        }
        KeyCommands::Public(args) => {
            print_json(&json!({"public_key": args.private_key.public_key()}))
        }
    }
}
