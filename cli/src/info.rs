// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use pushtx_provider::ChainProvider;

use crate::{get_provider, print_json, Cli};

/// Info command handler.
pub async fn handle_info(cli: Cli) -> anyhow::Result<()> {
    let provider = get_provider(&cli)?;
    let info = provider.get_info().await?;
    print_json(&info.value)
}
