// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use pushtx_provider::json_rpc::{JsonRpcProvider, Url};
use pushtx_provider::types::ChainId;

const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(60);

/// Location of the optional user network definitions.
pub const DEFAULT_NETWORKS_CONFIG_PATH: &str = "~/.config/pushtx/networks.toml";

pub const LOCALNET_NETWORK_NAME: &str = "localnet";
const LOCALNET_RPC_URL: &str = "http://127.0.0.1:8888";

/// Built-in network presets.
pub fn default_networks() -> HashMap<String, NetworkSpec> {
    let mut hm = HashMap::new();
    if let Ok(rpc_url) = Url::from_str(LOCALNET_RPC_URL) {
        hm.insert(
            LOCALNET_NETWORK_NAME.to_owned(),
            NetworkSpec {
                rpc_url,
                chain_id: None,
                request_timeout: DEFAULT_RPC_TIMEOUT,
            },
        );
    }
    hm
}

/// Connection settings of a named network.
///
/// In TOML:
///
/// ```toml
/// [jungle]
/// rpc_url = "https://jungle.example/"
/// chain_id = "73e4385a2708e6d7048834fbc1079f2fabb17b3c125b146af438971e90716c4d"
/// request_timeout = "20s"
/// ```
///
/// When `chain_id` is set, pushes fail if the node reports another chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    #[serde(deserialize_with = "deserialize_url", serialize_with = "serialize_url")]
    pub rpc_url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ChainId>,
    #[serde(
        default = "default_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub request_timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_RPC_TIMEOUT
}

fn serialize_url<S>(url: &Url, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(url.as_str())
}

fn deserialize_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: Deserializer<'de>,
{
    let buf = String::deserialize(deserializer)?;
    Url::from_str(&buf).map_err(serde::de::Error::custom)
}

fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*d).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let buf = String::deserialize(deserializer)?;
    humantime::parse_duration(&buf).map_err(serde::de::Error::custom)
}

impl NetworkSpec {
    /// Returns an HTTP provider for this network.
    pub fn provider(&self) -> anyhow::Result<JsonRpcProvider> {
        JsonRpcProvider::new_http(self.rpc_url.clone(), Some(self.request_timeout))
    }
}

/// Loads the presets, overridden and extended by the TOML file at `path`
/// (default [`DEFAULT_NETWORKS_CONFIG_PATH`]) if it exists.
pub fn load_networks(path: Option<&str>) -> anyhow::Result<HashMap<String, NetworkSpec>> {
    let path = path.unwrap_or(DEFAULT_NETWORKS_CONFIG_PATH);
    let path = shellexpand::full(path).context("error expanding networks config path")?;
    let path = Path::new(path.as_ref());

    let mut specs = default_networks();
    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("error reading {}", path.display()))?;
        specs.extend(parse_networks(&content)?);
    }
    Ok(specs)
}

/// Parses network definitions from TOML, one table per network.
pub fn parse_networks(content: &str) -> anyhow::Result<HashMap<String, NetworkSpec>> {
    toml::from_str(content).context("error parsing networks config")
}

/// Returns the named network from presets and the config file at `path`.
pub fn get_network(name: &str, path: Option<&str>) -> anyhow::Result<NetworkSpec> {
    let mut specs = load_networks(path)?;
    specs.remove(name).ok_or_else(|| {
        let mut known: Vec<_> = specs.keys().cloned().collect();
        known.sort();
        anyhow!("unknown network '{name}' (known: {})", known.join(", "))
    })
}
