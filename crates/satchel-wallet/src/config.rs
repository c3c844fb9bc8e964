//! Wallet configuration.
//!
//! Everything a command needs is carried explicitly in [`WalletConfig`];
//! nothing is read from global state once the config is built.

use std::path::PathBuf;

use satchel_core::address::Network;

use crate::coin_selection::FeePolicy;
use crate::retry::{DEFAULT_BASE_DELAY_MS, RetryPolicy};

/// Environment variable overriding the default explorer URL.
pub const EXPLORER_URL_ENV: &str = "SATCHEL_EXPLORER_URL";

/// Broadcast retries after the first attempt.
pub const DEFAULT_BROADCAST_RETRIES: u32 = 2;

/// Default explorer API base for a network.
pub fn default_explorer_url(network: Network) -> &'static str {
    match network {
        Network::Mainnet => "https://explorer.satchel.network/api",
        Network::Testnet => "https://testnet.explorer.satchel.network/api",
    }
}

/// Default data directory: `~/.satchel`.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".satchel")
}

/// Configuration for one wallet invocation.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Directory holding the key database.
    pub data_dir: PathBuf,
    pub network: Network,
    /// Optional payload embedded in sent transactions.
    pub data: Option<Vec<u8>>,
    /// Explorer API base URL.
    pub explorer_url: String,
    /// Extra broadcast attempts on network failure.
    pub broadcast_retries: u32,
    /// Delay before the first broadcast retry; doubles per attempt.
    pub retry_base_delay_ms: u64,
    pub fee_policy: FeePolicy,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self::for_network(Network::default())
    }
}

impl WalletConfig {
    /// Defaults for `network`.
    pub fn for_network(network: Network) -> Self {
        Self {
            data_dir: default_data_dir(),
            network,
            data: None,
            explorer_url: default_explorer_url(network).to_string(),
            broadcast_retries: DEFAULT_BROADCAST_RETRIES,
            retry_base_delay_ms: DEFAULT_BASE_DELAY_MS,
            fee_policy: FeePolicy::default(),
        }
    }

    /// Explorer URL from [`EXPLORER_URL_ENV`], else the network default.
    pub fn explorer_url_from_env(network: Network) -> String {
        std::env::var(EXPLORER_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| default_explorer_url(network).to_string())
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_explorer_url(mut self, url: impl Into<String>) -> Self {
        self.explorer_url = url.into();
        self
    }

    /// Path to the key database.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("keystore")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay_ms: self.retry_base_delay_ms,
            ..RetryPolicy::new(self.broadcast_retries)
        }
    }
}
