use serde::Deserialize;

use crate::network::NetworkKind;

/// Global application settings loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Network used for display defaults while no wallet is connected.
    pub default_network: NetworkKind,

    /// Optional RPC endpoint overrides, one per network.
    pub testnet_rpc_url: Option<String>,
    pub mainnet_rpc_url: Option<String>,

    /// Optional factory contract address overrides, one per network.
    pub testnet_factory_address: Option<String>,
    pub mainnet_factory_address: Option<String>,

    /// Maximum retry attempts for a failing RPC request.
    pub rpc_max_retries: u32,

    /// Delay between RPC retry attempts, in milliseconds.
    pub rpc_retry_delay_ms: u64,

    /// How long a fetched creation fee stays valid, in seconds.
    pub fee_cache_ttl_secs: u64,

    /// Hex-encoded signing key for the local wallet (binary only).
    pub private_key: Option<String>,
}

impl Settings {
    /// Load settings from environment variables (with optional `.env` file).
    pub fn from_env() -> eyre::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            default_network: std::env::var("DEFAULT_NETWORK")
                .unwrap_or_else(|_| "testnet".into())
                .parse()?,
            testnet_rpc_url: std::env::var("TESTNET_RPC_URL").ok(),
            mainnet_rpc_url: std::env::var("MAINNET_RPC_URL").ok(),
            testnet_factory_address: std::env::var("TESTNET_FACTORY_ADDRESS").ok(),
            mainnet_factory_address: std::env::var("MAINNET_FACTORY_ADDRESS").ok(),
            rpc_max_retries: std::env::var("RPC_MAX_RETRIES")
                .unwrap_or_else(|_| "3".into())
                .parse()?,
            rpc_retry_delay_ms: std::env::var("RPC_RETRY_DELAY_MS")
                .unwrap_or_else(|_| "1000".into())
                .parse()?,
            fee_cache_ttl_secs: std::env::var("FEE_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()?,
            private_key: std::env::var("PRIVATE_KEY").ok(),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_network: NetworkKind::Testnet,
            testnet_rpc_url: None,
            mainnet_rpc_url: None,
            testnet_factory_address: None,
            mainnet_factory_address: None,
            rpc_max_retries: 3,
            rpc_retry_delay_ms: 1000,
            fee_cache_ttl_secs: 30,
            private_key: None,
        }
    }
}
