use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::providers::{
    Identity, ProviderBuilder, RootProvider,
    fillers::{
        BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
    },
};
use alloy::rpc::client::ClientBuilder;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::layers::RetryBackoffLayer;
use mintpad_core::Settings;

/// Compute-unit budget used by the retry layer's rate-limit accounting.
const COMPUTE_UNITS_PER_SEC: u64 = 330;

/// Retry and cache tuning for the RPC transport.
///
/// One explicit record instead of literals scattered through the
/// transport layer; the limits are visible at construction time.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum retry attempts for a failing RPC request.
    pub max_retries: u32,

    /// Delay before the first retry attempt; backs off from there.
    pub retry_delay: Duration,

    /// How long a fetched creation fee stays valid.
    pub fee_cache_ttl: Duration,
}

impl TransportConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_retries: settings.rpc_max_retries,
            retry_delay: Duration::from_millis(settings.rpc_retry_delay_ms),
            fee_cache_ttl: Duration::from_secs(settings.fee_cache_ttl_secs),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            fee_cache_ttl: Duration::from_secs(30),
        }
    }
}

/// Read-only HTTP provider with the standard filler stack.
pub type ReadProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
>;

/// Signing HTTP provider: the read stack plus a wallet filler.
pub type SignerProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider,
>;

/// Create a read-only HTTP provider from an RPC URL string.
pub fn connect_http(rpc_url: &str, config: &TransportConfig) -> eyre::Result<ReadProvider> {
    let url = rpc_url.parse()?;
    let client = ClientBuilder::default()
        .layer(retry_layer(config))
        .http(url);
    Ok(ProviderBuilder::new().connect_client(client))
}

/// Create an HTTP provider that can sign and submit transactions.
pub fn connect_http_with_signer(
    rpc_url: &str,
    config: &TransportConfig,
    signer: PrivateKeySigner,
) -> eyre::Result<SignerProvider> {
    let url = rpc_url.parse()?;
    let client = ClientBuilder::default()
        .layer(retry_layer(config))
        .http(url);
    Ok(ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_client(client))
}

fn retry_layer(config: &TransportConfig) -> RetryBackoffLayer {
    RetryBackoffLayer::new(
        config.max_retries,
        config.retry_delay.as_millis() as u64,
        COMPUTE_UNITS_PER_SEC,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_config_follows_settings() {
        let settings = Settings {
            rpc_max_retries: 5,
            rpc_retry_delay_ms: 250,
            fee_cache_ttl_secs: 60,
            ..Settings::default()
        };
        let config = TransportConfig::from_settings(&settings);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.fee_cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn bad_rpc_url_is_rejected() {
        assert!(connect_http("not a url", &TransportConfig::default()).is_err());
    }
}
