use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, U256};
use thiserror::Error;
use tokio::sync::{broadcast, watch};

use mintpad_chain::client::{FactoryClient, TokenMetadata};
use mintpad_chain::wallet::{ConnectionState, WalletGateway};
use mintpad_core::NetworkRegistry;

use crate::events::EventBus;

/// Placeholder fields for a token whose detail reads failed.
const UNKNOWN_NAME: &str = "Unknown Token";
const UNKNOWN_SYMBOL: &str = "UNK";

/// 10^18, the scale between raw supply units and whole tokens.
const WEI_PER_TOKEN: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// A token surfaced in the history list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedToken {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    /// Whole-token amount; fractional remainder truncated.
    pub total_supply: String,
    pub deployer: Address,
    pub timestamp: u64,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to fetch token history: {0}")]
    Fetch(String),
}

/// Rebuilds the caller's token list from chain state. There are no
/// incremental updates: every refresh re-runs the full two-step fetch.
pub struct HistoryAggregator<C> {
    client: Arc<C>,
    registry: Arc<NetworkRegistry>,
}

impl<C: FactoryClient> HistoryAggregator<C> {
    pub fn new(client: Arc<C>, registry: Arc<NetworkRegistry>) -> Self {
        Self { client, registry }
    }

    fn active_target(&self, connection: &ConnectionState) -> Option<(Address, Address)> {
        let owner = connection.address?;
        let chain_id = connection.chain_id.filter(|_| connection.is_connected)?;
        let profile = self.registry.profile_for_chain(chain_id)?;
        profile.is_ready().then_some((profile.factory_address, owner))
    }

    /// Addresses of every token the connected account created, in
    /// on-chain creation order. Empty without a ready connection:
    /// disconnected, unsupported and not-ready states make no network
    /// call at all.
    pub async fn fetch_user_tokens(
        &self,
        connection: &ConnectionState,
    ) -> Result<Vec<Address>, HistoryError> {
        let Some((factory, owner)) = self.active_target(connection) else {
            return Ok(Vec::new());
        };
        self.client.user_tokens(factory, owner).await.map_err(|e| {
            tracing::warn!(owner = %owner, error = %e, "User token fetch failed");
            HistoryError::Fetch(e.to_string())
        })
    }

    /// Display entries for the given token addresses. A token whose reads
    /// fail degrades to placeholder fields instead of aborting the batch.
    pub async fn fetch_token_details(
        &self,
        addresses: Vec<Address>,
        deployer: Address,
    ) -> Result<Vec<DeployedToken>, HistoryError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let metadata = self
            .client
            .token_metadata(addresses)
            .await
            .map_err(|e| HistoryError::Fetch(e.to_string()))?;
        let timestamp = unix_now();
        Ok(metadata
            .into_iter()
            .map(|meta| display_token(meta, deployer, timestamp))
            .collect())
    }

    /// Full two-step refresh, newest token first.
    pub async fn fetch(
        &self,
        connection: &ConnectionState,
    ) -> Result<Vec<DeployedToken>, HistoryError> {
        let addresses = self.fetch_user_tokens(connection).await?;
        let deployer = connection.address.unwrap_or(Address::ZERO);
        let mut tokens = self.fetch_token_details(addresses, deployer).await?;
        tokens.reverse();
        tracing::debug!(count = tokens.len(), "History refreshed");
        Ok(tokens)
    }
}

fn display_token(meta: TokenMetadata, deployer: Address, timestamp: u64) -> DeployedToken {
    let raw_supply = meta.total_supply.unwrap_or(U256::ZERO);
    DeployedToken {
        address: meta.address,
        name: meta.name.unwrap_or_else(|| UNKNOWN_NAME.into()),
        symbol: meta.symbol.unwrap_or_else(|| UNKNOWN_SYMBOL.into()),
        total_supply: (raw_supply / WEI_PER_TOKEN).to_string(),
        deployer,
        timestamp,
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Case-insensitive substring filter over name, symbol and address.
/// Pure; never touches the network.
pub fn filter_tokens(tokens: &[DeployedToken], query: &str) -> Vec<DeployedToken> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return tokens.to_vec();
    }
    tokens
        .iter()
        .filter(|token| {
            token.name.to_lowercase().contains(&query)
                || token.symbol.to_lowercase().contains(&query)
                || format!("{:#x}", token.address).contains(&query)
        })
        .cloned()
        .collect()
}

/// Event-driven refresh loop: re-fetches on deployment and network
/// signals and publishes the latest list to a watch channel.
pub struct HistoryService<C, W> {
    aggregator: Arc<HistoryAggregator<C>>,
    wallet: Arc<W>,
    events: EventBus,
}

impl<C, W> HistoryService<C, W>
where
    C: FactoryClient + 'static,
    W: WalletGateway + 'static,
{
    pub fn new(aggregator: Arc<HistoryAggregator<C>>, wallet: Arc<W>, events: EventBus) -> Self {
        Self {
            aggregator,
            wallet,
            events,
        }
    }

    /// Spawn the refresh loop. Every broadcast signal re-runs the full
    /// fetch. The loop ends when all receivers of the returned channel
    /// are gone; results arriving after teardown are discarded with it.
    pub fn spawn(self) -> watch::Receiver<Vec<DeployedToken>> {
        let (tx, rx) = watch::channel(Vec::new());
        let mut signals = self.events.subscribe();

        tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "History refresh lagged behind events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                let connection = self.wallet.connection();
                match self.aggregator.fetch(&connection).await {
                    Ok(tokens) => {
                        if tx.send(tokens).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "History refresh failed"),
                }
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use alloy::primitives::{TxHash, utils::parse_ether};
    use mintpad_chain::client::ChainError;
    use mintpad_chain::receipt::TxReceipt;
    use mintpad_core::Settings;

    use super::*;

    const OWNER: Address = Address::new([0x42; 20]);
    const TOKEN_A: Address = Address::new([0xA1; 20]);
    const TOKEN_B: Address = Address::new([0xB2; 20]);
    const TOKEN_C: Address = Address::new([0xC3; 20]);

    /// Read-only [`FactoryClient`] with canned token data.
    struct MockClient {
        tokens: Vec<Address>,
        metadata: HashMap<Address, TokenMetadata>,
        fetch_calls: AtomicUsize,
    }

    impl MockClient {
        fn with_tokens(entries: Vec<(Address, &str, &str, &str)>) -> Self {
            let tokens = entries.iter().map(|(address, ..)| *address).collect();
            let metadata = entries
                .into_iter()
                .map(|(address, name, symbol, supply)| {
                    (
                        address,
                        TokenMetadata {
                            address,
                            name: Some(name.to_string()),
                            symbol: Some(symbol.to_string()),
                            total_supply: Some(parse_ether(supply).unwrap()),
                        },
                    )
                })
                .collect();
            Self {
                tokens,
                metadata,
                fetch_calls: AtomicUsize::new(0),
            }
        }

        /// Drop all detail fields for one address, as if its reads revert.
        fn failing_reads_for(mut self, address: Address) -> Self {
            self.metadata.insert(
                address,
                TokenMetadata {
                    address,
                    name: None,
                    symbol: None,
                    total_supply: None,
                },
            );
            self
        }
    }

    impl FactoryClient for MockClient {
        async fn creation_fee(&self, _factory: Address) -> Result<U256, ChainError> {
            Ok(U256::ZERO)
        }

        async fn create_token(
            &self,
            _factory: Address,
            _name: String,
            _symbol: String,
            _total_supply: U256,
            _payment: U256,
        ) -> Result<TxHash, ChainError> {
            Err(ChainError::Transport("read-only mock".into()))
        }

        async fn wait_for_receipt(&self, _hash: TxHash) -> Result<TxReceipt, ChainError> {
            Err(ChainError::Receipt("read-only mock".into()))
        }

        async fn user_tokens(
            &self,
            _factory: Address,
            _owner: Address,
        ) -> Result<Vec<Address>, ChainError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.tokens.clone())
        }

        async fn token_metadata(
            &self,
            tokens: Vec<Address>,
        ) -> Result<Vec<TokenMetadata>, ChainError> {
            Ok(tokens
                .into_iter()
                .filter_map(|address| self.metadata.get(&address).cloned())
                .collect())
        }
    }

    fn aggregator(client: MockClient) -> HistoryAggregator<MockClient> {
        let registry = Arc::new(NetworkRegistry::from_settings(&Settings::default()).unwrap());
        HistoryAggregator::new(Arc::new(client), registry)
    }

    fn three_tokens() -> MockClient {
        MockClient::with_tokens(vec![
            (TOKEN_A, "Alpha", "ALP", "100"),
            (TOKEN_B, "Beta", "BET", "200"),
            (TOKEN_C, "Gamma", "GAM", "300"),
        ])
    }

    #[tokio::test]
    async fn newest_token_comes_first() {
        let aggregator = aggregator(three_tokens());
        let connection = ConnectionState::connected(OWNER, 1999);

        let tokens = aggregator.fetch(&connection).await.unwrap();

        let order: Vec<Address> = tokens.iter().map(|t| t.address).collect();
        assert_eq!(order, vec![TOKEN_C, TOKEN_B, TOKEN_A]);
    }

    #[tokio::test]
    async fn failing_token_degrades_to_placeholders() {
        let aggregator = aggregator(three_tokens().failing_reads_for(TOKEN_B));
        let connection = ConnectionState::connected(OWNER, 1999);

        let tokens = aggregator.fetch(&connection).await.unwrap();

        assert_eq!(tokens.len(), 3);
        let broken = tokens.iter().find(|t| t.address == TOKEN_B).unwrap();
        assert_eq!(broken.name, "Unknown Token");
        assert_eq!(broken.symbol, "UNK");
        assert_eq!(broken.total_supply, "0");

        let healthy = tokens.iter().find(|t| t.address == TOKEN_A).unwrap();
        assert_eq!(healthy.name, "Alpha");
    }

    #[tokio::test]
    async fn supply_is_truncated_to_whole_tokens() {
        let client = MockClient::with_tokens(vec![(TOKEN_A, "Alpha", "ALP", "1000000.75")]);
        let aggregator = aggregator(client);
        let connection = ConnectionState::connected(OWNER, 1999);

        let tokens = aggregator.fetch(&connection).await.unwrap();
        assert_eq!(tokens[0].total_supply, "1000000");
    }

    #[tokio::test]
    async fn disconnected_fetch_is_empty_and_makes_no_call() {
        let aggregator = aggregator(three_tokens());

        let tokens = aggregator.fetch(&ConnectionState::disconnected()).await.unwrap();

        assert!(tokens.is_empty());
        assert_eq!(aggregator.client.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsupported_chain_makes_no_call() {
        let aggregator = aggregator(three_tokens());
        let connection = ConnectionState::connected(OWNER, 5000);

        let tokens = aggregator.fetch(&connection).await.unwrap();

        assert!(tokens.is_empty());
        assert_eq!(aggregator.client.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn not_ready_mainnet_makes_no_call() {
        let aggregator = aggregator(three_tokens());
        let connection = ConnectionState::connected(OWNER, 7131);

        let tokens = aggregator.fetch(&connection).await.unwrap();

        assert!(tokens.is_empty());
        assert_eq!(aggregator.client.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn filter_matches_name_symbol_and_address() {
        let aggregator = aggregator(three_tokens());
        let connection = ConnectionState::connected(OWNER, 1999);
        let tokens = aggregator.fetch(&connection).await.unwrap();

        let by_name = filter_tokens(&tokens, "alPHa");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].address, TOKEN_A);

        let by_symbol = filter_tokens(&tokens, "bet");
        assert_eq!(by_symbol.len(), 1);
        assert_eq!(by_symbol[0].address, TOKEN_B);

        let by_address = filter_tokens(&tokens, "0xc3c3");
        assert_eq!(by_address.len(), 1);
        assert_eq!(by_address[0].address, TOKEN_C);

        assert!(filter_tokens(&tokens, "nothing-like-this").is_empty());
        assert_eq!(filter_tokens(&tokens, "").len(), 3);
    }
}
