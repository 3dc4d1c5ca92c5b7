use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use alloy::primitives::utils::{format_ether, parse_ether};
use alloy::primitives::{Address, TxHash, U256};
use thiserror::Error;
use tokio::sync::Mutex;

use mintpad_chain::client::FactoryClient;
use mintpad_chain::receipt::extract_created_token;
use mintpad_chain::wallet::ConnectionState;
use mintpad_core::{NetworkProfile, NetworkRegistry};

use crate::events::{AppEvent, EventBus};

/// Maximum allowed total supply, in whole tokens.
const MAX_TOTAL_SUPPLY: u64 = 1_000_000_000_000;

/// User input for one token deployment. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct DeploymentRequest {
    pub name: String,
    pub symbol: String,
    /// Whole-token amount as a decimal string.
    pub total_supply: String,
    pub description: String,
    /// Native-currency payment as a decimal string.
    pub payment_amount: String,
}

/// Field-keyed validation violations; empty means the request is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.violations.insert(field, message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.violations.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.violations.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Deployment lifecycle; terminal at `Confirmed` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStatus {
    Pending,
    Confirmed,
    Failed,
}

/// One deployment attempt, from submission to its terminal state.
#[derive(Debug, Clone)]
pub struct DeploymentTransaction {
    pub hash: Option<TxHash>,
    pub status: DeployStatus,
    pub deployed_token: Option<Address>,
    pub error: Option<String>,
}

/// Pre-submission rejections. Everything here is recoverable with a
/// fresh `deploy()` call; confirmation failures are reported through
/// [`DeploymentTransaction`] instead.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Please connect your wallet")]
    NotConnected,

    #[error("Unsupported network (chain ID {0})")]
    UnsupportedNetwork(u64),

    #[error("The {0} contract is not yet deployed")]
    NetworkNotReady(String),

    #[error("A deployment is already in progress")]
    InProgress,

    #[error("Invalid deployment request: {0}")]
    Invalid(ValidationErrors),

    #[error("Submission failed: {0}")]
    Submission(String),
}

#[derive(Debug, Clone, Copy)]
struct CachedFee {
    chain_id: u64,
    fee: U256,
    fetched_at: Instant,
}

/// Orchestrates one deployment at a time: gate, validate, submit, track
/// to confirmation, extract the created token from the receipt.
pub struct Deployer<C> {
    client: Arc<C>,
    registry: Arc<NetworkRegistry>,
    events: EventBus,
    fee_cache: Mutex<Option<CachedFee>>,
    fee_ttl: Duration,
    in_flight: AtomicBool,
}

/// Releases the in-flight slot when the attempt ends, on every path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<C: FactoryClient> Deployer<C> {
    pub fn new(
        client: Arc<C>,
        registry: Arc<NetworkRegistry>,
        events: EventBus,
        fee_ttl: Duration,
    ) -> Self {
        Self {
            client,
            registry,
            events,
            fee_cache: Mutex::new(None),
            fee_ttl,
            in_flight: AtomicBool::new(false),
        }
    }

    fn acquire_slot(&self) -> Result<InFlightGuard<'_>, DeployError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DeployError::InProgress);
        }
        Ok(InFlightGuard(&self.in_flight))
    }

    fn resolve_profile(
        &self,
        connection: &ConnectionState,
    ) -> Result<&NetworkProfile, DeployError> {
        let chain_id = connection
            .chain_id
            .filter(|_| connection.is_connected)
            .ok_or(DeployError::NotConnected)?;
        let profile = self
            .registry
            .profile_for_chain(chain_id)
            .ok_or(DeployError::UnsupportedNetwork(chain_id))?;
        if !profile.is_ready() {
            return Err(DeployError::NetworkNotReady(profile.name.clone()));
        }
        Ok(profile)
    }

    /// Factory creation fee for the given network, in wei. Cached per
    /// chain until the configured validity window lapses.
    pub async fn creation_fee(&self, profile: &NetworkProfile) -> Result<U256, DeployError> {
        let mut cache = self.fee_cache.lock().await;
        if let Some(cached) = *cache {
            if cached.chain_id == profile.chain_id && cached.fetched_at.elapsed() < self.fee_ttl {
                return Ok(cached.fee);
            }
        }
        let fee = self
            .client
            .creation_fee(profile.factory_address)
            .await
            .map_err(|e| DeployError::Submission(e.to_string()))?;
        *cache = Some(CachedFee {
            chain_id: profile.chain_id,
            fee,
            fetched_at: Instant::now(),
        });
        tracing::debug!(chain_id = profile.chain_id, fee = %fee, "Fetched creation fee");
        Ok(fee)
    }

    /// Validate a request against the field constraints and the network's
    /// minimum creation fee. Exact decimal arithmetic; no floats.
    pub fn validate(
        request: &DeploymentRequest,
        profile: &NetworkProfile,
        min_fee: U256,
    ) -> ValidationErrors {
        let mut errors = ValidationErrors::default();

        if request.name.trim().chars().count() < 3 {
            errors.push("name", "Name must be at least 3 characters");
        }

        let symbol = request.symbol.trim().to_uppercase();
        if !(2..=10).contains(&symbol.chars().count()) {
            errors.push("symbol", "Symbol must be 2-10 characters");
        }

        match parse_ether(request.total_supply.trim()) {
            Err(_) => errors.push("total_supply", "Total supply must be a number"),
            Ok(supply) if supply.is_zero() => {
                errors.push("total_supply", "Total supply must be greater than zero");
            }
            Ok(supply) if supply > parse_ether(&MAX_TOTAL_SUPPLY.to_string()).unwrap_or(U256::MAX) => {
                errors.push("total_supply", "Total supply cannot exceed 1,000,000,000,000");
            }
            Ok(_) => {}
        }

        match parse_ether(request.payment_amount.trim()) {
            Err(_) => errors.push("payment_amount", "Payment amount must be a number"),
            Ok(payment) if payment < min_fee => {
                errors.push(
                    "payment_amount",
                    format!(
                        "Minimum payment is {} {}",
                        format_ether(min_fee),
                        profile.currency.symbol
                    ),
                );
            }
            Ok(_) => {}
        }

        errors
    }

    /// Run one deployment attempt end to end.
    ///
    /// At most one attempt is in flight at a time; a concurrent call is
    /// rejected, never queued. Once the transaction is on the wire,
    /// confirmation failures are reported in the returned transaction
    /// (`Failed` plus an error string) and are not retried automatically.
    pub async fn deploy(
        &self,
        connection: &ConnectionState,
        request: &DeploymentRequest,
    ) -> Result<DeploymentTransaction, DeployError> {
        let _slot = self.acquire_slot()?;

        let profile = self.resolve_profile(connection)?.clone();
        let min_fee = self.creation_fee(&profile).await?;

        let errors = Self::validate(request, &profile, min_fee);
        if !errors.is_empty() {
            return Err(DeployError::Invalid(errors));
        }

        // Both amounts use the native 18 decimals.
        let supply_wei = parse_ether(request.total_supply.trim())
            .map_err(|e| DeployError::Submission(format!("Invalid total supply: {e}")))?;
        let payment_wei = parse_ether(request.payment_amount.trim())
            .map_err(|e| DeployError::Submission(format!("Invalid payment amount: {e}")))?;

        let name = request.name.trim().to_string();
        let symbol = request.symbol.trim().to_uppercase();
        tracing::info!(
            name = %name,
            symbol = %symbol,
            chain_id = profile.chain_id,
            "Submitting token deployment"
        );

        let hash = self
            .client
            .create_token(profile.factory_address, name, symbol, supply_wei, payment_wei)
            .await
            .map_err(|e| DeployError::Submission(e.to_string()))?;

        let mut tx = DeploymentTransaction {
            hash: Some(hash),
            status: DeployStatus::Pending,
            deployed_token: None,
            error: None,
        };
        tracing::info!(tx = %hash, "Deployment pending");

        let receipt = match self.client.wait_for_receipt(hash).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(tx = %hash, error = %e, "Receipt wait failed");
                tx.status = DeployStatus::Failed;
                tx.error = Some(e.to_string());
                return Ok(tx);
            }
        };

        if !receipt.status {
            tracing::warn!(tx = %hash, "Deployment transaction reverted");
            tx.status = DeployStatus::Failed;
            tx.error = Some("Transaction reverted on-chain".into());
            return Ok(tx);
        }

        tx.status = DeployStatus::Confirmed;
        tx.deployed_token = extract_created_token(&receipt.logs, profile.factory_address);
        match tx.deployed_token {
            Some(token) => tracing::info!(tx = %hash, token = %token, "Token deployed"),
            None => tracing::warn!(tx = %hash, "Confirmed receipt carried no TokenCreated log"),
        }

        self.events.emit(AppEvent::TokenDeployed {
            token: tx.deployed_token,
            tx_hash: hash,
        });

        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use alloy::primitives::{B256, Bytes, LogData};
    use mintpad_chain::client::{ChainError, TokenMetadata};
    use mintpad_chain::receipt::TxReceipt;
    use mintpad_core::Settings;
    use tokio::sync::Notify;

    use super::*;

    const OWNER: Address = Address::new([0x42; 20]);
    const TOKEN: Address = Address::new([0x11; 20]);
    const HASH: TxHash = B256::repeat_byte(0xFE);

    /// Scripted [`FactoryClient`] for orchestration tests.
    struct MockClient {
        fee: U256,
        create_calls: AtomicUsize,
        receipt_status: bool,
        receipt_logs: Vec<alloy::rpc::types::Log>,
        gate: Option<Arc<Notify>>,
    }

    impl MockClient {
        fn confirming(factory: Address) -> Self {
            Self {
                fee: parse_ether("0.01").unwrap(),
                create_calls: AtomicUsize::new(0),
                receipt_status: true,
                receipt_logs: vec![token_created_log(factory)],
                gate: None,
            }
        }
    }

    fn token_created_log(factory: Address) -> alloy::rpc::types::Log {
        alloy::rpc::types::Log {
            inner: alloy::primitives::Log {
                address: factory,
                data: LogData::new_unchecked(
                    vec![
                        B256::repeat_byte(0xAA),
                        B256::left_padding_from(TOKEN.as_slice()),
                        B256::left_padding_from(OWNER.as_slice()),
                    ],
                    Bytes::new(),
                ),
            },
            ..Default::default()
        }
    }

    impl FactoryClient for MockClient {
        async fn creation_fee(&self, _factory: Address) -> Result<U256, ChainError> {
            Ok(self.fee)
        }

        async fn create_token(
            &self,
            _factory: Address,
            _name: String,
            _symbol: String,
            _total_supply: U256,
            _payment: U256,
        ) -> Result<TxHash, ChainError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(HASH)
        }

        async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, ChainError> {
            Ok(TxReceipt {
                transaction_hash: hash,
                status: self.receipt_status,
                block_number: Some(1),
                logs: self.receipt_logs.clone(),
            })
        }

        async fn user_tokens(
            &self,
            _factory: Address,
            _owner: Address,
        ) -> Result<Vec<Address>, ChainError> {
            Ok(Vec::new())
        }

        async fn token_metadata(
            &self,
            _tokens: Vec<Address>,
        ) -> Result<Vec<TokenMetadata>, ChainError> {
            Ok(Vec::new())
        }
    }

    fn registry() -> Arc<NetworkRegistry> {
        Arc::new(NetworkRegistry::from_settings(&Settings::default()).unwrap())
    }

    fn deployer(client: MockClient) -> Deployer<MockClient> {
        Deployer::new(
            Arc::new(client),
            registry(),
            EventBus::default(),
            Duration::from_secs(30),
        )
    }

    fn request() -> DeploymentRequest {
        DeploymentRequest {
            name: "My Token".into(),
            symbol: "MTK".into(),
            total_supply: "1000000".into(),
            description: String::new(),
            payment_amount: "0.01".into(),
        }
    }

    fn testnet_profile() -> NetworkProfile {
        registry().profile_for_chain(1999).unwrap().clone()
    }

    #[test]
    fn validate_reports_each_violation_by_field() {
        let bad = DeploymentRequest {
            name: "AB".into(),
            symbol: "X".into(),
            total_supply: "0".into(),
            description: String::new(),
            payment_amount: "0.001".into(),
        };
        let errors = Deployer::<MockClient>::validate(
            &bad,
            &testnet_profile(),
            parse_ether("0.01").unwrap(),
        );

        assert_eq!(errors.len(), 4);
        assert!(errors.get("name").unwrap().contains("at least 3"));
        assert!(errors.get("symbol").unwrap().contains("2-10"));
        assert!(errors.get("total_supply").unwrap().contains("greater than zero"));
        assert!(errors.get("payment_amount").unwrap().contains("Minimum payment"));
    }

    #[test]
    fn validate_accepts_a_well_formed_request() {
        let errors = Deployer::<MockClient>::validate(
            &request(),
            &testnet_profile(),
            parse_ether("0.01").unwrap(),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn validate_caps_the_total_supply() {
        let oversized = DeploymentRequest {
            total_supply: "1000000000001".into(),
            ..request()
        };
        let errors = Deployer::<MockClient>::validate(
            &oversized,
            &testnet_profile(),
            parse_ether("0.01").unwrap(),
        );
        assert!(errors.get("total_supply").unwrap().contains("exceed"));
    }

    #[test]
    fn validate_rejects_non_numeric_amounts() {
        let garbled = DeploymentRequest {
            total_supply: "a lot".into(),
            payment_amount: "free".into(),
            ..request()
        };
        let errors = Deployer::<MockClient>::validate(
            &garbled,
            &testnet_profile(),
            parse_ether("0.01").unwrap(),
        );
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn deploy_confirms_and_extracts_the_token_address() {
        let factory = testnet_profile().factory_address;
        let deployer = deployer(MockClient::confirming(factory));
        let connection = ConnectionState::connected(OWNER, 1999);

        let tx = deployer.deploy(&connection, &request()).await.unwrap();

        assert_eq!(tx.status, DeployStatus::Confirmed);
        assert_eq!(tx.hash, Some(HASH));
        assert_eq!(tx.deployed_token, Some(TOKEN));
        assert!(tx.error.is_none());
    }

    #[tokio::test]
    async fn deploy_emits_token_deployed_on_confirmation() {
        let factory = testnet_profile().factory_address;
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let deployer = Deployer::new(
            Arc::new(MockClient::confirming(factory)),
            registry(),
            events,
            Duration::from_secs(30),
        );

        deployer
            .deploy(&ConnectionState::connected(OWNER, 1999), &request())
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            AppEvent::TokenDeployed {
                token: Some(TOKEN),
                tx_hash: HASH,
            }
        );
    }

    #[tokio::test]
    async fn missing_log_leaves_the_address_unset() {
        let factory = testnet_profile().factory_address;
        let client = MockClient {
            receipt_logs: Vec::new(),
            ..MockClient::confirming(factory)
        };
        let deployer = deployer(client);

        let tx = deployer
            .deploy(&ConnectionState::connected(OWNER, 1999), &request())
            .await
            .unwrap();

        assert_eq!(tx.status, DeployStatus::Confirmed);
        assert_eq!(tx.deployed_token, None);
    }

    #[tokio::test]
    async fn reverted_receipt_reports_failed() {
        let factory = testnet_profile().factory_address;
        let client = MockClient {
            receipt_status: false,
            ..MockClient::confirming(factory)
        };
        let deployer = deployer(client);

        let tx = deployer
            .deploy(&ConnectionState::connected(OWNER, 1999), &request())
            .await
            .unwrap();

        assert_eq!(tx.status, DeployStatus::Failed);
        assert!(tx.error.unwrap().contains("reverted"));
        assert_eq!(tx.deployed_token, None);
    }

    #[tokio::test]
    async fn deploy_rejects_when_disconnected() {
        let factory = testnet_profile().factory_address;
        let deployer = deployer(MockClient::confirming(factory));

        let err = deployer
            .deploy(&ConnectionState::disconnected(), &request())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::NotConnected));
    }

    #[tokio::test]
    async fn deploy_rejects_unsupported_chains_before_submission() {
        let factory = testnet_profile().factory_address;
        let deployer = deployer(MockClient::confirming(factory));

        let err = deployer
            .deploy(&ConnectionState::connected(OWNER, 5000), &request())
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::UnsupportedNetwork(5000)));
        assert_eq!(deployer.client.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deploy_rejects_not_ready_mainnet_before_submission() {
        let factory = testnet_profile().factory_address;
        let deployer = deployer(MockClient::confirming(factory));

        let err = deployer
            .deploy(&ConnectionState::connected(OWNER, 7131), &request())
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::NetworkNotReady(_)));
        assert_eq!(deployer.client.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_the_network() {
        let factory = testnet_profile().factory_address;
        let deployer = deployer(MockClient::confirming(factory));
        let bad = DeploymentRequest {
            payment_amount: "0.001".into(),
            ..request()
        };

        let err = deployer
            .deploy(&ConnectionState::connected(OWNER, 1999), &bad)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::Invalid(_)));
        assert_eq!(deployer.client.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_deploy_while_pending_is_rejected_not_queued() {
        let factory = testnet_profile().factory_address;
        let gate = Arc::new(Notify::new());
        let client = MockClient {
            gate: Some(gate.clone()),
            ..MockClient::confirming(factory)
        };
        let deployer = Arc::new(deployer(client));
        let connection = ConnectionState::connected(OWNER, 1999);

        let first = {
            let deployer = deployer.clone();
            tokio::spawn(async move { deployer.deploy(&connection, &request()).await })
        };

        // Let the first attempt reach the gated submission.
        while deployer.client.create_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let err = deployer.deploy(&connection, &request()).await.unwrap_err();
        assert!(matches!(err, DeployError::InProgress));
        assert_eq!(deployer.client.create_calls.load(Ordering::SeqCst), 1);

        gate.notify_one();
        let tx = first.await.unwrap().unwrap();
        assert_eq!(tx.status, DeployStatus::Confirmed);

        // The slot is free again once the first attempt finished.
        let tx = deployer.deploy(&connection, &request()).await.unwrap();
        assert_eq!(tx.status, DeployStatus::Confirmed);
    }
}
