use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::sync::RwLock;

use alloy::primitives::Address;
use thiserror::Error;

use mintpad_core::NetworkRegistry;

/// Errors surfaced by a wallet gateway. All recoverable: the user can
/// retry or pick another connector.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no {0} connector is available")]
    NoConnector(WalletKind),

    #[error("request rejected by wallet: {0}")]
    Rejected(String),

    #[error("wallet cannot switch to chain {0}")]
    UnsupportedChain(u64),
}

/// Known wallet connector kinds, plus a fallback for anything else.
///
/// Display metadata lives here instead of being keyed off raw connector
/// identifier strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletKind {
    MetaMask,
    WalletConnect,
    Coinbase,
    Local,
    Other(String),
}

impl WalletKind {
    /// Map a connector identifier to a kind.
    pub fn from_id(id: &str) -> Self {
        match id {
            "metaMask" | "io.metamask" | "injected" => Self::MetaMask,
            "walletConnect" => Self::WalletConnect,
            "coinbaseWallet" | "coinbaseWalletSDK" => Self::Coinbase,
            "local" => Self::Local,
            other => Self::Other(other.to_string()),
        }
    }

    /// Human-readable connector name.
    pub fn display_name(&self) -> &str {
        match self {
            Self::MetaMask => "MetaMask",
            Self::WalletConnect => "WalletConnect",
            Self::Coinbase => "Coinbase Wallet",
            Self::Local => "Local Key",
            Self::Other(id) => id,
        }
    }
}

impl Display for WalletKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Wallet connection snapshot. Owned by the gateway; read-only downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    pub is_connected: bool,
}

impl ConnectionState {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn connected(address: Address, chain_id: u64) -> Self {
        Self {
            address: Some(address),
            chain_id: Some(chain_id),
            is_connected: true,
        }
    }
}

/// Wallet-connection capability: list connectors, connect and disconnect,
/// expose the active account/chain, and request chain switches.
pub trait WalletGateway: Send + Sync {
    fn connectors(&self) -> Vec<WalletKind>;

    fn connect(
        &self,
        kind: WalletKind,
    ) -> impl Future<Output = Result<ConnectionState, WalletError>> + Send;

    fn disconnect(&self);

    /// Current connection snapshot.
    fn connection(&self) -> ConnectionState;

    /// Ask the wallet to move to another chain. The wallet may refuse;
    /// the new chain is observed through [`WalletGateway::connection`]
    /// once the wallet has applied the change.
    fn switch_chain(&self, chain_id: u64) -> impl Future<Output = Result<(), WalletError>> + Send;
}

/// Key-backed wallet for non-browser environments.
///
/// The chains it can switch to are the registry profiles; a switch to an
/// unknown chain is refused the same way a browser wallet refuses an
/// unknown `wallet_switchEthereumChain` request.
pub struct KeyWallet {
    address: Address,
    known_chains: Vec<u64>,
    default_chain_id: u64,
    state: RwLock<ConnectionState>,
}

impl KeyWallet {
    pub fn new(address: Address, registry: &NetworkRegistry) -> Self {
        Self {
            address,
            known_chains: registry.profiles().iter().map(|p| p.chain_id).collect(),
            default_chain_id: registry.default_profile().chain_id,
            state: RwLock::new(ConnectionState::disconnected()),
        }
    }
}

impl WalletGateway for KeyWallet {
    fn connectors(&self) -> Vec<WalletKind> {
        vec![WalletKind::Local]
    }

    async fn connect(&self, kind: WalletKind) -> Result<ConnectionState, WalletError> {
        if kind != WalletKind::Local {
            return Err(WalletError::NoConnector(kind));
        }
        let connected = ConnectionState::connected(self.address, self.default_chain_id);
        *self.state.write().expect("wallet state lock poisoned") = connected;
        tracing::info!(address = %self.address, chain_id = self.default_chain_id, "Wallet connected");
        Ok(connected)
    }

    fn disconnect(&self) {
        *self.state.write().expect("wallet state lock poisoned") =
            ConnectionState::disconnected();
        tracing::info!(address = %self.address, "Wallet disconnected");
    }

    fn connection(&self) -> ConnectionState {
        *self.state.read().expect("wallet state lock poisoned")
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        if !self.known_chains.contains(&chain_id) {
            return Err(WalletError::UnsupportedChain(chain_id));
        }
        let mut state = self.state.write().expect("wallet state lock poisoned");
        if !state.is_connected {
            return Err(WalletError::Rejected("wallet is not connected".into()));
        }
        state.chain_id = Some(chain_id);
        tracing::info!(chain_id, "Wallet switched chain");
        Ok(())
    }
}
