use std::sync::Arc;

use thiserror::Error;

use mintpad_chain::wallet::{ConnectionState, WalletError, WalletGateway};
use mintpad_core::{NetworkKind, NetworkProfile, NetworkRegistry};

use crate::events::{AppEvent, EventBus};

/// Connection-session states, derived from the wallet's active chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Disconnected,
    Unsupported { chain_id: u64 },
    NotReady,
    Ready,
}

/// Live network resolution. Recomputed on every call; holds no cache.
#[derive(Debug, Clone)]
pub struct ResolvedNetwork {
    pub status: NetworkStatus,
    pub profile: Option<NetworkProfile>,
    /// Non-fatal guidance for unsupported/not-ready states; `None` as
    /// soon as the state derives to Ready.
    pub advisory: Option<String>,
}

impl ResolvedNetwork {
    pub fn is_supported(&self) -> bool {
        matches!(self.status, NetworkStatus::NotReady | NetworkStatus::Ready)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.status, NetworkStatus::Ready)
    }
}

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("no profile configured for network `{0}`")]
    UnknownNetwork(NetworkKind),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Derives network state from the wallet connection and forwards
/// switch/refresh requests.
pub struct NetworkResolver<W> {
    registry: Arc<NetworkRegistry>,
    wallet: Arc<W>,
    events: EventBus,
}

impl<W: WalletGateway> NetworkResolver<W> {
    pub fn new(registry: Arc<NetworkRegistry>, wallet: Arc<W>, events: EventBus) -> Self {
        Self {
            registry,
            wallet,
            events,
        }
    }

    /// Resolve against the wallet's current connection snapshot.
    pub fn resolve(&self) -> ResolvedNetwork {
        self.resolve_state(&self.wallet.connection())
    }

    /// Pure derivation from a connection snapshot; no side effects.
    pub fn resolve_state(&self, connection: &ConnectionState) -> ResolvedNetwork {
        let Some(chain_id) = connection.chain_id.filter(|_| connection.is_connected) else {
            return ResolvedNetwork {
                status: NetworkStatus::Disconnected,
                profile: None,
                advisory: None,
            };
        };

        match self.registry.profile_for_chain(chain_id) {
            None => ResolvedNetwork {
                status: NetworkStatus::Unsupported { chain_id },
                profile: None,
                advisory: Some(format!(
                    "Unsupported network (chain ID {chain_id}). Please switch to a supported network."
                )),
            },
            Some(profile) if !profile.is_ready() => ResolvedNetwork {
                status: NetworkStatus::NotReady,
                advisory: Some(format!(
                    "The {} contract is not yet deployed. Please switch networks or wait for deployment.",
                    profile.name
                )),
                profile: Some(profile.clone()),
            },
            Some(profile) => ResolvedNetwork {
                status: NetworkStatus::Ready,
                profile: Some(profile.clone()),
                advisory: None,
            },
        }
    }

    /// Ask the wallet to move to the given network. Resolver state is
    /// untouched; the new chain shows up in the next [`resolve`] call
    /// once the wallet has applied the change.
    ///
    /// [`resolve`]: NetworkResolver::resolve
    pub async fn switch_to(&self, kind: NetworkKind) -> Result<(), SwitchError> {
        let profile = self
            .registry
            .profile_for_kind(kind)
            .ok_or(SwitchError::UnknownNetwork(kind))?;
        self.switch_to_chain(profile.chain_id).await
    }

    pub async fn switch_to_chain(&self, chain_id: u64) -> Result<(), SwitchError> {
        tracing::info!(chain_id, "Requesting network switch");
        self.wallet.switch_chain(chain_id).await?;
        self.events.emit(AppEvent::NetworkChanged { chain_id });
        Ok(())
    }

    /// Nudge network-dependent consumers to re-run their fetches. There
    /// is no cached resolution to invalidate.
    pub fn refresh(&self) {
        self.events.emit(AppEvent::NetworkRefresh);
    }
}
