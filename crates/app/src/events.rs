use alloy::primitives::{Address, TxHash};
use tokio::sync::broadcast;

/// Cross-component signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// A deployment confirmed. `token` is `None` when the receipt carried
    /// no recognisable TokenCreated log.
    TokenDeployed {
        token: Option<Address>,
        tx_hash: TxHash,
    },
    /// The wallet confirmed a move to a new chain.
    NetworkChanged { chain_id: u64 },
    /// Network-dependent consumers should re-run their fetches.
    NetworkRefresh,
}

/// Broadcast channel connecting the orchestrator, resolver and history.
///
/// Handles are cheap clones of the same channel. Emitting with no live
/// subscriber is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: AppEvent) {
        // Err here only means nobody is listening right now.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}
