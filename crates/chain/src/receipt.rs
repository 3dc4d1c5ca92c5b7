use alloy::primitives::{Address, TxHash};
use alloy::rpc::types::{Log, TransactionReceipt};

/// Confirmed-transaction summary: success flag plus the emitted logs.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub status: bool,
    pub block_number: Option<u64>,
    pub logs: Vec<Log>,
}

impl From<TransactionReceipt> for TxReceipt {
    fn from(receipt: TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            status: receipt.status(),
            block_number: receipt.block_number,
            logs: receipt.inner.logs().to_vec(),
        }
    }
}

/// Find the address of the token created by the factory in a receipt's logs.
///
/// A TokenCreated entry is a log emitted by the factory address carrying at
/// least three topics; the new token address is the lower 20 bytes of the
/// first indexed parameter (topic 1). Returns `None` when no such log is
/// present: the address is unknown then, never invented.
pub fn extract_created_token(logs: &[Log], factory: Address) -> Option<Address> {
    logs.iter().find_map(|log| {
        if log.address() != factory {
            return None;
        }
        let topics = log.topics();
        if topics.len() < 3 {
            return None;
        }
        Some(Address::from_slice(&topics[1][12..]))
    })
}
