use std::future::Future;

use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{PendingTransactionBuilder, Provider};
use thiserror::Error;
use tokio::task::JoinSet;

use crate::abi::{Erc20, TokenFactory};
use crate::receipt::TxReceipt;

/// Transport and contract failures, classified into stable user-facing
/// messages. Raw provider errors never leave this crate.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Reverted(String),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Receipt(String),
}

impl ChainError {
    /// Classify a raw error message by pattern.
    pub fn classify(raw: impl ToString) -> Self {
        let raw = raw.to_string();
        let lower = raw.to_lowercase();
        if lower.contains("user rejected") || lower.contains("rejected the request") {
            Self::Rejected("Request rejected in wallet".into())
        } else if lower.contains("insufficient funds") {
            Self::Rejected("Insufficient funds for gas".into())
        } else if lower.contains("execution reverted") || lower.contains("call_exception") {
            Self::Reverted("Contract call reverted".into())
        } else if lower.contains("network") || lower.contains("connection") || lower.contains("timeout") {
            Self::Transport("Network error, check your connection and RPC".into())
        } else {
            Self::Transport(raw)
        }
    }
}

/// Per-token metadata reads; a `None` field is a failed read.
#[derive(Debug, Clone)]
pub struct TokenMetadata {
    pub address: Address,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub total_supply: Option<U256>,
}

/// Contract-facing capability consumed by the deployment and history
/// components: fee reads, paid token creation, receipt tracking and
/// batched token metadata reads.
pub trait FactoryClient: Send + Sync {
    /// Read the factory's token creation fee, in wei.
    fn creation_fee(
        &self,
        factory: Address,
    ) -> impl Future<Output = Result<U256, ChainError>> + Send;

    /// Submit a paid `createToken` call. Resolves to the transaction hash
    /// once the transport has accepted the signed transaction.
    fn create_token(
        &self,
        factory: Address,
        name: String,
        symbol: String,
        total_supply: U256,
        payment: U256,
    ) -> impl Future<Output = Result<TxHash, ChainError>> + Send;

    /// Wait for the receipt of a previously submitted transaction.
    fn wait_for_receipt(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<TxReceipt, ChainError>> + Send;

    /// All token addresses created by `owner` through the factory, in
    /// on-chain creation order.
    fn user_tokens(
        &self,
        factory: Address,
        owner: Address,
    ) -> impl Future<Output = Result<Vec<Address>, ChainError>> + Send;

    /// Name, symbol and supply for each address, fetched as one batch.
    /// Individual read failures come back as `None` fields; they never
    /// fail the batch.
    fn token_metadata(
        &self,
        tokens: Vec<Address>,
    ) -> impl Future<Output = Result<Vec<TokenMetadata>, ChainError>> + Send;
}

/// [`FactoryClient`] backed by an alloy provider.
#[derive(Debug, Clone)]
pub struct RpcFactoryClient<P> {
    provider: P,
}

impl<P> RpcFactoryClient<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P> FactoryClient for RpcFactoryClient<P>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    async fn creation_fee(&self, factory: Address) -> Result<U256, ChainError> {
        let contract = TokenFactory::new(factory, self.provider.clone());
        contract.creationFee().call().await.map_err(|e| {
            tracing::warn!(factory = %factory, error = %e, "creationFee read failed");
            ChainError::classify(e)
        })
    }

    async fn create_token(
        &self,
        factory: Address,
        name: String,
        symbol: String,
        total_supply: U256,
        payment: U256,
    ) -> Result<TxHash, ChainError> {
        let contract = TokenFactory::new(factory, self.provider.clone());
        let pending = contract
            .createToken(name, symbol, total_supply)
            .value(payment)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(factory = %factory, error = %e, "createToken submission failed");
                ChainError::classify(e)
            })?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, ChainError> {
        let pending = PendingTransactionBuilder::new(self.provider.root().clone(), hash);
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Receipt(format!("Transaction confirmation failed: {e}")))?;
        Ok(receipt.into())
    }

    async fn user_tokens(
        &self,
        factory: Address,
        owner: Address,
    ) -> Result<Vec<Address>, ChainError> {
        let contract = TokenFactory::new(factory, self.provider.clone());
        contract.getAllUserTokens(owner).call().await.map_err(|e| {
            tracing::warn!(factory = %factory, owner = %owner, error = %e, "getAllUserTokens read failed");
            ChainError::classify(e)
        })
    }

    async fn token_metadata(&self, tokens: Vec<Address>) -> Result<Vec<TokenMetadata>, ChainError> {
        let mut set = JoinSet::new();
        for (index, address) in tokens.iter().copied().enumerate() {
            let provider = self.provider.clone();
            set.spawn(async move {
                let token = Erc20::new(address, provider);
                let name_call = token.name();
                let symbol_call = token.symbol();
                let total_supply_call = token.totalSupply();
                let (name, symbol, total_supply) = tokio::join!(
                    name_call.call(),
                    symbol_call.call(),
                    total_supply_call.call(),
                );
                let meta = TokenMetadata {
                    address,
                    name: name.ok(),
                    symbol: symbol.ok(),
                    total_supply: total_supply.ok(),
                };
                (index, meta)
            });
        }

        let mut out: Vec<Option<TokenMetadata>> = vec![None; tokens.len()];
        while let Some(joined) = set.join_next().await {
            let (index, meta) =
                joined.map_err(|e| ChainError::Transport(format!("metadata read failed: {e}")))?;
            out[index] = Some(meta);
        }
        Ok(out.into_iter().flatten().collect())
    }
}
