pub mod abi;
pub mod client;
pub mod provider;
pub mod receipt;
pub mod wallet;

pub use abi::{Erc20, TokenFactory};
pub use client::{ChainError, FactoryClient, RpcFactoryClient, TokenMetadata};
pub use provider::{
    ReadProvider, SignerProvider, TransportConfig, connect_http, connect_http_with_signer,
};
pub use receipt::{TxReceipt, extract_created_token};
pub use wallet::{ConnectionState, KeyWallet, WalletError, WalletGateway, WalletKind};
