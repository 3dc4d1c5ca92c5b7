use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use alloy::primitives::{Address, address};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::AppError;

/// The two deployable VRCN networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Testnet,
    Mainnet,
}

impl Display for NetworkKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            NetworkKind::Testnet => write!(f, "testnet"),
            NetworkKind::Mainnet => write!(f, "mainnet"),
        }
    }
}

impl FromStr for NetworkKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "testnet" => Ok(NetworkKind::Testnet),
            "mainnet" => Ok(NetworkKind::Mainnet),
            other => Err(AppError::Config(format!("unknown network kind `{other}`"))),
        }
    }
}

/// Native currency of a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// A deployable network: chain id, endpoints and the factory contract.
///
/// `factory_address == Address::ZERO` means the factory is not yet
/// deployed on this network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub kind: NetworkKind,
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub explorer_url: String,
    pub factory_address: Address,
    pub currency: Currency,
}

impl NetworkProfile {
    /// Whether the factory contract is deployed on this network.
    pub fn is_ready(&self) -> bool {
        self.factory_address != Address::ZERO
    }

    /// Join a path onto the explorer base URL.
    pub fn explorer_link(&self, path: &str) -> String {
        format!("{}{}", self.explorer_url.trim_end_matches('/'), path)
    }
}

/// TokenFactory deployment on the DXB testnet.
const TESTNET_FACTORY: Address = address!("06200EcfC49FEf79d844Eb66596fD10094dE8860");

fn vrcn() -> Currency {
    Currency {
        name: "VRCN".into(),
        symbol: "VRCN".into(),
        decimals: 18,
    }
}

/// Static lookup from chain id to network profile.
///
/// Built once at startup from [`Settings`]; pure reads afterwards.
/// Profile-table mistakes are configuration errors raised here, not
/// runtime faults.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    profiles: Vec<NetworkProfile>,
    default: NetworkKind,
}

impl NetworkRegistry {
    /// Build a registry from an explicit profile table.
    ///
    /// Fails on an empty table, duplicate chain ids, a malformed RPC URL,
    /// or a default network with no profile.
    pub fn new(profiles: Vec<NetworkProfile>, default: NetworkKind) -> Result<Self, AppError> {
        if profiles.is_empty() {
            return Err(AppError::Config("network table is empty".into()));
        }
        for (i, profile) in profiles.iter().enumerate() {
            if profiles[..i].iter().any(|p| p.chain_id == profile.chain_id) {
                return Err(AppError::Config(format!(
                    "duplicate chain id {} in network table",
                    profile.chain_id
                )));
            }
            if !profile.rpc_url.starts_with("http") {
                return Err(AppError::Config(format!(
                    "invalid RPC URL `{}` for {}",
                    profile.rpc_url, profile.name
                )));
            }
        }
        if !profiles.iter().any(|p| p.kind == default) {
            return Err(AppError::Config(format!(
                "default network `{default}` has no profile"
            )));
        }
        Ok(Self { profiles, default })
    }

    /// Built-in VRCN networks, with endpoint and address overrides from
    /// settings applied.
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let mut testnet = NetworkProfile {
            kind: NetworkKind::Testnet,
            chain_id: 1999,
            name: "DXB Chain Testnet".into(),
            rpc_url: "https://rpc-testnet-1.vrcchain.com".into(),
            explorer_url: "https://dxb.vrcchain.com".into(),
            factory_address: TESTNET_FACTORY,
            currency: vrcn(),
        };
        let mut mainnet = NetworkProfile {
            kind: NetworkKind::Mainnet,
            chain_id: 7131,
            name: "VRCN Chain".into(),
            rpc_url: "https://rpc-mainnet-4.vrcchain.com".into(),
            explorer_url: "https://vrcchain.com".into(),
            factory_address: Address::ZERO,
            currency: vrcn(),
        };

        if let Some(url) = &settings.testnet_rpc_url {
            testnet.rpc_url = url.clone();
        }
        if let Some(url) = &settings.mainnet_rpc_url {
            mainnet.rpc_url = url.clone();
        }
        if let Some(raw) = &settings.testnet_factory_address {
            testnet.factory_address = parse_factory_address(raw, "testnet")?;
        }
        if let Some(raw) = &settings.mainnet_factory_address {
            mainnet.factory_address = parse_factory_address(raw, "mainnet")?;
        }

        Self::new(vec![testnet, mainnet], settings.default_network)
    }

    /// Exact chain-id lookup; no fuzzy matching.
    pub fn profile_for_chain(&self, chain_id: u64) -> Option<&NetworkProfile> {
        self.profiles.iter().find(|p| p.chain_id == chain_id)
    }

    pub fn profile_for_kind(&self, kind: NetworkKind) -> Option<&NetworkProfile> {
        self.profiles.iter().find(|p| p.kind == kind)
    }

    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.profile_for_chain(chain_id).is_some()
    }

    /// False for unsupported chains; otherwise true iff the factory is
    /// deployed there.
    pub fn is_ready(&self, chain_id: u64) -> bool {
        self.profile_for_chain(chain_id)
            .map(NetworkProfile::is_ready)
            .unwrap_or(false)
    }

    /// All profiles in declaration order.
    pub fn profiles(&self) -> &[NetworkProfile] {
        &self.profiles
    }

    /// Display fallback while no wallet is connected.
    pub fn default_profile(&self) -> &NetworkProfile {
        self.profile_for_kind(self.default)
            .unwrap_or(&self.profiles[0])
    }
}

fn parse_factory_address(raw: &str, network: &str) -> Result<Address, AppError> {
    raw.parse()
        .map_err(|_| AppError::Config(format!("invalid {network} factory address `{raw}`")))
}
