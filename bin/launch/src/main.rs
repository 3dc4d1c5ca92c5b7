//! Mintpad launcher: deploys factory tokens and lists deployment history
//! from the command line.
//!
//! Commands:
//!   launch networks                                   show configured networks
//!   launch deploy <name> <symbol> <supply> <payment>  deploy a token (needs PRIVATE_KEY)
//!   launch history [owner] [filter]                   list tokens created by an account
//!
//! Configuration comes from the environment; see `Settings`.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use eyre::{Result, bail};
use mintpad_app::{
    DeployStatus, Deployer, DeploymentRequest, EventBus, HistoryAggregator, HistoryService,
    NetworkResolver, filter_tokens,
};
use mintpad_chain::client::RpcFactoryClient;
use mintpad_chain::provider::{self, TransportConfig};
use mintpad_chain::wallet::{KeyWallet, WalletGateway, WalletKind};
use mintpad_core::{NetworkRegistry, Settings, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    let settings = Settings::from_env()?;
    let registry = Arc::new(NetworkRegistry::from_settings(&settings)?);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("networks");

    match command {
        "networks" => networks(&registry),
        "deploy" => deploy(&settings, registry, &args[1..]).await?,
        "history" => history(&settings, registry, &args[1..]).await?,
        other => bail!("unknown command `{other}` (expected networks | deploy | history)"),
    }

    Ok(())
}

fn networks(registry: &NetworkRegistry) {
    for profile in registry.profiles() {
        let readiness = if profile.is_ready() {
            "ready"
        } else {
            "factory not deployed"
        };
        println!(
            "{:<8} chain {:>5}  {}  [{}]",
            profile.kind.to_string(),
            profile.chain_id,
            profile.name,
            readiness
        );
        println!("         rpc {}", profile.rpc_url);
        println!("         explorer {}", profile.explorer_url);
    }
    let default = registry.default_profile();
    println!("default: {} (chain {})", default.kind, default.chain_id);
}

async fn deploy(settings: &Settings, registry: Arc<NetworkRegistry>, args: &[String]) -> Result<()> {
    let [name, symbol, total_supply, payment_amount] = args else {
        bail!("usage: launch deploy <name> <symbol> <total-supply> <payment>");
    };
    let Some(key) = settings.private_key.as_deref() else {
        bail!("PRIVATE_KEY must be set to deploy");
    };
    let signer: PrivateKeySigner = key.parse()?;

    let transport = TransportConfig::from_settings(settings);
    let profile = registry.default_profile().clone();
    let http = provider::connect_http_with_signer(&profile.rpc_url, &transport, signer.clone())?;
    let client = Arc::new(RpcFactoryClient::new(http));
    tracing::info!(rpc = %profile.rpc_url, "Connected to RPC");

    let events = EventBus::default();
    let wallet = Arc::new(KeyWallet::new(signer.address(), &registry));
    let connection = wallet.connect(WalletKind::Local).await?;

    let resolver = NetworkResolver::new(registry.clone(), wallet.clone(), events.clone());
    let resolved = resolver.resolve();
    if let Some(advisory) = &resolved.advisory {
        tracing::warn!("{advisory}");
    }

    let aggregator = Arc::new(HistoryAggregator::new(client.clone(), registry.clone()));
    let mut history = HistoryService::new(aggregator, wallet.clone(), events.clone()).spawn();

    let deployer = Deployer::new(
        client,
        registry.clone(),
        events.clone(),
        transport.fee_cache_ttl,
    );

    let request = DeploymentRequest {
        name: name.clone(),
        symbol: symbol.clone(),
        total_supply: total_supply.clone(),
        description: String::new(),
        payment_amount: payment_amount.clone(),
    };

    let tx = deployer.deploy(&connection, &request).await?;

    match tx.status {
        DeployStatus::Confirmed => match tx.deployed_token {
            Some(token) => {
                println!("token deployed at {token}");
                println!(
                    "explorer: {}",
                    profile.explorer_link(&format!("/address/{token}"))
                );
            }
            None => println!("deployment confirmed; token address pending indexing"),
        },
        DeployStatus::Failed => {
            bail!(
                "deployment failed: {}",
                tx.error.unwrap_or_else(|| "unknown error".into())
            );
        }
        DeployStatus::Pending => unreachable!("deploy returns a terminal state"),
    }
    if let Some(hash) = tx.hash {
        println!("tx: {}", profile.explorer_link(&format!("/tx/{hash}")));
    }

    // The confirmation broadcast re-runs the history fetch; show the head.
    let refreshed = tokio::time::timeout(Duration::from_secs(30), history.changed()).await;
    if matches!(refreshed, Ok(Ok(()))) {
        if let Some(latest) = history.borrow().first() {
            println!("history head: {} ({})", latest.name, latest.symbol);
        }
    }

    Ok(())
}

async fn history(
    settings: &Settings,
    registry: Arc<NetworkRegistry>,
    args: &[String],
) -> Result<()> {
    let owner: Address = match args.first() {
        Some(raw) => raw.parse()?,
        None => match settings.private_key.as_deref() {
            Some(key) => key.parse::<PrivateKeySigner>()?.address(),
            None => bail!("pass an owner address or set PRIVATE_KEY"),
        },
    };
    let filter = args.get(1).map(String::as_str).unwrap_or("");

    let transport = TransportConfig::from_settings(settings);
    let profile = registry.default_profile().clone();
    let http = provider::connect_http(&profile.rpc_url, &transport)?;
    let client = Arc::new(RpcFactoryClient::new(http));

    let wallet = Arc::new(KeyWallet::new(owner, &registry));
    wallet.connect(WalletKind::Local).await?;

    let aggregator = HistoryAggregator::new(client, registry.clone());
    let tokens = aggregator.fetch(&wallet.connection()).await?;
    let tokens = filter_tokens(&tokens, filter);

    if tokens.is_empty() {
        println!("no tokens deployed by {owner} on {}", profile.name);
        return Ok(());
    }
    for token in &tokens {
        println!(
            "{}  {} ({})  supply {}",
            token.address, token.name, token.symbol, token.total_supply
        );
    }
    Ok(())
}
