//! fourstrike - Launchpad Token Sniper for BSC

use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use fourstrike::adapters::chain::http::HttpRpcConfig;
use fourstrike::adapters::{HttpRpc, LaunchpadTradeExecutor, LocalSigner};
use fourstrike::campaign::marketcap::{DEFAULT_BASE_TOKEN, DEFAULT_FACTORY};
use fourstrike::campaign::{CampaignScheduler, MarketCapProbe};
use fourstrike::config::{load_config, load_wallets, Config};
use fourstrike::detect::LaunchDetector;
use fourstrike::domain::campaign::{Campaign, CampaignStats, CampaignStatus};
use fourstrike::domain::task::{LaunchTask, LogLevel, SnipeEvent};
use fourstrike::execute::NonceSequencer;
use fourstrike::launchpad::predict_token_address;
use fourstrike::ports::rpc::ChainRpc;
use fourstrike::ports::signer::TransactionSigner;
use fourstrike::ports::trade::TradeExecutor;

/// fourstrike - launchpad token sniper and campaign trader for BSC
#[derive(Parser, Debug)]
#[command(
    name = "fourstrike",
    version = env!("CARGO_PKG_VERSION"),
    about = "Launchpad token sniper for BSC",
    long_about = "fourstrike watches a creator wallet across three redundant \
                  detection channels, predicts the new token's CREATE2 address \
                  from the pending pool, and buys from many wallets in parallel."
)]
struct CliApp {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch a creator and snipe their next token launch
    Snipe(SnipeCmd),

    /// Run a recurring pump/dump campaign against a token
    Campaign(CampaignCmd),

    /// Predict the token address from createAndBuy calldata
    Predict(PredictCmd),

    /// Read a token's market-cap proxy from its trading pair
    Probe(ProbeCmd),
}

#[derive(Parser, Debug)]
struct SnipeCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Override the watched creator address
    #[arg(long, value_name = "ADDRESS")]
    creator: Option<Address>,
}

#[derive(Parser, Debug)]
struct CampaignCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,
}

#[derive(Parser, Debug)]
struct PredictCmd {
    /// createAndBuy calldata, hex-encoded (with or without 0x)
    #[arg(value_name = "CALLDATA")]
    calldata: String,
}

#[derive(Parser, Debug)]
struct ProbeCmd {
    /// Token address
    #[arg(value_name = "TOKEN")]
    token: Address,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env holds endpoint overrides, never keys
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    init_logging(app.verbose, app.debug);

    match app.command {
        Command::Snipe(cmd) => snipe_command(cmd).await,
        Command::Campaign(cmd) => campaign_command(cmd).await,
        Command::Predict(cmd) => predict_command(cmd),
        Command::Probe(cmd) => probe_command(cmd).await,
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

fn build_rpc(config: &Config) -> Result<Arc<HttpRpc>> {
    let rpc = HttpRpc::with_config(HttpRpcConfig {
        url: config.chain.get_http_rpc(),
        timeout: std::time::Duration::from_secs(config.chain.request_timeout_secs),
        ..HttpRpcConfig::default()
    })
    .context("failed to create RPC client")?;
    Ok(Arc::new(rpc))
}

async fn snipe_command(cmd: SnipeCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("failed to load configuration")?;
    let Some(snipe) = config.snipe.clone() else {
        bail!(
            "no [snipe] section in {} - add one or pass a different --config",
            cmd.config.display()
        );
    };

    let wallets = load_wallets(&snipe.wallets_path).context("failed to load wallets")?;
    let creator = cmd.creator.unwrap_or(snipe.target_creator);

    let mut task = LaunchTask::new(
        format!("snipe-{creator}"),
        creator,
        snipe.buy_amount_bnb,
    )
    .with_wallets(wallets)
    .with_gas(snipe.gas());
    task.custom_http_rpc = snipe.custom_http_rpc.clone();
    task.custom_wss_rpc = snipe.custom_wss_rpc.clone();

    // task-specific endpoints win over the [chain] section
    let http_url = task
        .custom_http_rpc
        .clone()
        .unwrap_or_else(|| config.chain.get_http_rpc());
    let wss_url = task
        .custom_wss_rpc
        .clone()
        .or_else(|| config.chain.get_wss_rpc());
    let rpc = Arc::new(
        HttpRpc::with_config(HttpRpcConfig {
            url: http_url,
            timeout: std::time::Duration::from_secs(config.chain.request_timeout_secs),
            ..HttpRpcConfig::default()
        })
        .context("failed to create RPC client")?,
    );

    let (detector, mut events) = LaunchDetector::new(
        task,
        rpc as Arc<dyn ChainRpc>,
        Arc::new(LocalSigner::new()) as Arc<dyn TransactionSigner>,
        Arc::new(NonceSequencer::new()),
        config.chain.chain_id,
        wss_url,
    );
    let handle = detector.handle();

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown signal received");
        handle.stop();
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    });

    let status = detector.run().await;
    printer.await.ok();
    println!("task finished: {status}");
    Ok(())
}

fn print_event(event: &SnipeEvent) {
    match event {
        SnipeEvent::Log(entry) => {
            let tag = match entry.level {
                LogLevel::Info => "INFO",
                LogLevel::Success => "OK",
                LogLevel::Warning => "WARN",
                LogLevel::Error => "ERR",
            };
            println!("[{tag}] {}", entry.message);
        }
        SnipeEvent::LaunchDetected(launch) => {
            println!(
                "* launch detected: token {} (tx {}, via {})",
                launch.token, launch.tx_hash, launch.source
            );
        }
        SnipeEvent::BuyComplete(outcomes) => {
            for outcome in outcomes {
                match (&outcome.tx_hash, &outcome.error) {
                    (Some(hash), _) => println!("  {} -> {hash}", outcome.wallet),
                    (None, Some(error)) => println!("  {} -> FAILED: {error}", outcome.wallet),
                    (None, None) => println!("  {} -> FAILED", outcome.wallet),
                }
            }
        }
        SnipeEvent::StatusChange(status) => println!("status: {status}"),
    }
}

async fn campaign_command(cmd: CampaignCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("failed to load configuration")?;
    let Some(section) = config.campaign.clone() else {
        bail!(
            "no [campaign] section in {} - add one or pass a different --config",
            cmd.config.display()
        );
    };

    let wallets = load_wallets(&section.wallets_path).context("failed to load wallets")?;
    let rpc = build_rpc(&config)?;
    let nonces = Arc::new(NonceSequencer::new());
    let signer = Arc::new(LocalSigner::new());

    let trades = Arc::new(LaunchpadTradeExecutor::new(
        Arc::clone(&rpc) as Arc<dyn ChainRpc>,
        signer as Arc<dyn TransactionSigner>,
        Arc::clone(&nonces),
        config.chain.chain_id,
    ));

    let factory = section.factory.unwrap_or(DEFAULT_FACTORY);
    let base_token = section.base_token.unwrap_or(DEFAULT_BASE_TOKEN);
    let probe = Arc::new(MarketCapProbe::new(
        Arc::clone(&rpc) as Arc<dyn ChainRpc>,
        factory,
        base_token,
    ));

    let campaign = Campaign {
        id: format!("campaign-{}", section.name),
        name: section.name.clone(),
        mode: section.mode,
        token: section.token,
        amount_min_bnb: section.amount_min_bnb,
        amount_max_bnb: section.amount_max_bnb,
        interval_secs: section.interval_secs,
        thread_count: section.thread_count,
        stop: section.stop_condition()?,
        wallets,
        gas: section.gas(),
        status: CampaignStatus::Stopped,
        stats: CampaignStats::default(),
    };

    let scheduler = Arc::new(
        CampaignScheduler::new(campaign, trades as Arc<dyn TradeExecutor>).with_probe(probe),
    );

    let stopper = Arc::clone(&scheduler);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown signal received");
        stopper.stop().await;
    });

    scheduler.run().await.context("campaign failed")?;

    let campaign = scheduler.campaign();
    let campaign = campaign.read().await;
    println!(
        "campaign '{}' finished: {} trade(s), {:.4} BNB spent, {}s elapsed",
        campaign.name,
        campaign.stats.executed_count,
        campaign.stats.spent_amount,
        campaign.stats.elapsed_secs
    );
    Ok(())
}

fn predict_command(cmd: PredictCmd) -> Result<()> {
    let calldata = hex::decode(cmd.calldata.trim_start_matches("0x"))
        .context("calldata is not valid hex")?;

    match predict_token_address(&calldata) {
        Some(token) => println!("predicted token address: {token}"),
        None => println!(
            "no prediction possible (not a createAndBuy call or calldata too short); \
             the confirmed-log path would be needed"
        ),
    }
    Ok(())
}

async fn probe_command(cmd: ProbeCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("failed to load configuration")?;
    let rpc = build_rpc(&config)?;

    let (factory, base_token) = match config.campaign.as_ref() {
        Some(section) => (
            section.factory.unwrap_or(DEFAULT_FACTORY),
            section.base_token.unwrap_or(DEFAULT_BASE_TOKEN),
        ),
        None => (DEFAULT_FACTORY, DEFAULT_BASE_TOKEN),
    };

    let probe = MarketCapProbe::new(rpc as Arc<dyn ChainRpc>, factory, base_token);
    let cap = probe
        .market_cap(cmd.token)
        .await
        .context("market probe failed")?;
    let price = probe.price(cmd.token).await.context("price probe failed")?;

    println!("token {}", cmd.token);
    println!("  base reserve (market-cap proxy): {cap:.6}");
    println!("  price in base units: {price:.12}");
    Ok(())
}
