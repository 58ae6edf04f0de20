use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use xrpl_escrow_queue::application::app::{App, SessionConfig};
use xrpl_escrow_queue::application::balance::ReserveConfig;
use xrpl_escrow_queue::infrastructure::channel_reporter::ChannelReporter;
use xrpl_escrow_queue::infrastructure::memory::InMemoryOutcomeLog;
use xrpl_escrow_queue::infrastructure::rpc_client::RpcLedgerClient;
use xrpl_escrow_queue::infrastructure::rpc_wallet::RpcWallet;
use xrpl_escrow_queue::infrastructure::shutdown::ShutdownChannel;
use xrpl_escrow_queue::infrastructure::wallet::WalletProvider;
use xrpl_escrow_queue::service;

/// Wallet seeds never go on the command line.
const SEED_ENV: &str = "ESCROW_QUEUE_SEED";

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "Ordered escrow submission queue for the XRP Ledger with REST API"
)]
struct EscrowQueueProgram {
    /// JSON-RPC endpoint of the ledger node
    #[arg(short, long)]
    rpc_endpoint: String,

    /// Classic address the queue submits for
    #[arg(short, long)]
    account: String,

    /// Listen port REST API
    #[arg(short, long, default_value_t = 3000)]
    listen_port: u16,

    /// Network fee assumed per transaction, in drops
    #[arg(long, default_value_t = 12)]
    fee_drops: u64,

    /// Default delay between consecutive submissions, in milliseconds
    #[arg(long, default_value_t = 2000)]
    submit_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = EscrowQueueProgram::parse();
    let seed = std::env::var(SEED_ENV)
        .map_err(|_| anyhow::anyhow!("{SEED_ENV} must be set to the wallet seed"))?;

    // Create a shutdown channel
    let (shutdown_sender, _) = broadcast::channel(1);

    let client = RpcLedgerClient::from_url(&args.rpc_endpoint);
    let wallet = RpcWallet::derive(&args.rpc_endpoint, &seed).await?;
    if !wallet.is_valid_address(&args.account) {
        anyhow::bail!("{} is not a valid classic address", args.account);
    }
    if wallet.address() != args.account {
        anyhow::bail!(
            "derived wallet address {} does not match account {}",
            wallet.address(),
            args.account
        );
    }

    let shutdown = ShutdownChannel::new(shutdown_sender.clone());
    let outcomes = Arc::new(InMemoryOutcomeLog::default());
    let reporter = ChannelReporter::new(outcomes.clone(), shutdown.clone());

    let config = SessionConfig {
        account: args.account,
        fee_drops: args.fee_drops,
        reserves: ReserveConfig::default(),
        submit_delay: Duration::from_millis(args.submit_delay_ms),
    };
    let app = Arc::new(App::new(
        config,
        client,
        wallet,
        reporter,
        outcomes,
        shutdown_sender.clone(),
    ));

    // Start the API server
    let server_handle = tokio::spawn(service::api::start_server(
        shutdown_sender.clone(),
        app,
        args.listen_port,
    ));

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::warn!("Received Ctrl+C, shutting down...");
        }
    }

    shutdown.notify();

    // Wait for tasks to complete
    let _ = tokio::join!(server_handle);

    tracing::info!("Shutdown complete");
    Ok(())
}
