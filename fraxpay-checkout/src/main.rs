//! FraxPay checkout
//!
//! Pays for a merchant product in FRAX from the command line: fills the
//! shipping form from configuration, approves the payment contract when
//! needed, pays, and records the payment with the merchant backend.

mod checkout;
mod config;
mod shutdown;

use std::path::PathBuf;
use std::time::Duration;

use alloy::signers::local::PrivateKeySigner;
use anyhow::Context;
use clap::Parser;
use checkout::RunOptions;
use config::ConfigLoader;
use shutdown::spawn_shutdown_watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// FraxPay checkout - pay a merchant product with FRAX
#[derive(Parser, Debug)]
#[command(name = "fraxpay-checkout")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./fraxpay.toml")]
    config: PathBuf,

    /// Product to check out
    #[arg(short, long)]
    product: String,

    /// Hex-encoded private key of the paying wallet
    #[arg(long, env = "FRAXPAY_PRIVATE_KEY", hide_env_values = true)]
    private_key: String,

    /// Override the JSON-RPC endpoint from the configuration file
    #[arg(long)]
    rpc_url: Option<Url>,

    /// Read balances and report the next step without sending transactions
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// How long to wait for an approval to become visible on chain
    #[arg(long, default_value = "120")]
    allowance_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting fraxpay-checkout v{}", env!("CARGO_PKG_VERSION"));

    let loaded_config = ConfigLoader::new(&args.config, args.rpc_url.clone())
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let signer: PrivateKeySigner = args
        .private_key
        .trim()
        .parse()
        .context("invalid private key")?;

    let shutdown_rx = spawn_shutdown_watch();
    let options = RunOptions {
        product_id: args.product,
        dry_run: args.dry_run,
        allowance_timeout: Duration::from_secs(args.allowance_timeout_secs),
    };

    match checkout::run(loaded_config, signer, options, shutdown_rx).await? {
        Some(receipt) => tracing::info!(
            order_id = %receipt.order_id,
            tx_hash = %receipt.tx_hash,
            amount = %receipt.amount,
            "Payment complete"
        ),
        None => tracing::info!("Dry run finished, no transaction sent"),
    }
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,alloy=warn,reqwest=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
