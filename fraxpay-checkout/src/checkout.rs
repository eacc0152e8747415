//! Drives one checkout from the command line: load the product, wire the
//! orchestrator to the chain and backend, then approve and pay.

use std::sync::Arc;
use std::time::Duration;

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use fraxpay_core::chain::{Erc20StateReader, WalletSubmitter};
use fraxpay_core::checkout::{
    CheckoutAction, CheckoutContext, CheckoutError, FundingOption, NextAction, PaymentOrchestrator,
    PaymentReceipt,
};
use fraxpay_core::events::{CheckoutEvent, CheckoutEventReceiver, checkout_event_channel};
use fraxpay_core::order::{HttpOrderService, OrderServiceError};
use fraxpay_core::wallet::{WalletConnection, wallet_channel};
use fraxpay_sdk::amount::format_raw_amount;
use fraxpay_sdk::client::ClientError;
use kanau::processor::Processor;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::config::LoadedConfig;

type Orchestrator =
    PaymentOrchestrator<Erc20StateReader<DynProvider>, WalletSubmitter<DynProvider>, HttpOrderService>;

/// How often account state is re-read while waiting for an approval to land.
const ALLOWANCE_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Extra attempts at recording a payment that is already on chain.
const COMPLETION_RETRIES: u32 = 3;
const COMPLETION_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub product_id: String,
    /// Stop before the first transaction.
    pub dry_run: bool,
    /// Upper bound on waiting for an approval to become visible.
    pub allowance_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to load product: {0}")]
    Product(#[from] ClientError),

    #[error(transparent)]
    Order(#[from] OrderServiceError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("rpc endpoint serves chain {actual}, expected chain {expected}")]
    WrongChain { expected: u64, actual: u64 },

    #[error("wallet balance does not cover the price")]
    InsufficientFunds,

    #[error("approval not visible on chain after {0:?}")]
    AllowanceTimeout(Duration),

    #[error("interrupted by shutdown signal")]
    Interrupted,
}

/// Run the checkout to completion.
///
/// Returns `None` for a dry run.
pub async fn run(
    config: LoadedConfig,
    signer: PrivateKeySigner,
    options: RunOptions,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<Option<PaymentReceipt>, RunError> {
    let chain = config.checkout.chain.clone();
    let orders = HttpOrderService::from_config(&config.checkout.backend)?;

    let product = orders.client().get_product(&options.product_id).await?;
    info!(
        product_id = %options.product_id,
        name = %product.name,
        price = %product.price,
        merchant = %product.merchant_address,
        "Product loaded"
    );

    let account = signer.address();
    let provider = ProviderBuilder::new()
        .wallet(signer)
        .connect_http(chain.rpc_url.clone())
        .erased();
    let chain_id = provider
        .get_chain_id()
        .await
        .map_err(|e| RunError::Rpc(e.to_string()))?;
    if chain_id != chain.chain_id {
        return Err(RunError::WrongChain {
            expected: chain.chain_id,
            actual: chain_id,
        });
    }
    info!(%account, chain_id, token = %chain.token, "Wallet ready");

    let (wallet_tx, wallet_rx) = wallet_channel();
    let (events_tx, events_rx) = checkout_event_channel();
    let ctx = CheckoutContext {
        reader: Erc20StateReader::new(provider.clone(), chain.token, chain.payment_core),
        submitter: WalletSubmitter::new(provider),
        orders,
        wallet: wallet_rx,
        chain,
        pricing: config.checkout.pricing,
        events: events_tx,
    };
    let orchestrator = Arc::new(PaymentOrchestrator::new(
        ctx,
        options.product_id.clone(),
        product,
    ));
    let logger = tokio::spawn(log_events(events_rx));
    let watcher = {
        let orchestrator = orchestrator.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { orchestrator.run_wallet_watcher(shutdown_rx).await })
    };

    orchestrator.replace_shipping(config.shipping).await;
    wallet_tx.send_replace(WalletConnection::connected(account, chain_id));

    let decimals = config.checkout.pricing.token_decimals;
    let result = drive(&orchestrator, &options, decimals, shutdown_rx).await;

    // Closing the wallet channel stops the watcher; dropping the last
    // orchestrator handle closes the event channel.
    drop(wallet_tx);
    if let Err(e) = watcher.await {
        warn!(error = %e, "Wallet watcher task failed");
    }
    drop(orchestrator);
    if let Err(e) = logger.await {
        warn!(error = %e, "Event logger task failed");
    }

    result
}

async fn drive(
    orchestrator: &Orchestrator,
    options: &RunOptions,
    decimals: u32,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<Option<PaymentReceipt>, RunError> {
    orchestrator.process(CheckoutAction::Continue).await?;
    let required = orchestrator.required_amount()?;
    info!(
        amount = %format_raw_amount(required, decimals),
        raw_amount = %required,
        "Amount due"
    );

    loop {
        if *shutdown_rx.borrow() {
            return Err(RunError::Interrupted);
        }
        match orchestrator.next_action().await {
            NextAction::ConnectWallet | NextAction::Continue => {
                orchestrator.process(CheckoutAction::Continue).await?;
            }
            NextAction::FundWallet => {
                for option in orchestrator.funding_options().await {
                    match option {
                        FundingOption::Swap { shortfall } => info!(
                            shortfall = %format_raw_amount(shortfall, decimals),
                            "Swap into the payment token"
                        ),
                        FundingOption::Onramp {
                            provider,
                            shortfall,
                        } => info!(
                            provider,
                            shortfall = %format_raw_amount(shortfall, decimals),
                            "Buy the payment token through an on-ramp"
                        ),
                    }
                }
                return Err(RunError::InsufficientFunds);
            }
            NextAction::Approve => {
                if options.dry_run {
                    info!("Dry run: allowance must be approved before paying");
                    return Ok(None);
                }
                orchestrator.process(CheckoutAction::Approve).await?;
                wait_for_allowance(orchestrator, options.allowance_timeout, &mut shutdown_rx)
                    .await?;
            }
            NextAction::Pay => {
                if options.dry_run {
                    info!("Dry run: ready to pay");
                    return Ok(None);
                }
                return pay_with_completion_retry(orchestrator).await.map(Some);
            }
            NextAction::Done => return Ok(orchestrator.receipt().await),
        }
    }
}

async fn wait_for_allowance(
    orchestrator: &Orchestrator,
    timeout: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), RunError> {
    let deadline = tokio::time::Instant::now() + timeout;
    while !orchestrator.funds().await.has_allowance() {
        if tokio::time::Instant::now() >= deadline {
            return Err(RunError::AllowanceTimeout(timeout));
        }
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    return Err(RunError::Interrupted);
                }
            }
            _ = tokio::time::sleep(ALLOWANCE_POLL_INTERVAL) => {
                debug!("Waiting for approval to be mined");
                orchestrator.process(CheckoutAction::RefreshAccount).await?;
            }
        }
    }
    Ok(())
}

async fn pay_with_completion_retry(orchestrator: &Orchestrator) -> Result<PaymentReceipt, RunError> {
    let mut retries = 0;
    loop {
        match orchestrator.pay().await {
            Ok(receipt) => return Ok(receipt),
            Err(CheckoutError::CompletionFailed { tx_hash, .. }) if retries < COMPLETION_RETRIES => {
                retries += 1;
                warn!(
                    %tx_hash,
                    retry = retries,
                    "Payment is on chain but not recorded, retrying completion"
                );
                tokio::time::sleep(COMPLETION_RETRY_DELAY).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn log_events(mut events: CheckoutEventReceiver) {
    loop {
        match events.recv().await {
            Ok(event) => log_event(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event logger lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn log_event(event: CheckoutEvent) {
    match event {
        CheckoutEvent::StageChanged { from, to } => debug!(%from, %to, "Stage changed"),
        CheckoutEvent::AccountStateRefreshed(state) => debug!(
            balance = ?state.balance,
            allowance = ?state.allowance,
            "Account state refreshed"
        ),
        CheckoutEvent::OrderPrepared { order_id } => info!(%order_id, "Order prepared"),
        CheckoutEvent::TransactionSubmitted { call, tx_hash } => {
            info!(call, %tx_hash, "Transaction submitted")
        }
        CheckoutEvent::OrderCompleted {
            order_id,
            tx_hash,
            amount,
        } => info!(%order_id, %tx_hash, %amount, "Order completed"),
        CheckoutEvent::CompletionFailed {
            order_id,
            tx_hash,
            reason,
        } => warn!(%order_id, %tx_hash, reason = %reason, "Order completion failed"),
    }
}
