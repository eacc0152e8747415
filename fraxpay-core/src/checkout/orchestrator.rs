//! Session state and the pay protocol.

use std::sync::atomic::{AtomicBool, Ordering};

use alloy::primitives::{Address, TxHash, U256};
use fraxpay_sdk::objects::{OrderId, Product, ShippingField, ShippingInfo};
use kanau::processor::Processor;
use tokio::sync::{RwLock, watch};
use tracing::{debug, error, info, warn};

use super::{
    CheckoutAction, CheckoutError, FundingOption, FundsSnapshot, NextAction, ONRAMP_PROVIDERS,
    PaymentReceipt, Stage,
};
use crate::chain::{ChainAccountState, ChainStateReader, ContractCall, TransactionSubmitter};
use crate::config::{ChainConfig, PricingConfig};
use crate::events::{CheckoutEvent, CheckoutEventSender};
use crate::order::OrderService;
use crate::wallet::{WalletConnection, WalletReceiver};

/// Collaborators and settings a [`PaymentOrchestrator`] is built from.
pub struct CheckoutContext<R, S, O> {
    pub reader: R,
    pub submitter: S,
    pub orders: O,
    pub wallet: WalletReceiver,
    pub chain: ChainConfig,
    pub pricing: PricingConfig,
    pub events: CheckoutEventSender,
}

/// A payment that is on chain but not yet acknowledged by the backend.
#[derive(Debug, Clone)]
struct UnsettledPayment {
    order_id: OrderId,
    tx_hash: TxHash,
    amount: U256,
    submitted_at: time::OffsetDateTime,
}

#[derive(Debug)]
struct Session {
    stage: Stage,
    shipping: ShippingInfo,
    /// Bumped on every shipping mutation.
    shipping_revision: u64,
    /// Valid only for `shipping` at `shipping_revision`.
    cached_order_id: Option<OrderId>,
    account: Option<ChainAccountState>,
    /// Address `account` was read for.
    account_owner: Option<Address>,
    unsettled: Option<UnsettledPayment>,
    receipt: Option<PaymentReceipt>,
    /// Bumped on every back-transition and reset.
    epoch: u64,
}

impl Session {
    fn new() -> Self {
        Self {
            stage: Stage::ShippingAndConnect,
            shipping: ShippingInfo::default(),
            shipping_revision: 0,
            cached_order_id: None,
            account: None,
            account_owner: None,
            unsettled: None,
            receipt: None,
            epoch: 0,
        }
    }
}

/// Held for the duration of an approve or pay.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, CheckoutError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| CheckoutError::ActionInFlight)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// What approve and pay both need to know before touching the chain.
struct PaymentPreconditions {
    account: Address,
    required: U256,
    funds: FundsSnapshot,
    epoch: u64,
}

/// Drives one checkout session for one product.
///
/// Session state sits behind a [`RwLock`] that is never held across a call
/// to a collaborator. Approve and pay share an in-flight guard, so a second
/// click while one is running fails fast with
/// [`CheckoutError::ActionInFlight`].
pub struct PaymentOrchestrator<R, S, O> {
    product_id: String,
    product: Product,
    reader: R,
    submitter: S,
    orders: O,
    wallet: WalletReceiver,
    chain: ChainConfig,
    pricing: PricingConfig,
    session: RwLock<Session>,
    in_flight: AtomicBool,
    stage_tx: watch::Sender<Stage>,
    events: CheckoutEventSender,
}

impl<R, S, O> PaymentOrchestrator<R, S, O>
where
    R: ChainStateReader,
    S: TransactionSubmitter,
    O: OrderService,
{
    pub fn new(ctx: CheckoutContext<R, S, O>, product_id: impl Into<String>, product: Product) -> Self {
        let (stage_tx, _) = watch::channel(Stage::ShippingAndConnect);
        Self {
            product_id: product_id.into(),
            product,
            reader: ctx.reader,
            submitter: ctx.submitter,
            orders: ctx.orders,
            wallet: ctx.wallet,
            chain: ctx.chain,
            pricing: ctx.pricing,
            session: RwLock::new(Session::new()),
            in_flight: AtomicBool::new(false),
            stage_tx,
            events: ctx.events,
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    /// Receives every stage change.
    pub fn subscribe_stage(&self) -> watch::Receiver<Stage> {
        self.stage_tx.subscribe()
    }

    fn wallet_state(&self) -> WalletConnection {
        *self.wallet.borrow()
    }

    fn emit(&self, event: CheckoutEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn transition(&self, session: &mut Session, to: Stage) {
        let from = session.stage;
        if from == to {
            return;
        }
        if to == Stage::ShippingAndConnect {
            session.epoch += 1;
        }
        session.stage = to;
        info!(%from, %to, product_id = %self.product_id, "Checkout stage changed");
        self.stage_tx.send_replace(to);
        self.emit(CheckoutEvent::StageChanged { from, to });
    }

    /// Apply the current wallet facts to the session.
    fn reconcile(&self, session: &mut Session, wallet: &WalletConnection) {
        if session.account_owner.is_some() && session.account_owner != wallet.account() {
            debug!("Wallet account changed, dropping cached account state");
            session.account = None;
            session.account_owner = None;
        }
        if !wallet.is_connected && session.stage == Stage::ConfirmPayment {
            info!("Wallet disconnected during payment confirmation");
            self.transition(session, Stage::ShippingAndConnect);
        }
    }

    /// Current stage, after applying the latest wallet facts.
    pub async fn stage(&self) -> Stage {
        let wallet = self.wallet_state();
        let mut session = self.session.write().await;
        self.reconcile(&mut session, &wallet);
        session.stage
    }

    pub async fn shipping_info(&self) -> ShippingInfo {
        self.session.read().await.shipping.clone()
    }

    pub async fn cached_order_id(&self) -> Option<OrderId> {
        self.session.read().await.cached_order_id.clone()
    }

    pub async fn account_state(&self) -> Option<ChainAccountState> {
        self.session.read().await.account
    }

    pub async fn receipt(&self) -> Option<PaymentReceipt> {
        self.session.read().await.receipt.clone()
    }

    /// Whether a sent payment still awaits backend acknowledgement.
    pub async fn has_unsettled_payment(&self) -> bool {
        self.session.read().await.unsettled.is_some()
    }

    /// Raw token amount this product costs. Malformed and zero prices are
    /// rejected.
    pub fn required_amount(&self) -> Result<U256, CheckoutError> {
        let price = &self.product.price;
        let amount = self
            .pricing
            .required_amount(price)
            .map_err(|e| CheckoutError::InvalidPrice {
                price: price.clone(),
                reason: e.to_string(),
            })?;
        if amount.is_zero() {
            return Err(CheckoutError::InvalidPrice {
                price: price.clone(),
                reason: "amount is zero".to_string(),
            });
        }
        Ok(amount)
    }

    pub async fn funds(&self) -> FundsSnapshot {
        let account = self.session.read().await.account;
        FundsSnapshot::new(account, self.required_amount().ok())
    }

    /// Funding routes for the current shortfall. Empty unless the balance is
    /// known to be below the price.
    pub async fn funding_options(&self) -> Vec<FundingOption> {
        let funds = self.funds().await;
        if !funds.has_insufficient_funds() {
            return Vec::new();
        }
        let (Some(balance), Some(required)) = (funds.balance, funds.required) else {
            return Vec::new();
        };
        let shortfall = required.saturating_sub(balance);
        std::iter::once(FundingOption::Swap { shortfall })
            .chain(
                ONRAMP_PROVIDERS
                    .into_iter()
                    .map(|provider| FundingOption::Onramp { provider, shortfall }),
            )
            .collect()
    }

    pub async fn next_action(&self) -> NextAction {
        let wallet = self.wallet_state();
        let (stage, unsettled) = {
            let mut session = self.session.write().await;
            self.reconcile(&mut session, &wallet);
            (session.stage, session.unsettled.is_some())
        };
        match stage {
            Stage::ShippingAndConnect if !wallet.is_connected => NextAction::ConnectWallet,
            Stage::ShippingAndConnect => NextAction::Continue,
            Stage::Success => NextAction::Done,
            Stage::ConfirmPayment => {
                if unsettled {
                    return NextAction::Pay;
                }
                let funds = self.funds().await;
                if funds.has_insufficient_funds() {
                    NextAction::FundWallet
                } else if funds.has_allowance() {
                    NextAction::Pay
                } else {
                    NextAction::Approve
                }
            }
        }
    }

    /// Set one shipping field. Any mutation invalidates the cached order.
    pub async fn update_shipping(&self, field: ShippingField, value: impl Into<String>) {
        let mut session = self.session.write().await;
        session.shipping.set(field, value);
        Self::shipping_mutated(&mut session);
        debug!(%field, revision = session.shipping_revision, "Shipping field updated");
    }

    /// Replace the whole shipping snapshot.
    pub async fn replace_shipping(&self, shipping: ShippingInfo) {
        let mut session = self.session.write().await;
        session.shipping = shipping;
        Self::shipping_mutated(&mut session);
    }

    fn shipping_mutated(session: &mut Session) {
        session.shipping_revision += 1;
        if let Some(order_id) = session.cached_order_id.take() {
            debug!(%order_id, "Shipping changed, discarding prepared order");
        }
    }

    /// Re-read balance and allowance for the connected account.
    ///
    /// Returns `None` when no account is connected. A result for an account
    /// that is no longer connected is dropped.
    pub async fn refresh_account_state(&self) -> Option<ChainAccountState> {
        let owner = self.wallet_state().account();
        let state = self.reader.fetch_account_state(owner).await?;

        let wallet = self.wallet_state();
        let mut session = self.session.write().await;
        if wallet.account() != owner {
            debug!("Account changed during refresh, discarding result");
            return None;
        }
        session.account = Some(state);
        session.account_owner = owner;
        drop(session);
        self.emit(CheckoutEvent::AccountStateRefreshed(state));
        Some(state)
    }

    /// `ShippingAndConnect → ConfirmPayment`.
    pub async fn continue_to_payment(&self) -> Result<Stage, CheckoutError> {
        let wallet = self.wallet_state();
        {
            let mut session = self.session.write().await;
            self.reconcile(&mut session, &wallet);
            if session.stage != Stage::ShippingAndConnect {
                return Err(CheckoutError::InvalidStage {
                    expected: Stage::ShippingAndConnect,
                    actual: session.stage,
                });
            }
            if !wallet.is_connected {
                return Err(CheckoutError::WalletNotConnected);
            }
            let missing = session.shipping.missing_fields(&self.product.shipping);
            if !missing.is_empty() {
                return Err(CheckoutError::MissingShippingFields(missing));
            }
            self.transition(&mut session, Stage::ConfirmPayment);
        }
        self.refresh_account_state().await;
        Ok(Stage::ConfirmPayment)
    }

    /// `ConfirmPayment → ShippingAndConnect`.
    pub async fn previous(&self) -> Result<Stage, CheckoutError> {
        let wallet = self.wallet_state();
        let mut session = self.session.write().await;
        self.reconcile(&mut session, &wallet);
        if session.stage != Stage::ConfirmPayment {
            return Err(CheckoutError::InvalidStage {
                expected: Stage::ConfirmPayment,
                actual: session.stage,
            });
        }
        self.transition(&mut session, Stage::ShippingAndConnect);
        Ok(Stage::ShippingAndConnect)
    }

    /// `Success → ShippingAndConnect`, keeping the shipping details.
    pub async fn place_another(&self) -> Result<Stage, CheckoutError> {
        let mut session = self.session.write().await;
        if session.stage != Stage::Success {
            return Err(CheckoutError::InvalidStage {
                expected: Stage::Success,
                actual: session.stage,
            });
        }
        session.receipt = None;
        session.cached_order_id = None;
        self.transition(&mut session, Stage::ShippingAndConnect);
        Ok(Stage::ShippingAndConnect)
    }

    async fn payment_preconditions(&self) -> Result<PaymentPreconditions, CheckoutError> {
        let wallet = self.wallet_state();
        let mut session = self.session.write().await;
        self.reconcile(&mut session, &wallet);
        if session.stage != Stage::ConfirmPayment {
            return Err(CheckoutError::InvalidStage {
                expected: Stage::ConfirmPayment,
                actual: session.stage,
            });
        }
        let account = wallet.account().ok_or(CheckoutError::WalletNotConnected)?;
        match wallet.chain_id {
            Some(actual) if actual != self.chain.chain_id => {
                return Err(CheckoutError::WrongChain {
                    expected: self.chain.chain_id,
                    actual,
                });
            }
            _ => {}
        }
        let required = self.required_amount()?;
        Ok(PaymentPreconditions {
            account,
            required,
            funds: FundsSnapshot::new(session.account, Some(required)),
            epoch: session.epoch,
        })
    }

    /// Grant the payment contract an allowance of exactly the price.
    ///
    /// Unknown account state is re-read first; if it is still unknown
    /// nothing is sent.
    #[tracing::instrument(skip_all, err, name = "Checkout:Approve", fields(product_id = %self.product_id))]
    pub async fn approve(&self) -> Result<TxHash, CheckoutError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let mut pre = self.payment_preconditions().await?;
        if !pre.funds.is_known() {
            self.refresh_account_state().await;
            pre = self.payment_preconditions().await?;
            if !pre.funds.is_known() {
                return Err(CheckoutError::AccountStateUnknown);
            }
        }
        if pre.funds.has_insufficient_funds() {
            return Err(CheckoutError::InsufficientFunds);
        }
        if pre.funds.has_allowance() {
            return Err(CheckoutError::AllowanceAlreadySufficient);
        }

        let call = ContractCall::Approve {
            token: self.chain.token,
            spender: self.chain.payment_core,
            amount: pre.required,
        };
        let tx_hash = self.submitter.submit(&call, pre.account).await?;
        info!(%tx_hash, amount = %pre.required, "Approval submitted");
        self.emit(CheckoutEvent::TransactionSubmitted {
            call: call.name(),
            tx_hash,
        });

        self.refresh_account_state().await;
        Ok(tx_hash)
    }

    /// Run the pay protocol: prepare (or reuse) the order, send the payment,
    /// then report it to the backend.
    ///
    /// If the payment was already sent but the backend did not acknowledge
    /// it, only the acknowledgement is retried.
    #[tracing::instrument(skip_all, err, name = "Checkout:Pay", fields(product_id = %self.product_id))]
    pub async fn pay(&self) -> Result<PaymentReceipt, CheckoutError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let pre = self.payment_preconditions().await?;

        let unsettled = self.session.read().await.unsettled.clone();
        if let Some(unsettled) = unsettled {
            info!(
                order_id = %unsettled.order_id,
                tx_hash = %unsettled.tx_hash,
                "Retrying completion of a sent payment"
            );
            return self.settle(unsettled, pre.epoch).await;
        }

        if pre.funds.has_insufficient_funds() {
            return Err(CheckoutError::InsufficientFunds);
        }
        if !pre.funds.has_allowance() {
            return Err(CheckoutError::AllowanceRequired);
        }

        let (cached, shipping, revision) = {
            let session = self.session.read().await;
            (
                session.cached_order_id.clone(),
                session.shipping.clone(),
                session.shipping_revision,
            )
        };

        let order_id = match cached {
            Some(order_id) => {
                debug!(%order_id, "Reusing prepared order");
                order_id
            }
            None => {
                let order_id = self.orders.prepare(&self.product_id, &shipping).await?;
                self.emit(CheckoutEvent::OrderPrepared {
                    order_id: order_id.clone(),
                });
                let mut session = self.session.write().await;
                if session.shipping_revision != revision {
                    warn!(%order_id, "Shipping changed while preparing, discarding order");
                    return Err(CheckoutError::ShippingChanged);
                }
                session.cached_order_id = Some(order_id.clone());
                order_id
            }
        };

        {
            let wallet = self.wallet_state();
            let mut session = self.session.write().await;
            self.reconcile(&mut session, &wallet);
            let wrong_chain = matches!(wallet.chain_id, Some(id) if id != self.chain.chain_id);
            if session.epoch != pre.epoch
                || session.stage != Stage::ConfirmPayment
                || wallet.account() != Some(pre.account)
                || wrong_chain
            {
                warn!(%order_id, stage = %session.stage, "Checkout moved on while preparing, payment not sent");
                return Err(CheckoutError::SessionChanged);
            }
            if session.shipping_revision != revision
                || session.cached_order_id.as_ref() != Some(&order_id)
            {
                return Err(CheckoutError::ShippingChanged);
            }
        }

        let call = ContractCall::Erc20Payment {
            payment_core: self.chain.payment_core,
            recipient: self.product.merchant_address,
            token: self.chain.token,
            amount: pre.required,
            identifier: order_id.to_string(),
        };
        let tx_hash = self.submitter.submit(&call, pre.account).await?;

        let unsettled = UnsettledPayment {
            order_id,
            tx_hash,
            amount: pre.required,
            submitted_at: time::OffsetDateTime::now_utc(),
        };
        {
            let mut session = self.session.write().await;
            session.cached_order_id = None;
            session.unsettled = Some(unsettled.clone());
        }
        info!(order_id = %unsettled.order_id, %tx_hash, "Payment submitted");
        self.emit(CheckoutEvent::TransactionSubmitted {
            call: call.name(),
            tx_hash,
        });

        self.settle(unsettled, pre.epoch).await
    }

    async fn settle(
        &self,
        unsettled: UnsettledPayment,
        epoch: u64,
    ) -> Result<PaymentReceipt, CheckoutError> {
        if let Err(e) = self
            .orders
            .complete(&self.product_id, &unsettled.order_id, unsettled.tx_hash)
            .await
        {
            error!(
                order_id = %unsettled.order_id,
                tx_hash = %unsettled.tx_hash,
                error = %e,
                "Payment sent but the backend did not record it"
            );
            self.emit(CheckoutEvent::CompletionFailed {
                order_id: unsettled.order_id.clone(),
                tx_hash: unsettled.tx_hash,
                reason: e.to_string(),
            });
            return Err(CheckoutError::CompletionFailed {
                order_id: unsettled.order_id,
                tx_hash: unsettled.tx_hash,
                source: e,
            });
        }

        let receipt = PaymentReceipt {
            order_id: unsettled.order_id,
            tx_hash: unsettled.tx_hash,
            amount: unsettled.amount,
            submitted_at: unsettled.submitted_at,
        };
        self.emit(CheckoutEvent::OrderCompleted {
            order_id: receipt.order_id.clone(),
            tx_hash: receipt.tx_hash,
            amount: receipt.amount,
        });

        let wallet = self.wallet_state();
        {
            let mut session = self.session.write().await;
            session.unsettled = None;
            session.receipt = Some(receipt.clone());
            self.reconcile(&mut session, &wallet);
            if session.epoch == epoch && session.stage == Stage::ConfirmPayment {
                self.transition(&mut session, Stage::Success);
            } else {
                warn!(
                    order_id = %receipt.order_id,
                    stage = %session.stage,
                    "Payment recorded after the session moved on, stage unchanged"
                );
            }
        }

        self.refresh_account_state().await;
        Ok(receipt)
    }

    /// Follow wallet changes until `shutdown_rx` flips to `true`.
    ///
    /// Connecting or switching account refreshes the account state; a
    /// disconnect while confirming payment returns to the shipping stage.
    pub async fn run_wallet_watcher(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut wallet_rx = self.wallet.clone();
        let mut last = *wallet_rx.borrow_and_update();
        info!(product_id = %self.product_id, "Wallet watcher started");

        self.on_wallet_changed(WalletConnection::disconnected(), last)
            .await;

        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Wallet watcher shutting down");
                        break;
                    }
                }
                changed = wallet_rx.changed() => {
                    if changed.is_err() {
                        info!("Wallet channel closed, stopping watcher");
                        break;
                    }
                    let current = *wallet_rx.borrow_and_update();
                    self.on_wallet_changed(last, current).await;
                    last = current;
                }
            }
        }
    }

    async fn on_wallet_changed(&self, previous: WalletConnection, current: WalletConnection) {
        debug!(
            connected = current.is_connected,
            chain_id = ?current.chain_id,
            "Wallet state changed"
        );
        self.stage().await;
        match current.account() {
            Some(account) if previous.account() != Some(account) => {
                info!(%account, "Wallet account connected");
                self.refresh_account_state().await;
            }
            _ => {}
        }
    }
}

impl<R, S, O> Processor<CheckoutAction> for PaymentOrchestrator<R, S, O>
where
    R: ChainStateReader,
    S: TransactionSubmitter,
    O: OrderService,
{
    type Output = Stage;
    type Error = CheckoutError;

    async fn process(&self, action: CheckoutAction) -> Result<Stage, CheckoutError> {
        match action {
            CheckoutAction::UpdateShipping { field, value } => {
                self.update_shipping(field, value).await;
            }
            CheckoutAction::Continue => {
                self.continue_to_payment().await?;
            }
            CheckoutAction::Previous => {
                self.previous().await?;
            }
            CheckoutAction::RefreshAccount => {
                self.refresh_account_state().await;
            }
            CheckoutAction::Approve => {
                self.approve().await?;
            }
            CheckoutAction::Pay => {
                self.pay().await?;
            }
            CheckoutAction::PlaceAnother => {
                self.place_another().await?;
            }
        }
        Ok(self.stage().await)
    }
}
