//! The checkout state machine.
//!
//! A session moves `ShippingAndConnect → ConfirmPayment → Success`. While in
//! `ConfirmPayment` the buyer either funds the wallet, approves the payment
//! contract, or pays; paying runs the order lifecycle around the on-chain
//! transfer. See [`PaymentOrchestrator`].

mod funds;
mod orchestrator;

pub use funds::FundsSnapshot;
pub use orchestrator::{CheckoutContext, PaymentOrchestrator};

use std::fmt;

use alloy::primitives::{TxHash, U256};
use fraxpay_sdk::objects::{OrderId, ShippingField};
use thiserror::Error;

use crate::chain::SubmitError;
use crate::order::OrderServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ShippingAndConnect,
    ConfirmPayment,
    Success,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ShippingAndConnect => write!(f, "shipping_and_connect"),
            Stage::ConfirmPayment => write!(f, "confirm_payment"),
            Stage::Success => write!(f, "success"),
        }
    }
}

/// What the buyer can usefully do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    ConnectWallet,
    /// Fill shipping and continue to payment.
    Continue,
    /// Balance is below the price; see [`PaymentOrchestrator::funding_options`].
    FundWallet,
    Approve,
    Pay,
    Done,
}

/// A user action dispatched to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutAction {
    UpdateShipping { field: ShippingField, value: String },
    Continue,
    Previous,
    RefreshAccount,
    Approve,
    Pay,
    PlaceAnother,
}

/// Ways to cover a balance shortfall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundingOption {
    /// Swap another asset held on the same chain into the payment token.
    Swap { shortfall: U256 },
    /// Buy the payment token through a fiat on-ramp.
    Onramp {
        provider: &'static str,
        shortfall: U256,
    },
}

/// On-ramp providers offered when the wallet is short.
pub const ONRAMP_PROVIDERS: [&str; 2] = ["Stably", "Transak"];

/// Recorded when a session reaches [`Stage::Success`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub order_id: OrderId,
    pub tx_hash: TxHash,
    pub amount: U256,
    pub submitted_at: time::OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("action not available in stage {actual} (expected {expected})")]
    InvalidStage { expected: Stage, actual: Stage },

    #[error("wallet is not connected")]
    WalletNotConnected,

    #[error("wallet is on chain {actual}, expected chain {expected}")]
    WrongChain { expected: u64, actual: u64 },

    #[error("missing shipping fields: {}", join_fields(.0))]
    MissingShippingFields(Vec<ShippingField>),

    #[error("product price {price:?} cannot be charged: {reason}")]
    InvalidPrice { price: String, reason: String },

    #[error("token balance is below the price")]
    InsufficientFunds,

    #[error("allowance already covers the price")]
    AllowanceAlreadySufficient,

    #[error("allowance does not cover the price; approve first")]
    AllowanceRequired,

    #[error("another approve or pay is already in progress")]
    ActionInFlight,

    #[error("shipping information changed while the order was being prepared")]
    ShippingChanged,

    #[error("checkout left the payment stage before the payment was sent")]
    SessionChanged,

    #[error("balance and allowance could not be read")]
    AccountStateUnknown,

    #[error("order backend error: {0}")]
    Order(#[from] OrderServiceError),

    #[error("transaction failed: {0}")]
    Submit(#[from] SubmitError),

    /// The payment is on chain but the backend did not record it. Calling
    /// pay again retries only the completion.
    #[error("payment {tx_hash} for order {order_id} was sent but not recorded: {source}")]
    CompletionFailed {
        order_id: OrderId,
        tx_hash: TxHash,
        #[source]
        source: OrderServiceError,
    },
}

fn join_fields(fields: &[ShippingField]) -> String {
    fields
        .iter()
        .map(ShippingField::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
