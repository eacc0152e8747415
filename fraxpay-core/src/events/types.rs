//! Event type definitions.

use alloy::primitives::{TxHash, U256};
use fraxpay_sdk::objects::OrderId;

use crate::chain::ChainAccountState;
use crate::checkout::Stage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    StageChanged { from: Stage, to: Stage },
    AccountStateRefreshed(ChainAccountState),
    OrderPrepared { order_id: OrderId },
    /// `approve` or `erc20Payment` was broadcast.
    TransactionSubmitted {
        call: &'static str,
        tx_hash: TxHash,
    },
    OrderCompleted {
        order_id: OrderId,
        tx_hash: TxHash,
        amount: U256,
    },
    /// The payment is on chain but the backend has not acknowledged it.
    CompletionFailed {
        order_id: OrderId,
        tx_hash: TxHash,
        reason: String,
    },
}
