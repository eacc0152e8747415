//! Simulate-then-send submission of the two checkout transactions.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::TransportError;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{IERC20, IFraxPayCore};

/// EIP-1193 "user rejected request".
const USER_REJECTED_CODE: i64 = 4001;

/// Errors that can occur while submitting a transaction.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The dry run reverted; the wallet was never asked to sign.
    #[error("simulation failed: {0}")]
    Simulation(String),

    #[error("gas estimation failed: {0}")]
    GasEstimation(String),

    /// The wallet holder declined to sign.
    #[error("transaction rejected by wallet")]
    Rejected,

    #[error("broadcast failed: {0}")]
    Broadcast(String),
}

/// The contract calls the checkout ever makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    /// `token.approve(spender, amount)`
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    /// `paymentCore.erc20Payment(recipient, token, amount, identifier)`
    Erc20Payment {
        payment_core: Address,
        recipient: Address,
        token: Address,
        amount: U256,
        identifier: String,
    },
}

impl ContractCall {
    /// Contract the call is sent to.
    pub fn target(&self) -> Address {
        match self {
            ContractCall::Approve { token, .. } => *token,
            ContractCall::Erc20Payment { payment_core, .. } => *payment_core,
        }
    }

    /// ABI-encoded calldata.
    pub fn calldata(&self) -> Bytes {
        match self {
            ContractCall::Approve {
                spender, amount, ..
            } => IERC20::approveCall {
                spender: *spender,
                amount: *amount,
            }
            .abi_encode()
            .into(),
            ContractCall::Erc20Payment {
                recipient,
                token,
                amount,
                identifier,
                ..
            } => IFraxPayCore::erc20PaymentCall {
                recipient: *recipient,
                tokenAddress: *token,
                amount: *amount,
                identifier: identifier.clone(),
            }
            .abi_encode()
            .into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContractCall::Approve { .. } => "approve",
            ContractCall::Erc20Payment { .. } => "erc20Payment",
        }
    }
}

/// Sends contract calls through the connected wallet.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Simulate `call` from `account`, then sign and broadcast it.
    ///
    /// Returns as soon as the transaction hash is known; it does not wait
    /// for inclusion.
    async fn submit(&self, call: &ContractCall, account: Address) -> Result<TxHash, SubmitError>;
}

/// [`TransactionSubmitter`] backed by a provider that carries a wallet
/// (e.g. built with `ProviderBuilder::new().wallet(signer)`).
pub struct WalletSubmitter<P> {
    provider: P,
}

impl<P: Provider> WalletSubmitter<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: Provider + 'static> TransactionSubmitter for WalletSubmitter<P> {
    #[tracing::instrument(skip_all, err, name = "Chain:Submit", fields(call = call.name()))]
    async fn submit(&self, call: &ContractCall, account: Address) -> Result<TxHash, SubmitError> {
        let tx = TransactionRequest::default()
            .from(account)
            .to(call.target())
            .input(call.calldata().into());

        self.provider
            .call(tx.clone())
            .await
            .map_err(|e| SubmitError::Simulation(e.to_string()))?;
        debug!(target_contract = %call.target(), "Simulation succeeded");

        let gas = self
            .provider
            .estimate_gas(tx.clone())
            .await
            .map_err(|e| SubmitError::GasEstimation(e.to_string()))?;

        let pending = self
            .provider
            .send_transaction(tx.gas_limit(gas))
            .await
            .map_err(classify_send_error)?;

        let tx_hash = *pending.tx_hash();
        info!(%tx_hash, gas, "Transaction broadcast");
        Ok(tx_hash)
    }
}

fn classify_send_error(e: TransportError) -> SubmitError {
    if e.as_error_resp().is_some_and(|resp| resp.code == USER_REJECTED_CODE) {
        warn!("Wallet rejected the signature request");
        SubmitError::Rejected
    } else {
        SubmitError::Broadcast(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approve_targets_token() {
        let token = Address::repeat_byte(0x11);
        let spender = Address::repeat_byte(0x22);
        let call = ContractCall::Approve {
            token,
            spender,
            amount: U256::from(5u64),
        };
        assert_eq!(call.target(), token);
        let data = call.calldata();
        // approve(address,uint256)
        assert_eq!(data[..4], [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(data.len(), 4 + 32 * 2);
        assert_eq!(data[16..36], spender[..]);
    }

    #[test]
    fn test_payment_targets_payment_core() {
        let payment_core = Address::repeat_byte(0x33);
        let call = ContractCall::Erc20Payment {
            payment_core,
            recipient: Address::repeat_byte(0x44),
            token: Address::repeat_byte(0x11),
            amount: U256::from(5u64),
            identifier: "ord_1".to_string(),
        };
        assert_eq!(call.target(), payment_core);
        assert_eq!(call.name(), "erc20Payment");
        let data = call.calldata();
        assert_eq!(data[..4], IFraxPayCore::erc20PaymentCall::SELECTOR);
        // Dynamic string tail carries the order id.
        assert!(data.windows(5).any(|w| w == b"ord_1"));
    }
}
