//! Batched balance/allowance reads.

use alloy::primitives::Address;
use alloy::providers::Provider;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ChainAccountState, IERC20};

/// Read-only access to the account state the checkout depends on.
#[async_trait]
pub trait ChainStateReader: Send + Sync {
    /// Read balance and allowance for `owner`.
    ///
    /// Returns `None` without querying when there is no owner. Read failures
    /// are not propagated: they resolve to [`ChainAccountState::unknown`].
    async fn fetch_account_state(&self, owner: Option<Address>) -> Option<ChainAccountState>;
}

/// Reads an ERC-20 balance and the allowance granted to the payment contract
/// in a single Multicall3 round trip, so both values come from the same block.
pub struct Erc20StateReader<P> {
    provider: P,
    token: Address,
    spender: Address,
}

impl<P: Provider> Erc20StateReader<P> {
    /// * `token` - the ERC-20 contract
    /// * `spender` - the contract whose allowance is checked
    pub fn new(provider: P, token: Address, spender: Address) -> Self {
        Self {
            provider,
            token,
            spender,
        }
    }

    async fn read(&self, owner: Address) -> Result<ChainAccountState, String> {
        let token = IERC20::new(self.token, &self.provider);
        let (balance, allowance) = self
            .provider
            .multicall()
            .add(token.balanceOf(owner))
            .add(token.allowance(owner, self.spender))
            .aggregate()
            .await
            .map_err(|e| e.to_string())?;
        Ok(ChainAccountState::known(balance, allowance))
    }
}

#[async_trait]
impl<P: Provider + 'static> ChainStateReader for Erc20StateReader<P> {
    async fn fetch_account_state(&self, owner: Option<Address>) -> Option<ChainAccountState> {
        let owner = owner?;
        match self.read(owner).await {
            Ok(state) => {
                debug!(
                    %owner,
                    token = %self.token,
                    balance = ?state.balance,
                    allowance = ?state.allowance,
                    "Fetched account state"
                );
                Some(state)
            }
            Err(e) => {
                warn!(%owner, token = %self.token, error = %e, "Account state read failed");
                Some(ChainAccountState::unknown())
            }
        }
    }
}
