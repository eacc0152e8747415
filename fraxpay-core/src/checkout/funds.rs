//! Sufficiency checks over an immutable funds snapshot.

use alloy::primitives::U256;

use crate::chain::ChainAccountState;

/// Everything needed to decide between funding, approving and paying.
///
/// Any `None` is unknown, and unknown never satisfies a check in either
/// direction: both [`has_allowance`](Self::has_allowance) and
/// [`has_insufficient_funds`](Self::has_insufficient_funds) are `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FundsSnapshot {
    pub balance: Option<U256>,
    pub allowance: Option<U256>,
    pub required: Option<U256>,
}

impl FundsSnapshot {
    pub fn new(account: Option<ChainAccountState>, required: Option<U256>) -> Self {
        let account = account.unwrap_or_default();
        Self {
            balance: account.balance,
            allowance: account.allowance,
            required,
        }
    }

    /// `true` once balance, allowance and price are all known.
    pub fn is_known(&self) -> bool {
        self.balance.is_some() && self.allowance.is_some() && self.required.is_some()
    }

    pub fn has_allowance(&self) -> bool {
        match (self.allowance, self.required) {
            (Some(allowance), Some(required)) => allowance >= required,
            _ => false,
        }
    }

    pub fn has_insufficient_funds(&self) -> bool {
        match (self.balance, self.required) {
            (Some(balance), Some(required)) => balance < required,
            _ => false,
        }
    }
}
