//! On-chain side of the checkout: token reads and wallet-signed writes.

pub mod reader;
pub mod submitter;

pub use reader::{ChainStateReader, Erc20StateReader};
pub use submitter::{ContractCall, SubmitError, TransactionSubmitter, WalletSubmitter};

use alloy::primitives::U256;
use alloy::sol;

// ERC-20 surface used by the checkout.
sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

// Payment-processing contract.
sol! {
    #[sol(rpc)]
    interface IFraxPayCore {
        function erc20Payment(address recipient, address tokenAddress, uint256 amount, string identifier) external;
    }
}

/// Token balance and allowance of the connected account.
///
/// `None` means the value is unknown (never read, or the read failed). It
/// must not be treated as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainAccountState {
    pub balance: Option<U256>,
    pub allowance: Option<U256>,
}

impl ChainAccountState {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn known(balance: U256, allowance: U256) -> Self {
        Self {
            balance: Some(balance),
            allowance: Some(allowance),
        }
    }
}
