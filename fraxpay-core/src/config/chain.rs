//! Chain configuration.

use alloy::primitives::Address;
use url::Url;

/// The chain the payment settles on and the contracts involved.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// EIP-155 chain id the wallet must be connected to.
    pub chain_id: u64,
    /// ERC-20 token used for payment.
    pub token: Address,
    /// Payment-processing contract; also the allowance spender.
    pub payment_core: Address,
}
