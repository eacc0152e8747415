//! The wallet facts the checkout consumes.
//!
//! Connecting and disconnecting belong to the wallet collaborator; it
//! publishes the current [`WalletConnection`] on a watch channel and the
//! orchestrator only ever reads it.

use alloy::primitives::Address;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalletConnection {
    pub address: Option<Address>,
    pub is_connected: bool,
    pub chain_id: Option<u64>,
}

impl WalletConnection {
    pub fn connected(address: Address, chain_id: u64) -> Self {
        Self {
            address: Some(address),
            is_connected: true,
            chain_id: Some(chain_id),
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    /// The address, only while connected.
    pub fn account(&self) -> Option<Address> {
        self.address.filter(|_| self.is_connected)
    }
}

/// Sender side, held by the wallet collaborator.
pub type WalletSender = watch::Sender<WalletConnection>;
/// Receiver side, handed to the orchestrator.
pub type WalletReceiver = watch::Receiver<WalletConnection>;

/// Create a wallet channel starting disconnected.
pub fn wallet_channel() -> (WalletSender, WalletReceiver) {
    watch::channel(WalletConnection::disconnected())
}
