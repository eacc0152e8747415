//! Event channel factory and handles.

use super::types::CheckoutEvent;
use tokio::sync::broadcast;

/// Default buffer size for the event channel.
///
/// Slow receivers that fall further behind than this observe `Lagged`.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for CheckoutEvent events.
pub type CheckoutEventSender = broadcast::Sender<CheckoutEvent>;
/// Receiver handle for CheckoutEvent events.
pub type CheckoutEventReceiver = broadcast::Receiver<CheckoutEvent>;

/// Create a new CheckoutEvent channel.
///
/// More receivers can be created with `sender.subscribe()`.
pub fn checkout_event_channel() -> (CheckoutEventSender, CheckoutEventReceiver) {
    broadcast::channel(DEFAULT_CHANNEL_BUFFER)
}
