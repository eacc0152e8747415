//! Checkout event stream.
//!
//! The orchestrator publishes a [`CheckoutEvent`] for every observable step
//! so front ends can render progress without polling.
//!
//! # Event Flow
//!
//! 1. `StageChanged` whenever the stage moves
//! 2. `AccountStateRefreshed` after each balance/allowance read
//! 3. `OrderPrepared` -> `TransactionSubmitted` -> `OrderCompleted` during a payment
//! 4. `CompletionFailed` if the backend could not be told about a broadcast payment

pub mod channels;
pub mod types;

pub use channels::{
    CheckoutEventReceiver, CheckoutEventSender, DEFAULT_CHANNEL_BUFFER, checkout_event_channel,
};
pub use types::CheckoutEvent;
