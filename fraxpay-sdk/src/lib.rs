#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod amount;
pub mod objects;

#[cfg(feature = "client")]
pub mod client;
