//! Configuration types for the FraxPay checkout.
//!
//! These types represent the validated runtime configuration consumed by the
//! orchestrator and its collaborators. Loading and parsing is handled by the
//! binary crate.

mod backend;
mod chain;
mod pricing;

pub use backend::BackendConfig;
pub use chain::ChainConfig;
pub use pricing::PricingConfig;

/// Complete runtime configuration for one checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Merchant backend serving the `/pay` endpoints.
    pub backend: BackendConfig,
    /// Chain, token and payment contract.
    pub chain: ChainConfig,
    /// Price-to-token conversion.
    pub pricing: PricingConfig,
}
