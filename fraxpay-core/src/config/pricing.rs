//! Pricing configuration.

use alloy::primitives::U256;
use fraxpay_sdk::amount::{AmountError, scale_down, try_to_raw_amount};

/// Converts a product's decimal price into the raw amount charged on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingConfig {
    /// Decimal precision the price is expanded to.
    pub token_decimals: u32,
    /// Fixed pricing-to-token divisor applied after expansion (floor).
    pub scale_divisor: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            token_decimals: 18,
            scale_divisor: 10_000,
        }
    }
}

impl PricingConfig {
    /// Raw token amount required to pay `price`.
    pub fn required_amount(&self, price: &str) -> Result<U256, AmountError> {
        let raw = try_to_raw_amount(price, self.token_decimals)?;
        Ok(scale_down(raw, self.scale_divisor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_amount() {
        let pricing = PricingConfig::default();
        assert_eq!(
            pricing.required_amount("50.00").unwrap(),
            U256::from(5_000_000_000_000_000u64)
        );
        assert_eq!(
            pricing.required_amount("0.00009").unwrap(),
            U256::from(9_000_000_000u64)
        );
        assert!(pricing.required_amount("fifty").is_err());
    }
}
