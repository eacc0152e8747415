//! TOML file configuration structures.
//!
//! These structs directly map to the `fraxpay.toml` file format.

use alloy::primitives::Address;
use fraxpay_sdk::objects::ShippingInfo;
use fraxpay_sdk::objects::blockchains::{Blockchain, Stablecoin};
use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub backend: BackendConfig,
    pub chain: ChainConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Buyer details used to pre-fill the shipping form.
    #[serde(default)]
    pub shipping: ShippingInfo,
}

/// Merchant backend section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Root the `pay/…` endpoints are resolved against.
    pub base_url: Url,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_request_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8_000
}

/// Chain section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: Url,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Payment token. Defaults to FRAX on `chain_id` when deployed there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Address>,
    /// FraxPayCore contract; also the allowance spender.
    pub payment_core: Address,
}

fn default_chain_id() -> u64 {
    Blockchain::Optimism.chain_id()
}

impl ChainConfig {
    /// Configured token, or FRAX on the configured chain.
    pub fn resolved_token(&self) -> Option<Address> {
        self.token.or_else(|| {
            Blockchain::from_chain_id(self.chain_id)
                .and_then(|chain| Stablecoin::Frax.contract_address(chain))
        })
    }
}

/// Pricing section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u32,
    #[serde(default = "default_scale_divisor")]
    pub scale_divisor: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            token_decimals: default_token_decimals(),
            scale_divisor: default_scale_divisor(),
        }
    }
}

fn default_token_decimals() -> u32 {
    Stablecoin::Frax.decimals()
}

fn default_scale_divisor() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parsing() {
        let toml_str = r#"
[backend]
base_url = "https://shop.example.com/api/"

[chain]
rpc_url = "https://mainnet.optimism.io"
payment_core = "0x00000000000000000000000000000000000000c0"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.chain.chain_id, 10);
        assert_eq!(
            config.chain.resolved_token(),
            Stablecoin::Frax.contract_address(Blockchain::Optimism)
        );
        assert_eq!(config.pricing.token_decimals, 18);
        assert_eq!(config.pricing.scale_divisor, 10_000);
        assert_eq!(config.backend.retry.max_attempts, 3);
        assert_eq!(config.backend.request_timeout_secs, 15);
        assert_eq!(config.shipping, ShippingInfo::default());
    }

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[backend]
base_url = "http://127.0.0.1:3000/"
request_timeout_secs = 5

[backend.retry]
max_attempts = 5
base_delay_ms = 100

[chain]
rpc_url = "http://127.0.0.1:8545"
chain_id = 31337
token = "0x00000000000000000000000000000000000000f4"
payment_core = "0x00000000000000000000000000000000000000c0"

[pricing]
scale_divisor = 1

[shipping]
name = "Ada Lovelace"
country = "FR"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.retry.max_attempts, 5);
        assert_eq!(config.backend.retry.max_delay_ms, 8_000);
        assert_eq!(config.chain.chain_id, 31337);
        assert_eq!(
            config.chain.resolved_token(),
            Some(Address::with_last_byte(0xf4))
        );
        assert_eq!(config.pricing.scale_divisor, 1);
        assert_eq!(config.shipping.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(config.shipping.country, "FR");
    }

    #[test]
    fn test_unknown_chain_has_no_default_token() {
        let chain = ChainConfig {
            rpc_url: "http://127.0.0.1:8545".parse().unwrap(),
            chain_id: 31337,
            token: None,
            payment_core: Address::ZERO,
        };
        assert_eq!(chain.resolved_token(), None);
    }
}
