//! Configuration module for fraxpay-checkout.
//!
//! Reads the TOML file, applies CLI overrides and validates the result into
//! the runtime types of `fraxpay_core::config`.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use fraxpay_core::config::{BackendConfig, ChainConfig, CheckoutConfig, PricingConfig};
use fraxpay_core::utils::backoff::RetryPolicy;
use fraxpay_sdk::amount::MAX_DECIMALS;
use fraxpay_sdk::objects::ShippingInfo;
use thiserror::Error;
use url::Url;

use crate::config::file::FileConfig;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub checkout: CheckoutConfig,
    /// Shipping details to pre-fill.
    pub shipping: ShippingInfo,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    rpc_override: Option<Url>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, rpc_override: Option<Url>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            rpc_override,
        }
    }

    /// Read the TOML file, apply CLI overrides, then validate.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content)
    }

    fn load_str(&self, content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;

        if let Some(rpc_url) = &self.rpc_override {
            file_config.chain.rpc_url = rpc_url.clone();
        }

        validate(&file_config)?;
        build_loaded_config(file_config)
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.pricing.scale_divisor == 0 {
        return Err(ConfigError::ValidationError(
            "pricing.scale_divisor must be greater than zero".to_string(),
        ));
    }
    if config.pricing.token_decimals > MAX_DECIMALS {
        return Err(ConfigError::ValidationError(format!(
            "pricing.token_decimals must be at most {MAX_DECIMALS}"
        )));
    }
    if config.backend.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "backend.retry.max_attempts must be at least 1".to_string(),
        ));
    }
    if config.backend.base_url.cannot_be_a_base() {
        return Err(ConfigError::ValidationError(format!(
            "backend.base_url {} cannot be used as a base URL",
            config.backend.base_url
        )));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let token = file_config.chain.resolved_token().ok_or_else(|| {
        ConfigError::ValidationError(format!(
            "chain {} has no default payment token; set chain.token",
            file_config.chain.chain_id
        ))
    })?;

    let retry = file_config.backend.retry;
    let mut base_url = file_config.backend.base_url;
    // `Url::join` replaces the last segment unless the path ends in '/'.
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }

    Ok(LoadedConfig {
        checkout: CheckoutConfig {
            backend: BackendConfig {
                base_url,
                retry: RetryPolicy {
                    max_attempts: retry.max_attempts,
                    base_delay: Duration::from_millis(retry.base_delay_ms),
                    max_delay: Duration::from_millis(retry.max_delay_ms),
                },
                request_timeout: Duration::from_secs(file_config.backend.request_timeout_secs),
            },
            chain: ChainConfig {
                rpc_url: file_config.chain.rpc_url,
                chain_id: file_config.chain.chain_id,
                token,
                payment_core: file_config.chain.payment_core,
            },
            pricing: PricingConfig {
                token_decimals: file_config.pricing.token_decimals,
                scale_divisor: file_config.pricing.scale_divisor,
            },
        },
        shipping: file_config.shipping,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
[backend]
base_url = "https://shop.example.com/api"

[chain]
rpc_url = "https://mainnet.optimism.io"
payment_core = "0x00000000000000000000000000000000000000c0"
"#;

    #[test]
    fn test_load_applies_overrides_and_defaults() {
        let loader = ConfigLoader::new("unused.toml", Some("http://127.0.0.1:8545".parse().unwrap()));
        let loaded = loader.load_str(BASE).unwrap();
        let checkout = loaded.checkout;
        assert_eq!(checkout.chain.rpc_url.as_str(), "http://127.0.0.1:8545/");
        assert_eq!(checkout.backend.base_url.as_str(), "https://shop.example.com/api/");
        assert_eq!(checkout.backend.retry, RetryPolicy::default());
        assert_eq!(checkout.pricing, PricingConfig::default());
    }

    #[test]
    fn test_rejects_zero_divisor() {
        let loader = ConfigLoader::new("unused.toml", None);
        let content = format!("{BASE}\n[pricing]\nscale_divisor = 0\n");
        assert!(matches!(
            loader.load_str(&content),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_decimals() {
        let loader = ConfigLoader::new("unused.toml", None);
        let content = format!("{BASE}\n[pricing]\ntoken_decimals = 4000000000\n");
        assert!(matches!(
            loader.load_str(&content),
            Err(ConfigError::ValidationError(_))
        ));

        let content = format!("{BASE}\n[pricing]\ntoken_decimals = 77\n");
        assert!(loader.load_str(&content).is_ok());
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let loader = ConfigLoader::new("unused.toml", None);
        let content = BASE.replace(
            "[chain]",
            "[backend.retry]\nmax_attempts = 0\n\n[chain]",
        );
        assert!(matches!(
            loader.load_str(&content),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_chain_requires_token() {
        let loader = ConfigLoader::new("unused.toml", None);
        let content = BASE.replace("[chain]", "[chain]\nchain_id = 31337");
        assert!(matches!(
            loader.load_str(&content),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
