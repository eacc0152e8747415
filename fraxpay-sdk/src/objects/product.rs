//! Product as returned by `GET /pay/{productID}`.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Whether a shipping form field is shown and whether it must be filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub required: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for FieldRule {
    fn default() -> Self {
        Self {
            enabled: true,
            required: false,
        }
    }
}

impl FieldRule {
    /// A field is enforced only when it is both shown and required.
    pub fn is_enforced(&self) -> bool {
        self.enabled && self.required
    }
}

/// Per-field shipping rules configured by the merchant.
///
/// `address` governs the whole postal block: street, city, country and zip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingConfig {
    #[serde(default)]
    pub name: FieldRule,
    #[serde(default)]
    pub email: FieldRule,
    #[serde(default)]
    pub address: FieldRule,
    #[serde(default)]
    pub phone: FieldRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Human decimal price, e.g. `"50.00"`.
    pub price: String,
    #[serde(rename = "imageURL", default)]
    pub image_url: Option<String>,
    pub merchant_address: Address,
    #[serde(default)]
    pub shipping: ShippingConfig,
}

/// Envelope of the product endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResponse {
    pub product: Product,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_parsing() {
        let json = r#"{
            "product": {
                "name": "Frax Hoodie",
                "description": "Warm",
                "price": "50.00",
                "imageURL": "https://cdn.example.com/hoodie.png",
                "merchantAddress": "0x1111111111111111111111111111111111111111",
                "shipping": {
                    "name": { "enabled": true, "required": true },
                    "address": { "enabled": true, "required": false },
                    "email": { "enabled": false, "required": true }
                }
            }
        }"#;
        let resp: ProductResponse = serde_json::from_str(json).unwrap();
        let product = resp.product;
        assert_eq!(product.price, "50.00");
        assert_eq!(
            product.image_url.as_deref(),
            Some("https://cdn.example.com/hoodie.png")
        );
        assert!(product.shipping.name.is_enforced());
        assert!(!product.shipping.email.is_enforced());
        assert_eq!(product.shipping.phone, FieldRule::default());
    }

    #[test]
    fn test_invalid_merchant_address_is_rejected() {
        let json = r#"{"name":"x","price":"1","merchantAddress":"nope"}"#;
        assert!(serde_json::from_str::<Product>(json).is_err());
    }
}
