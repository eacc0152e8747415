//! Buyer shipping information collected during checkout.

use serde::{Deserialize, Serialize};

use super::product::{FieldRule, ShippingConfig};

/// Country preselected on a fresh checkout.
pub const DEFAULT_COUNTRY: &str = "GB";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

impl Default for ShippingInfo {
    fn default() -> Self {
        Self {
            name: None,
            email: None,
            city: None,
            country: default_country(),
            address: None,
            zip: None,
            phone: None,
        }
    }
}

/// A single editable field of [`ShippingInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingField {
    Name,
    Email,
    City,
    Country,
    Address,
    Zip,
    Phone,
}

impl ShippingField {
    pub const ALL: [ShippingField; 7] = [
        ShippingField::Name,
        ShippingField::Email,
        ShippingField::City,
        ShippingField::Country,
        ShippingField::Address,
        ShippingField::Zip,
        ShippingField::Phone,
    ];

    /// The merchant rule that governs this field.
    pub fn rule(self, config: &ShippingConfig) -> FieldRule {
        match self {
            ShippingField::Name => config.name,
            ShippingField::Email => config.email,
            ShippingField::Phone => config.phone,
            ShippingField::City
            | ShippingField::Country
            | ShippingField::Address
            | ShippingField::Zip => config.address,
        }
    }
}

impl std::fmt::Display for ShippingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShippingField::Name => write!(f, "name"),
            ShippingField::Email => write!(f, "email"),
            ShippingField::City => write!(f, "city"),
            ShippingField::Country => write!(f, "country"),
            ShippingField::Address => write!(f, "address"),
            ShippingField::Zip => write!(f, "zip"),
            ShippingField::Phone => write!(f, "phone"),
        }
    }
}

impl ShippingInfo {
    pub fn get(&self, field: ShippingField) -> Option<&str> {
        match field {
            ShippingField::Name => self.name.as_deref(),
            ShippingField::Email => self.email.as_deref(),
            ShippingField::City => self.city.as_deref(),
            ShippingField::Country => Some(self.country.as_str()),
            ShippingField::Address => self.address.as_deref(),
            ShippingField::Zip => self.zip.as_deref(),
            ShippingField::Phone => self.phone.as_deref(),
        }
    }

    /// Overwrite a single field. An empty value clears optional fields.
    pub fn set(&mut self, field: ShippingField, value: impl Into<String>) {
        let value = value.into();
        let optional = if value.is_empty() { None } else { Some(value.clone()) };
        match field {
            ShippingField::Name => self.name = optional,
            ShippingField::Email => self.email = optional,
            ShippingField::City => self.city = optional,
            ShippingField::Country => self.country = value,
            ShippingField::Address => self.address = optional,
            ShippingField::Zip => self.zip = optional,
            ShippingField::Phone => self.phone = optional,
        }
    }

    /// Fields that the merchant requires but that are blank.
    pub fn missing_fields(&self, config: &ShippingConfig) -> Vec<ShippingField> {
        ShippingField::ALL
            .into_iter()
            .filter(|field| field.rule(config).is_enforced())
            .filter(|field| self.get(*field).is_none_or(|v| v.trim().is_empty()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> FieldRule {
        FieldRule {
            enabled: true,
            required: true,
        }
    }

    #[test]
    fn test_default_country() {
        let info: ShippingInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(info.country, DEFAULT_COUNTRY);
        assert_eq!(info, ShippingInfo::default());
    }

    #[test]
    fn test_address_rule_covers_postal_block() {
        let config = ShippingConfig {
            address: required(),
            ..Default::default()
        };
        let mut info = ShippingInfo::default();
        info.set(ShippingField::City, "London");

        let missing = info.missing_fields(&config);
        assert_eq!(missing, vec![ShippingField::Address, ShippingField::Zip]);
    }

    #[test]
    fn test_disabled_required_field_is_not_enforced() {
        let config = ShippingConfig {
            email: FieldRule {
                enabled: false,
                required: true,
            },
            name: required(),
            ..Default::default()
        };
        let mut info = ShippingInfo::default();
        info.set(ShippingField::Name, "   ");
        assert_eq!(info.missing_fields(&config), vec![ShippingField::Name]);

        info.set(ShippingField::Name, "Ada");
        assert!(info.missing_fields(&config).is_empty());
    }

    #[test]
    fn test_serialization_skips_blank_fields() {
        let mut info = ShippingInfo::default();
        info.set(ShippingField::Email, "ada@example.com");
        info.set(ShippingField::Phone, "");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "email": "ada@example.com", "country": "GB" })
        );
    }
}
