//! Order lifecycle payloads for `POST /pay/prepare` and `POST /pay/complete`.

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};

use super::shipping::ShippingInfo;

/// Opaque backend-issued order identifier.
///
/// Also used verbatim as the `identifier` argument of the on-chain payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareOrderRequest {
    #[serde(rename = "productID")]
    pub product_id: String,
    #[serde(rename = "shippingInfo")]
    pub shipping_info: ShippingInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareOrderResponse {
    #[serde(rename = "orderID")]
    pub order_id: OrderId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteOrderRequest {
    #[serde(rename = "productID")]
    pub product_id: String,
    #[serde(rename = "orderID")]
    pub order_id: OrderId,
    #[serde(rename = "txHash")]
    pub tx_hash: TxHash,
}

/// Body of a successful completion. The backend decides its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompleteOrderAck(pub serde_json::Value);
