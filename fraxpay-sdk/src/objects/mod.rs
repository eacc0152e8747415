//! Wire types shared by the checkout front end and the merchant backend.

pub mod blockchains;
pub mod order;
pub mod product;
pub mod shipping;

pub use order::{CompleteOrderAck, CompleteOrderRequest, OrderId, PrepareOrderRequest, PrepareOrderResponse};
pub use product::{FieldRule, Product, ProductResponse, ShippingConfig};
pub use shipping::{ShippingField, ShippingInfo, DEFAULT_COUNTRY};
