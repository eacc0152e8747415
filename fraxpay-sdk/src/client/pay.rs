//! Pay API client (checkout front end → merchant backend).

use reqwest::Client;
use url::Url;
use uuid::Uuid;

use super::ClientError;
use crate::objects::{
    CompleteOrderAck, CompleteOrderRequest, PrepareOrderRequest, PrepareOrderResponse, Product,
    ProductResponse,
};

/// Header carrying the caller-chosen idempotency key on mutating calls.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Typed HTTP client for the merchant **Pay API**.
///
/// Paths are resolved relative to `base_url`, so a base of
/// `https://shop.example.com/api/` targets `https://shop.example.com/api/pay/…`.
#[derive(Debug, Clone)]
pub struct PayClient {
    http: Client,
    base_url: Url,
}

impl PayClient {
    /// Create a new `PayClient` for the backend rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /pay/{product_id}` – fetch the product being checked out.
    pub async fn get_product(&self, product_id: &str) -> Result<Product, ClientError> {
        let url = self
            .base_url
            .join(&format!("pay/{}", urlencoding::encode(product_id)))?;

        let resp = self.http.get(url).send().await?;

        let envelope: ProductResponse = parse_response(resp).await?;
        Ok(envelope.product)
    }

    /// `POST /pay/prepare` – create an order bound to the given shipping
    /// snapshot.
    pub async fn prepare_order(
        &self,
        request: &PrepareOrderRequest,
        idempotency_key: Uuid,
    ) -> Result<PrepareOrderResponse, ClientError> {
        let url = self.base_url.join("pay/prepare")?;

        let resp = self
            .http
            .post(url)
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key.to_string())
            .json(request)
            .send()
            .await?;

        parse_response(resp).await
    }

    /// `POST /pay/complete` – report the payment transaction for an order.
    pub async fn complete_order(
        &self,
        request: &CompleteOrderRequest,
        idempotency_key: Uuid,
    ) -> Result<CompleteOrderAck, ClientError> {
        let url = self.base_url.join("pay/complete")?;

        let resp = self
            .http
            .post(url)
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key.to_string())
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Ok(CompleteOrderAck(serde_json::Value::Null));
        }
        serde_json::from_slice(&bytes).map_err(ClientError::Json)
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
