//! Backend order lifecycle: prepare before paying, complete after.

use std::time::Duration;

use alloy::primitives::TxHash;
use async_trait::async_trait;
use fraxpay_sdk::client::{ClientError, PayClient};
use fraxpay_sdk::objects::{CompleteOrderRequest, OrderId, PrepareOrderRequest, ShippingInfo};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::utils::backoff::RetryPolicy;

/// Errors returned by an [`OrderService`].
#[derive(Debug, Error)]
pub enum OrderServiceError {
    #[error("order backend request failed after {attempts} attempt(s): {source}")]
    Client {
        attempts: u32,
        #[source]
        source: ClientError,
    },
}

/// Server-side order record management.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Create an order bound to this shipping snapshot.
    async fn prepare(
        &self,
        product_id: &str,
        shipping: &ShippingInfo,
    ) -> Result<OrderId, OrderServiceError>;

    /// Mark an order as paid by `tx_hash`.
    async fn complete(
        &self,
        product_id: &str,
        order_id: &OrderId,
        tx_hash: TxHash,
    ) -> Result<(), OrderServiceError>;
}

/// [`OrderService`] speaking to the merchant `/pay` backend.
///
/// Each logical call gets one idempotency key that is reused across its
/// retries, so a retried `prepare` whose first response was lost does not
/// create a second order on a backend that honours the key.
#[derive(Debug, Clone)]
pub struct HttpOrderService {
    client: PayClient,
    retry: RetryPolicy,
}

impl HttpOrderService {
    pub fn new(client: PayClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Build the client from configuration, applying the request timeout.
    pub fn from_config(config: &BackendConfig) -> Result<Self, OrderServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| OrderServiceError::Client {
                attempts: 0,
                source: ClientError::Http(e),
            })?;
        let client = PayClient::new(config.base_url.clone()).with_http_client(http);
        Ok(Self::new(client, config.retry))
    }

    pub fn client(&self) -> &PayClient {
        &self.client
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, OrderServiceError>
    where
        F: FnMut(Uuid) -> Fut + Send,
        Fut: Future<Output = Result<T, ClientError>> + Send,
        T: Send,
    {
        let idempotency_key = Uuid::new_v4();
        let attempts = self.retry.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call(idempotency_key).await {
                Ok(value) => {
                    debug!(operation, attempt, %idempotency_key, "Order backend call succeeded");
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay: Duration = self.retry.delay(attempt - 1);
                    warn!(
                        operation,
                        attempt,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Order backend call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(OrderServiceError::Client {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl OrderService for HttpOrderService {
    #[tracing::instrument(skip_all, err, name = "Order:Prepare", fields(product_id = %product_id))]
    async fn prepare(
        &self,
        product_id: &str,
        shipping: &ShippingInfo,
    ) -> Result<OrderId, OrderServiceError> {
        let request = PrepareOrderRequest {
            product_id: product_id.to_string(),
            shipping_info: shipping.clone(),
        };
        let response = self
            .with_retry("prepare", |key| {
                let request = &request;
                async move { self.client.prepare_order(request, key).await }
            })
            .await?;
        info!(order_id = %response.order_id, "Order prepared");
        Ok(response.order_id)
    }

    #[tracing::instrument(skip_all, err, name = "Order:Complete", fields(product_id = %product_id, order_id = %order_id, tx_hash = %tx_hash))]
    async fn complete(
        &self,
        product_id: &str,
        order_id: &OrderId,
        tx_hash: TxHash,
    ) -> Result<(), OrderServiceError> {
        let request = CompleteOrderRequest {
            product_id: product_id.to_string(),
            order_id: order_id.clone(),
            tx_hash,
        };
        let ack = self
            .with_retry("complete", |key| {
                let request = &request;
                async move { self.client.complete_order(request, key).await }
            })
            .await?;
        debug!(ack = %ack.0, "Order completed");
        Ok(())
    }
}
