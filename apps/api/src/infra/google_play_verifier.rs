use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::receipt_verifier::{
        AcknowledgementState, ProductPurchase, PurchaseState, ReceiptVerifier,
    },
    domain::entities::receipt_provider::ReceiptProvider,
    infra::google_play_client::{GooglePlayClient, GoogleProductPurchase},
};

/// Adapter that wraps GooglePlayClient to implement ReceiptVerifier.
pub struct GooglePlayVerifier {
    client: GooglePlayClient,
}

impl GooglePlayVerifier {
    pub fn new(client: GooglePlayClient) -> Self {
        Self { client }
    }

    /// Convert Google purchase state codes to domain state
    fn map_purchase_state(code: Option<i32>) -> AppResult<PurchaseState> {
        match code {
            Some(0) => Ok(PurchaseState::Purchased),
            Some(1) => Ok(PurchaseState::Canceled),
            Some(2) => Ok(PurchaseState::Pending),
            other => Err(AppError::Internal(format!(
                "Unexpected purchase state {other:?}"
            ))),
        }
    }

    fn map_acknowledgement_state(code: Option<i32>) -> AcknowledgementState {
        match code {
            Some(1) => AcknowledgementState::Acknowledged,
            _ => AcknowledgementState::Pending,
        }
    }

    fn parse_millis(raw: Option<&str>) -> Option<DateTime<Utc>> {
        raw.and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    fn to_domain(purchase: GoogleProductPurchase) -> AppResult<ProductPurchase> {
        Ok(ProductPurchase {
            purchase_state: Self::map_purchase_state(purchase.purchase_state)?,
            acknowledgement_state: Self::map_acknowledgement_state(purchase.acknowledgement_state),
            purchased_at: Self::parse_millis(purchase.purchase_time_millis.as_deref()),
            order_id: purchase.order_id,
        })
    }
}

#[async_trait]
impl ReceiptVerifier for GooglePlayVerifier {
    fn provider(&self) -> ReceiptProvider {
        ReceiptProvider::GooglePlay
    }

    async fn get_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        purchase_token: &str,
    ) -> AppResult<ProductPurchase> {
        let purchase = self
            .client
            .get_product_purchase(package_name, product_id, purchase_token)
            .await?;
        Self::to_domain(purchase)
    }

    async fn acknowledge_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        purchase_token: &str,
    ) -> AppResult<()> {
        self.client
            .acknowledge_product_purchase(package_name, product_id, purchase_token)
            .await
    }
}
