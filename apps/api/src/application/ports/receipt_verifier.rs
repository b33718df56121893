use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{app_error::AppResult, domain::entities::receipt_provider::ReceiptProvider};

// ============================================================================
// Port Types - Provider-agnostic purchase state
// ============================================================================

/// Purchase state as reported by the billing provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseState {
    Purchased,
    Canceled,
    Pending,
}

impl PurchaseState {
    pub fn is_completed(&self) -> bool {
        matches!(self, PurchaseState::Purchased)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseState::Purchased => "purchased",
            PurchaseState::Canceled => "canceled",
            PurchaseState::Pending => "pending",
        }
    }
}

/// Whether the provider has been told the purchase was processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcknowledgementState {
    Pending,
    Acknowledged,
}

/// A one-time product purchase as seen by the billing provider.
///
/// This is the only trusted view of a purchase; client-supplied state is
/// never consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductPurchase {
    pub purchase_state: PurchaseState,
    pub acknowledgement_state: AcknowledgementState,
    pub order_id: Option<String>,
    pub purchased_at: Option<DateTime<Utc>>,
}

impl ProductPurchase {
    pub fn needs_acknowledgement(&self) -> bool {
        self.acknowledgement_state == AcknowledgementState::Pending
    }
}

// ============================================================================
// Receipt Verifier Port
// ============================================================================

/// Receipt verifier port - the external authority on purchase validity.
///
/// Implementations must treat the package name as given; callers pass the
/// server-configured canonical package, never a client-asserted one.
#[async_trait]
pub trait ReceiptVerifier: Send + Sync {
    /// Get the provider type
    fn provider(&self) -> ReceiptProvider;

    /// Look up a purchase token for a product.
    async fn get_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        purchase_token: &str,
    ) -> AppResult<ProductPurchase>;

    /// Acknowledge a purchase so the provider does not refund it.
    async fn acknowledge_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        purchase_token: &str,
    ) -> AppResult<()>;
}
