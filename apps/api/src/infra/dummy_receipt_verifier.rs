use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::receipt_verifier::{
        AcknowledgementState, ProductPurchase, PurchaseState, ReceiptVerifier,
    },
    domain::entities::receipt_provider::ReceiptProvider,
};

/// Receipt verifier for local development.
///
/// No external calls are made. The purchase state is derived from the token
/// prefix (`pending_`, `canceled_`, anything else is purchased) and
/// acknowledgements are remembered for the lifetime of the process.
#[derive(Default)]
pub struct DummyReceiptVerifier {
    seen: Mutex<HashMap<String, DummyPurchase>>,
}

#[derive(Clone, Copy)]
struct DummyPurchase {
    first_seen: DateTime<Utc>,
    acknowledged: bool,
}

impl DummyReceiptVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_for(purchase_token: &str) -> PurchaseState {
        if purchase_token.starts_with("pending_") {
            PurchaseState::Pending
        } else if purchase_token.starts_with("canceled_") {
            PurchaseState::Canceled
        } else {
            PurchaseState::Purchased
        }
    }

    /// Deterministic order id so retried claims record the same purchase.
    fn order_id_for(purchase_token: &str) -> String {
        let digest = Sha256::digest(purchase_token.as_bytes());
        format!("DUMMY.{}", &hex::encode(digest)[..16])
    }

    fn key(package_name: &str, product_id: &str, purchase_token: &str) -> String {
        format!("{package_name}/{product_id}/{purchase_token}")
    }
}

#[async_trait]
impl ReceiptVerifier for DummyReceiptVerifier {
    fn provider(&self) -> ReceiptProvider {
        ReceiptProvider::Dummy
    }

    async fn get_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        purchase_token: &str,
    ) -> AppResult<ProductPurchase> {
        let mut seen = self
            .seen
            .lock()
            .map_err(|_| AppError::Internal("dummy verifier lock poisoned".into()))?;
        let entry = *seen
            .entry(Self::key(package_name, product_id, purchase_token))
            .or_insert_with(|| DummyPurchase {
                first_seen: Utc::now(),
                acknowledged: false,
            });

        Ok(ProductPurchase {
            purchase_state: Self::state_for(purchase_token),
            acknowledgement_state: if entry.acknowledged {
                AcknowledgementState::Acknowledged
            } else {
                AcknowledgementState::Pending
            },
            order_id: Some(Self::order_id_for(purchase_token)),
            purchased_at: Some(entry.first_seen),
        })
    }

    async fn acknowledge_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        purchase_token: &str,
    ) -> AppResult<()> {
        let mut seen = self
            .seen
            .lock()
            .map_err(|_| AppError::Internal("dummy verifier lock poisoned".into()))?;
        let entry = seen
            .get_mut(&Self::key(package_name, product_id, purchase_token))
            .ok_or_else(|| AppError::Internal("Unknown purchase token".into()))?;
        if entry.acknowledged {
            return Err(AppError::Internal("Purchase already acknowledged".into()));
        }
        entry.acknowledged = true;
        tracing::debug!(product_id = %product_id, "Dummy purchase acknowledged");
        Ok(())
    }
}
