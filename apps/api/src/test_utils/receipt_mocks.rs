use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::receipt_verifier::{
        AcknowledgementState, ProductPurchase, ReceiptVerifier,
    },
    domain::entities::receipt_provider::ReceiptProvider,
};

/// In-memory implementation of ReceiptVerifier for testing.
///
/// Purchases are keyed by token only; the product id is not checked.
#[derive(Default)]
pub struct InMemoryReceiptVerifier {
    purchases: Mutex<HashMap<String, ProductPurchase>>,
    acknowledgements: Mutex<HashMap<String, usize>>,
    queried_packages: Mutex<Vec<String>>,
    lookups: AtomicUsize,
    fail_acknowledgements: AtomicBool,
}

impl InMemoryReceiptVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: &str, purchase: ProductPurchase) {
        self.purchases
            .lock()
            .unwrap()
            .insert(token.to_string(), purchase);
    }

    /// Successful acknowledgements for a token.
    pub fn acknowledge_count(&self, token: &str) -> usize {
        self.acknowledgements
            .lock()
            .unwrap()
            .get(token)
            .copied()
            .unwrap_or(0)
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Package names passed to lookups, in call order.
    pub fn queried_packages(&self) -> Vec<String> {
        self.queried_packages.lock().unwrap().clone()
    }

    pub fn fail_acknowledgements(&self, fail: bool) {
        self.fail_acknowledgements.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReceiptVerifier for InMemoryReceiptVerifier {
    fn provider(&self) -> ReceiptProvider {
        ReceiptProvider::Dummy
    }

    async fn get_product_purchase(
        &self,
        package_name: &str,
        _product_id: &str,
        purchase_token: &str,
    ) -> AppResult<ProductPurchase> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.queried_packages
            .lock()
            .unwrap()
            .push(package_name.to_string());
        self.purchases
            .lock()
            .unwrap()
            .get(purchase_token)
            .cloned()
            .ok_or_else(|| AppError::Internal("purchase token not found".into()))
    }

    async fn acknowledge_product_purchase(
        &self,
        _package_name: &str,
        _product_id: &str,
        purchase_token: &str,
    ) -> AppResult<()> {
        if self.fail_acknowledgements.load(Ordering::SeqCst) {
            return Err(AppError::Internal("simulated acknowledgement failure".into()));
        }
        let mut purchases = self.purchases.lock().unwrap();
        let purchase = purchases
            .get_mut(purchase_token)
            .ok_or_else(|| AppError::Internal("purchase token not found".into()))?;
        if purchase.acknowledgement_state == AcknowledgementState::Acknowledged {
            return Err(AppError::Internal("purchase already acknowledged".into()));
        }
        purchase.acknowledgement_state = AcknowledgementState::Acknowledged;
        *self
            .acknowledgements
            .lock()
            .unwrap()
            .entry(purchase_token.to_string())
            .or_default() += 1;
        Ok(())
    }
}
