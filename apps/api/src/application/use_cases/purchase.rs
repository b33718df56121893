use std::{collections::BTreeSet, sync::Arc, time::Duration};

use entitlement_types::BasePlan;
use serde::Serialize;
use tracing::instrument;

use super::entitlement::{EntitlementRepo, sync_claims};
use crate::{
    app_error::{AppError, AppResult},
    application::{
        deadline::within,
        ports::{
            credential_authority::CredentialAuthority,
            receipt_verifier::{ProductPurchase, ReceiptVerifier},
        },
        validators,
    },
    domain::entities::{
        account::AccountId, entitlement_record::LastPurchase, product::ProductGrant,
    },
};

/// Client request to claim a purchase. Only identifiers are accepted; any
/// purchase state the client believes in is re-derived from the verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimPurchaseInput<'a> {
    pub product_id: Option<&'a str>,
    pub purchase_token: Option<&'a str>,
    pub package_name: Option<&'a str>,
}

/// Result of a successful claim
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOutcome {
    pub order_id: Option<String>,
    pub base_plan: BasePlan,
}

/// Purchase claiming: verify with the billing provider, acknowledge, then
/// grant. The entitlement record is written before claims are refreshed, so
/// a crash in between leaves claims under-granting, never over-granting.
#[derive(Clone)]
pub struct PurchaseUseCases {
    repo: Arc<dyn EntitlementRepo>,
    credentials: Arc<dyn CredentialAuthority>,
    verifier: Arc<dyn ReceiptVerifier>,
    canonical_package_name: String,
    allowed_products: BTreeSet<String>,
    timeout: Duration,
}

impl PurchaseUseCases {
    pub fn new(
        repo: Arc<dyn EntitlementRepo>,
        credentials: Arc<dyn CredentialAuthority>,
        verifier: Arc<dyn ReceiptVerifier>,
        canonical_package_name: String,
        allowed_products: BTreeSet<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            repo,
            credentials,
            verifier,
            canonical_package_name,
            allowed_products,
            timeout,
        }
    }

    #[instrument(
        skip(self, input),
        fields(account_id = %account_id, product_id = input.product_id.unwrap_or_default())
    )]
    pub async fn claim_purchase(
        &self,
        account_id: &AccountId,
        input: ClaimPurchaseInput<'_>,
    ) -> AppResult<ClaimOutcome> {
        let (product_id, purchase_token) =
            validators::require_purchase_fields(input.product_id, input.purchase_token)?;

        if !self.allowed_products.contains(&product_id) {
            tracing::warn!("Claim rejected: product not on allow-list");
            return Err(AppError::PermissionDenied("Unknown product".into()));
        }
        // Startup validation guarantees every allow-listed product has a grant.
        let grant = ProductGrant::lookup(&product_id).ok_or_else(|| {
            AppError::Internal(format!("No entitlement grant for product {product_id}"))
        })?;

        if let Some(package) = validators::optional_package_name(input.package_name)
            && package != self.canonical_package_name
        {
            tracing::warn!(asserted_package = %package, "Claim rejected: package mismatch");
            return Err(AppError::PermissionDenied("Package mismatch".into()));
        }

        if !validators::is_valid_purchase_token(&purchase_token) {
            return Err(AppError::InvalidInput("purchaseToken is malformed".into()));
        }

        let purchase = self.fetch_purchase(&product_id, &purchase_token).await?;

        if !purchase.purchase_state.is_completed() {
            tracing::info!(
                purchase_state = purchase.purchase_state.as_str(),
                "Claim rejected: purchase not completed"
            );
            return Err(AppError::FailedPrecondition("Purchase not completed".into()));
        }

        if purchase.needs_acknowledgement() {
            self.acknowledge(&product_id, &purchase_token).await?;
        } else {
            tracing::debug!("Purchase already acknowledged");
        }

        let last_purchase = LastPurchase {
            product_id: product_id.clone(),
            order_id: purchase.order_id.clone(),
            provider: self.verifier.provider(),
            purchased_at: purchase.purchased_at,
        };

        let record = within(
            self.timeout,
            "entitlements.apply_purchase",
            self.repo.apply_purchase(account_id, grant, &last_purchase),
        )
        .await?;

        sync_claims(self.credentials.as_ref(), self.timeout, &record).await;

        tracing::info!(
            base_plan = %record.base_plan,
            order_id = ?purchase.order_id,
            "Purchase granted"
        );

        Ok(ClaimOutcome {
            order_id: purchase.order_id,
            base_plan: record.base_plan,
        })
    }

    async fn fetch_purchase(
        &self,
        product_id: &str,
        purchase_token: &str,
    ) -> AppResult<ProductPurchase> {
        within(
            self.timeout,
            "receipts.get_product_purchase",
            self.verifier.get_product_purchase(
                &self.canonical_package_name,
                product_id,
                purchase_token,
            ),
        )
        .await
        .map_err(verifier_failure)
    }

    /// Acknowledges once. If the call fails because a concurrent retry got
    /// there first, the purchase reads back as acknowledged and that counts
    /// as success.
    async fn acknowledge(&self, product_id: &str, purchase_token: &str) -> AppResult<()> {
        let result = within(
            self.timeout,
            "receipts.acknowledge",
            self.verifier.acknowledge_product_purchase(
                &self.canonical_package_name,
                product_id,
                purchase_token,
            ),
        )
        .await;

        match result {
            Ok(()) => {
                tracing::info!("Purchase acknowledged");
                Ok(())
            }
            Err(e) => {
                let current = self.fetch_purchase(product_id, purchase_token).await?;
                if current.needs_acknowledgement() {
                    Err(verifier_failure(e))
                } else {
                    tracing::info!("Acknowledgement raced with a retry; already acknowledged");
                    Ok(())
                }
            }
        }
    }
}

/// Verifier failures surface as Internal unless they carry a recognised
/// precondition or policy outcome.
fn verifier_failure(err: AppError) -> AppError {
    match err {
        AppError::FailedPrecondition(_) | AppError::PermissionDenied(_) => err,
        other => {
            tracing::error!(error = %other, "Receipt verification failed");
            AppError::Internal("Purchase verification failed".into())
        }
    }
}
