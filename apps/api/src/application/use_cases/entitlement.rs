use std::time::Duration;

use async_trait::async_trait;

use crate::{
    app_error::AppResult,
    application::{deadline::within, ports::credential_authority::CredentialAuthority},
    domain::entities::{
        account::{AccountId, DisplayAttributes},
        entitlement_record::{EntitlementRecord, LastPurchase},
        product::ProductGrant,
    },
};

/// Durable store of entitlement records.
///
/// Every mutating method is a single atomic write: a concurrent reader sees
/// either the previous record or the new one, never a mix. Concurrent writers
/// for the same account resolve last-writer-wins.
#[async_trait]
pub trait EntitlementRepo: Send + Sync {
    async fn get(&self, account_id: &AccountId) -> AppResult<Option<EntitlementRecord>>;

    /// Creates the provisioned record, or merges display attributes into an
    /// existing one without touching its entitlement fields. Returns the
    /// resulting record.
    async fn provision(
        &self,
        account_id: &AccountId,
        display: &DisplayAttributes,
    ) -> AppResult<EntitlementRecord>;

    /// Binds `device_id`, marks the session valid and advances `updated_at`.
    /// Returns `None` when the account has no record.
    async fn bind_device(
        &self,
        account_id: &AccountId,
        device_id: &str,
    ) -> AppResult<Option<EntitlementRecord>>;

    /// Merges a product grant and records the purchase, creating the record
    /// when absent. Re-applying the same purchase yields the same
    /// entitlements.
    async fn apply_purchase(
        &self,
        account_id: &AccountId,
        grant: &ProductGrant,
        purchase: &LastPurchase,
    ) -> AppResult<EntitlementRecord>;

    /// Deletes the record and every nested record beneath it, at any depth.
    /// Deleting an absent account is a no-op.
    async fn recursive_delete(&self, account_id: &AccountId) -> AppResult<()>;
}

/// Writes the claims projection of `record` to the credential authority.
///
/// Failures are logged and swallowed: the record is authoritative and the
/// next bind, claim or sign-in rewrites the claims.
pub(crate) async fn sync_claims(
    credentials: &dyn CredentialAuthority,
    timeout: Duration,
    record: &EntitlementRecord,
) -> bool {
    let claims = record.claims();
    match within(
        timeout,
        "credentials.set_claims",
        credentials.set_claims(&record.account_id, &claims),
    )
    .await
    {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                account_id = %record.account_id,
                error = %e,
                "Claim refresh failed; claims lag behind entitlement record"
            );
            false
        }
    }
}
