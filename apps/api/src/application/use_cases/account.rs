use std::{sync::Arc, time::Duration};

use tracing::instrument;

use super::entitlement::{EntitlementRepo, sync_claims};
use crate::{
    app_error::{AppError, AppResult},
    application::{
        deadline::within,
        ports::credential_authority::{CredentialAuthority, IssuedToken},
    },
    domain::entities::{account::AccountId, entitlement_record::EntitlementRecord},
};

/// Account-level operations: reading the own record, sign-in token issuance
/// and deletion.
#[derive(Clone)]
pub struct AccountUseCases {
    repo: Arc<dyn EntitlementRepo>,
    credentials: Arc<dyn CredentialAuthority>,
    timeout: Duration,
}

impl AccountUseCases {
    pub fn new(
        repo: Arc<dyn EntitlementRepo>,
        credentials: Arc<dyn CredentialAuthority>,
        timeout: Duration,
    ) -> Self {
        Self {
            repo,
            credentials,
            timeout,
        }
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn get_entitlement(&self, account_id: &AccountId) -> AppResult<EntitlementRecord> {
        within(self.timeout, "entitlements.get", self.repo.get(account_id))
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Issues a session token after sign-in.
    ///
    /// Claims are re-projected from the record first, which also recreates a
    /// lost identity entry.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn issue_session_token(&self, account_id: &AccountId) -> AppResult<IssuedToken> {
        let record = self.get_entitlement(account_id).await?;

        if !sync_claims(self.credentials.as_ref(), self.timeout, &record).await {
            return Err(AppError::Internal("Could not refresh claims".into()));
        }

        let token = within(
            self.timeout,
            "credentials.issue_token",
            self.credentials.issue_token(account_id),
        )
        .await?;

        tracing::debug!(expires_in = token.expires_in, "Session token issued");
        Ok(token)
    }

    /// Deletes the entitlement record with all nested records, then the
    /// identity. The identity goes last so a failure never leaves an identity
    /// without a backing record.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn delete_account(&self, account_id: &AccountId) -> AppResult<()> {
        within(
            self.timeout,
            "entitlements.recursive_delete",
            self.repo.recursive_delete(account_id),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to delete account records");
            AppError::Internal("Failed to delete account data".into())
        })?;

        within(
            self.timeout,
            "credentials.delete_identity",
            self.credentials.delete_identity(account_id),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Records deleted but identity deletion failed");
            AppError::Internal("Failed to delete account identity".into())
        })?;

        tracing::info!("Account deleted");
        Ok(())
    }
}
