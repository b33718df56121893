use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::instrument;

use super::entitlement::{EntitlementRepo, sync_claims};
use crate::{
    app_error::{AppError, AppResult},
    application::{
        deadline::within, ports::credential_authority::CredentialAuthority, validators,
    },
    domain::entities::account::AccountId,
};

/// Result of binding a session to a device
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindOutcome {
    pub session_valid: bool,
    pub device_changed: bool,
}

/// Single-device session binding.
///
/// Every bind refreshes claims and then revokes all previously issued
/// tokens, so no token minted before a login outlives it.
#[derive(Clone)]
pub struct SessionUseCases {
    repo: Arc<dyn EntitlementRepo>,
    credentials: Arc<dyn CredentialAuthority>,
    timeout: Duration,
}

impl SessionUseCases {
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
    pub async fn bind_session(
        &self,
        account_id: &AccountId,
        device_id: Option<&str>,
    ) -> AppResult<BindOutcome> {
        let device_id = validators::require_device_id(device_id)?;

        let current = within(self.timeout, "entitlements.get", self.repo.get(account_id))
            .await?
            .ok_or(AppError::NotFound)?;
        let device_changed = current.is_device_takeover(&device_id);

        // A concurrent delete between read and write also lands here.
        let record = within(
            self.timeout,
            "entitlements.bind_device",
            self.repo.bind_device(account_id, &device_id),
        )
        .await?
        .ok_or(AppError::NotFound)?;

        if device_changed {
            tracing::info!(
                previous_device = ?current.bound_device_id,
                device_id = %device_id,
                "Session moved to a new device"
            );
        }

        // Claims first, so tokens re-issued after the revocation carry them.
        sync_claims(self.credentials.as_ref(), self.timeout, &record).await;

        if let Err(e) = within(
            self.timeout,
            "credentials.revoke_all",
            self.credentials.revoke_all(account_id),
        )
        .await
        {
            tracing::error!(
                error = %e,
                "Token revocation failed after bind; earlier tokens stay valid until the next bind"
            );
        }

        Ok(BindOutcome {
            session_valid: record.session_valid,
            device_changed,
        })
    }
}
