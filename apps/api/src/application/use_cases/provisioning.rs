use std::{sync::Arc, time::Duration};

use tracing::instrument;

use super::entitlement::{EntitlementRepo, sync_claims};
use crate::{
    app_error::{AppError, AppResult},
    application::{
        deadline::within, ports::credential_authority::CredentialAuthority, validators,
    },
    domain::entities::{
        account::{AccountId, DisplayAttributes},
        entitlement_record::EntitlementRecord,
    },
};

/// Reacts to account creation by seeding the default entitlement.
///
/// Delivery is at-least-once, so provisioning merges into any existing
/// record instead of overwriting it.
#[derive(Clone)]
pub struct ProvisioningUseCases {
    repo: Arc<dyn EntitlementRepo>,
    credentials: Arc<dyn CredentialAuthority>,
    timeout: Duration,
}

impl ProvisioningUseCases {
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

    #[instrument(skip(self, display), fields(account_id = account_id.unwrap_or_default()))]
    pub async fn on_account_created(
        &self,
        account_id: Option<&str>,
        display: DisplayAttributes,
    ) -> AppResult<EntitlementRecord> {
        let account_id = account_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(AccountId::new)
            .ok_or_else(|| AppError::InvalidInput("Missing accountId".into()))?;
        let display = sanitize_display(display);

        let record = within(
            self.timeout,
            "entitlements.provision",
            self.repo.provision(&account_id, &display),
        )
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Provisioning failed to write record"))?;

        sync_claims(self.credentials.as_ref(), self.timeout, &record).await;

        tracing::info!(base_plan = %record.base_plan, "Account provisioned");
        Ok(record)
    }
}

/// Display data never blocks provisioning: blanks become `None` and a
/// malformed email is dropped.
fn sanitize_display(display: DisplayAttributes) -> DisplayAttributes {
    let clean = |v: Option<String>| {
        v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    };
    let email = clean(display.email).filter(|email| {
        let valid = validators::is_valid_email(email);
        if !valid {
            tracing::warn!("Dropping malformed email from display attributes");
        }
        valid
    });
    DisplayAttributes {
        display_name: clean(display.display_name),
        email,
        photo_url: clean(display.photo_url),
    }
}
