use std::sync::Arc;

use crate::{
    application::{
        ports::credential_authority::CredentialAuthority,
        use_cases::{
            account::AccountUseCases, provisioning::ProvisioningUseCases,
            purchase::PurchaseUseCases, session::SessionUseCases,
        },
    },
    infra::{RateLimiterTrait, app_check::AppCheckVerifier, config::AppConfig},
};

/// Process-wide context, built once at startup and cloned into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub session_use_cases: Arc<SessionUseCases>,
    pub purchase_use_cases: Arc<PurchaseUseCases>,
    pub provisioning_use_cases: Arc<ProvisioningUseCases>,
    pub account_use_cases: Arc<AccountUseCases>,
    pub credentials: Arc<dyn CredentialAuthority>,
    pub rate_limiter: Arc<dyn RateLimiterTrait>,
    /// Present only when app attestation gating is enabled.
    pub app_check: Option<Arc<AppCheckVerifier>>,
}
