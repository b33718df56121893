use async_trait::async_trait;
use entitlement_types::EntitlementClaims;
use serde::Serialize;

use crate::{app_error::AppResult, domain::entities::account::AccountId};

/// A freshly issued session token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: &'static str,
}

/// Credential authority port - issues session tokens carrying embedded
/// entitlement claims, and revokes them.
///
/// Claims held here are a cache of the entitlement record. Use cases write
/// them after every record mutation and never read them back for decisions.
#[async_trait]
pub trait CredentialAuthority: Send + Sync {
    /// Replace the claims embedded in tokens issued from now on.
    async fn set_claims(&self, account_id: &AccountId, claims: &EntitlementClaims)
    -> AppResult<()>;

    /// Invalidate every token issued so far for the account.
    async fn revoke_all(&self, account_id: &AccountId) -> AppResult<()>;

    /// Issue a token embedding the current claims.
    /// Returns `NotFound` when the account has no identity entry.
    async fn issue_token(&self, account_id: &AccountId) -> AppResult<IssuedToken>;

    /// Resolve a bearer token to its account.
    /// Returns `Unauthenticated` for invalid, expired or revoked tokens.
    async fn verify_token(&self, token: &str) -> AppResult<AccountId>;

    /// Remove the identity entry; all its tokens stop verifying.
    async fn delete_identity(&self, account_id: &AccountId) -> AppResult<()>;
}
