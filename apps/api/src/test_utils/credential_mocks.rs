//! In-memory credential authority with the same epoch-based revocation as
//! the redis adapter.

use async_trait::async_trait;
use entitlement_types::{EntitlementClaims, SessionTokenClaims};
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use time::Duration;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        jwt,
        ports::credential_authority::{CredentialAuthority, IssuedToken},
    },
    domain::entities::account::AccountId,
};

const MOCK_TOKEN_TTL: Duration = Duration::hours(1);

/// Mutating calls made against the credential authority, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialCall {
    SetClaims(AccountId),
    RevokeAll(AccountId),
    DeleteIdentity(AccountId),
}

#[derive(Debug, Clone)]
struct Identity {
    claims: Option<EntitlementClaims>,
    epoch: String,
}

impl Identity {
    fn new() -> Self {
        Self {
            claims: None,
            epoch: Uuid::new_v4().to_string(),
        }
    }
}

/// In-memory implementation of CredentialAuthority for testing.
pub struct InMemoryCredentialAuthority {
    identities: Mutex<HashMap<AccountId, Identity>>,
    calls: Mutex<Vec<CredentialCall>>,
    fail_set_claims: AtomicBool,
    fail_revocations: AtomicBool,
    secret: SecretString,
}

impl Default for InMemoryCredentialAuthority {
    fn default() -> Self {
        Self {
            identities: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_set_claims: AtomicBool::new(false),
            fail_revocations: AtomicBool::new(false),
            secret: SecretString::new("credential_mock_secret".into()),
        }
    }
}

impl InMemoryCredentialAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// All mutating calls so far (failed ones included).
    pub fn calls(&self) -> Vec<CredentialCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn revocation_count(&self, account_id: &AccountId) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == CredentialCall::RevokeAll(account_id.clone()))
            .count()
    }

    /// Claims currently held for the account.
    pub fn claims(&self, account_id: &AccountId) -> Option<EntitlementClaims> {
        self.identities
            .lock()
            .unwrap()
            .get(account_id)
            .and_then(|i| i.claims.clone())
    }

    pub fn fail_set_claims(&self, fail: bool) {
        self.fail_set_claims.store(fail, Ordering::SeqCst);
    }

    pub fn fail_revocations(&self, fail: bool) {
        self.fail_revocations.store(fail, Ordering::SeqCst);
    }

    /// Signs the account in without recording calls and returns a valid
    /// access token.
    pub fn bearer(&self, account_id: &AccountId) -> String {
        let mut identities = self.identities.lock().unwrap();
        let identity = identities
            .entry(account_id.clone())
            .or_insert_with(Identity::new);
        let claims = identity
            .claims
            .get_or_insert_with(EntitlementClaims::provisioned)
            .clone();
        jwt::issue(account_id, &identity.epoch, claims, &self.secret, MOCK_TOKEN_TTL).unwrap()
    }

    /// Decodes a token issued by this authority.
    pub fn decode(&self, token: &str) -> SessionTokenClaims {
        jwt::verify(token, &self.secret).unwrap()
    }

    fn record(&self, call: CredentialCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CredentialAuthority for InMemoryCredentialAuthority {
    async fn set_claims(
        &self,
        account_id: &AccountId,
        claims: &EntitlementClaims,
    ) -> AppResult<()> {
        self.record(CredentialCall::SetClaims(account_id.clone()));
        if self.fail_set_claims.load(Ordering::SeqCst) {
            return Err(AppError::Internal("simulated claim failure".into()));
        }
        self.identities
            .lock()
            .unwrap()
            .entry(account_id.clone())
            .or_insert_with(Identity::new)
            .claims = Some(claims.clone());
        Ok(())
    }

    async fn revoke_all(&self, account_id: &AccountId) -> AppResult<()> {
        self.record(CredentialCall::RevokeAll(account_id.clone()));
        if self.fail_revocations.load(Ordering::SeqCst) {
            return Err(AppError::Internal("simulated revocation failure".into()));
        }
        self.identities
            .lock()
            .unwrap()
            .entry(account_id.clone())
            .or_insert_with(Identity::new)
            .epoch = Uuid::new_v4().to_string();
        Ok(())
    }

    async fn issue_token(&self, account_id: &AccountId) -> AppResult<IssuedToken> {
        let (claims, epoch) = {
            let identities = self.identities.lock().unwrap();
            let identity = identities.get(account_id).ok_or(AppError::NotFound)?;
            let claims = identity.claims.clone().ok_or(AppError::NotFound)?;
            (claims, identity.epoch.clone())
        };
        Ok(IssuedToken {
            access_token: jwt::issue(account_id, &epoch, claims, &self.secret, MOCK_TOKEN_TTL)?,
            expires_in: MOCK_TOKEN_TTL.whole_seconds(),
            token_type: "Bearer",
        })
    }

    async fn verify_token(&self, token: &str) -> AppResult<AccountId> {
        let claims = jwt::verify(token, &self.secret)?;
        let account_id = AccountId::new(claims.sub);
        let identities = self.identities.lock().unwrap();
        match identities.get(&account_id) {
            Some(identity) if identity.epoch == claims.epoch => Ok(account_id.clone()),
            _ => Err(AppError::Unauthenticated),
        }
    }

    async fn delete_identity(&self, account_id: &AccountId) -> AppResult<()> {
        self.record(CredentialCall::DeleteIdentity(account_id.clone()));
        self.identities.lock().unwrap().remove(account_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revocation_invalidates_earlier_tokens_only() {
        let authority = InMemoryCredentialAuthority::new();
        let account = AccountId::new("acc_1");
        let old = authority.bearer(&account);

        authority.revoke_all(&account).await.unwrap();
        let fresh = authority.issue_token(&account).await.unwrap();

        assert!(authority.verify_token(&old).await.is_err());
        assert_eq!(
            authority.verify_token(&fresh.access_token).await.unwrap(),
            account
        );
    }

    #[tokio::test]
    async fn issuing_without_identity_is_not_found() {
        let authority = InMemoryCredentialAuthority::new();
        assert!(matches!(
            authority.issue_token(&AccountId::new("nobody")).await,
            Err(AppError::NotFound)
        ));
    }
}
