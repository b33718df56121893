use std::collections::HashMap;

use async_trait::async_trait;
use entitlement_types::EntitlementClaims;
use redis::{AsyncCommands, aio::ConnectionManager};
use secrecy::SecretString;
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

const CLAIMS_FIELD: &str = "claims";
const EPOCH_FIELD: &str = "epoch";

/// Credential authority backed by redis.
///
/// Each account has a hash `credential:{accountId}` holding the claims to
/// embed and the current token epoch. Tokens carry the epoch they were issued
/// under; rotating it revokes them all at once.
#[derive(Clone)]
pub struct RedisCredentialAuthority {
    manager: ConnectionManager,
    jwt_secret: SecretString,
    token_ttl: Duration,
}

impl RedisCredentialAuthority {
    pub fn new(manager: ConnectionManager, jwt_secret: SecretString, token_ttl: Duration) -> Self {
        Self {
            manager,
            jwt_secret,
            token_ttl,
        }
    }

    fn key(account_id: &AccountId) -> String {
        format!("credential:{account_id}")
    }
}

fn redis_err(e: redis::RedisError) -> AppError {
    AppError::Internal(e.to_string())
}

#[async_trait]
impl CredentialAuthority for RedisCredentialAuthority {
    async fn set_claims(
        &self,
        account_id: &AccountId,
        claims: &EntitlementClaims,
    ) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let payload =
            serde_json::to_string(claims).map_err(|e| AppError::Internal(e.to_string()))?;
        let key = Self::key(account_id);

        let _: () = redis::pipe()
            .atomic()
            .hset(&key, CLAIMS_FIELD, payload)
            .ignore()
            .hset_nx(&key, EPOCH_FIELD, Uuid::new_v4().to_string())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;

        tracing::debug!(account_id = %account_id, "Claims replaced");
        Ok(())
    }

    async fn revoke_all(&self, account_id: &AccountId) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .hset(Self::key(account_id), EPOCH_FIELD, Uuid::new_v4().to_string())
            .await
            .map_err(redis_err)?;

        tracing::info!(account_id = %account_id, "All session tokens revoked");
        Ok(())
    }

    async fn issue_token(&self, account_id: &AccountId) -> AppResult<IssuedToken> {
        let mut conn = self.manager.clone();
        let entry: HashMap<String, String> = conn
            .hgetall(Self::key(account_id))
            .await
            .map_err(redis_err)?;

        let (Some(raw_claims), Some(epoch)) = (entry.get(CLAIMS_FIELD), entry.get(EPOCH_FIELD))
        else {
            return Err(AppError::NotFound);
        };
        let claims: EntitlementClaims =
            serde_json::from_str(raw_claims).map_err(|e| AppError::Internal(e.to_string()))?;

        let access_token = jwt::issue(account_id, epoch, claims, &self.jwt_secret, self.token_ttl)?;
        Ok(IssuedToken {
            access_token,
            expires_in: self.token_ttl.whole_seconds(),
            token_type: "Bearer",
        })
    }

    async fn verify_token(&self, token: &str) -> AppResult<AccountId> {
        let claims = jwt::verify(token, &self.jwt_secret)?;
        let account_id = AccountId::new(claims.sub);

        let mut conn = self.manager.clone();
        let current: Option<String> = conn
            .hget(Self::key(&account_id), EPOCH_FIELD)
            .await
            .map_err(redis_err)?;

        if current.as_deref() != Some(claims.epoch.as_str()) {
            tracing::debug!(account_id = %account_id, "Session token revoked");
            return Err(AppError::Unauthenticated);
        }
        Ok(account_id)
    }

    async fn delete_identity(&self, account_id: &AccountId) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(Self::key(account_id)).await.map_err(redis_err)?;
        Ok(())
    }
}
