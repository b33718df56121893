use std::{collections::BTreeSet, net::SocketAddr, time::Duration as StdDuration};

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use time::Duration;

use super::InfraError;
use crate::{
    application::validators,
    domain::entities::{product::ProductGrant, receipt_provider::ReceiptProvider},
};

/// Service-account credentials for the Google Play Developer API.
#[derive(Clone)]
pub struct GooglePlayCredentials {
    pub client_email: String,
    pub private_key_pem: SecretString,
}

/// Public key and audience used to verify app attestation tokens.
#[derive(Debug, Clone)]
pub struct AppCheckConfig {
    pub public_key_pem: String,
    pub audience: Option<String>,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    /// Whether to trust X-Forwarded-For headers. Set to true when behind a reverse proxy.
    /// SECURITY: Only enable this when the API is not directly exposed to the internet.
    pub trust_proxy: bool,
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: SecretString,
    pub access_token_ttl: Duration,
    /// The only package name purchases are verified against.
    pub canonical_package_name: String,
    pub allowed_product_ids: BTreeSet<String>,
    pub max_concurrent_requests: usize,
    /// Deadline applied to every store, credential and verifier call.
    pub external_call_timeout: StdDuration,
    pub receipt_provider: ReceiptProvider,
    pub google_play: Option<GooglePlayCredentials>,
    /// HMAC secret shared with the identity provider for signed hooks.
    pub hook_secret: SecretString,
    /// Attestation gating is enabled only when a key is configured.
    pub app_check: Option<AppCheckConfig>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_per_ip: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, InfraError> {
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3001)));
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .map_err(|_| InfraError::ConfigInvalid {
                    var: "CORS_ORIGIN",
                    reason: "not a valid header value".into(),
                })?;
        // Default to false for security - must explicitly enable when behind a trusted proxy
        let trust_proxy: bool = get_env_default("TRUST_PROXY", false);
        let database_url: String = get_env("DATABASE_URL");
        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let jwt_secret = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let access_token_ttl_secs: i64 = get_env_default("ACCESS_TOKEN_TTL_SECS", 3600);
        let canonical_package_name: String = get_env("CANONICAL_PACKAGE_NAME");
        let allowed_product_ids = parse_product_ids(&get_env_default(
            "ALLOWED_PRODUCT_IDS",
            "pacote_premium".to_string(),
        ));
        let max_concurrent_requests: usize = get_env_default("MAX_CONCURRENT_REQUESTS", 10);
        let external_call_timeout_secs: u64 = get_env_default("EXTERNAL_CALL_TIMEOUT_SECS", 10);
        let receipt_provider: ReceiptProvider = get_env_default(
            "RECEIPT_PROVIDER",
            ReceiptProvider::GooglePlay.to_string(),
        )
        .parse()
        .map_err(|_| InfraError::ConfigInvalid {
            var: "RECEIPT_PROVIDER",
            reason: "expected google_play or dummy".into(),
        })?;
        let google_play = match (
            optional_env("GOOGLE_SERVICE_ACCOUNT_EMAIL"),
            optional_env("GOOGLE_SERVICE_ACCOUNT_PRIVATE_KEY"),
        ) {
            (Some(client_email), Some(key)) => Some(GooglePlayCredentials {
                client_email,
                // Keys pasted into .env files usually carry escaped newlines.
                private_key_pem: SecretString::new(key.replace("\\n", "\n").into()),
            }),
            _ => None,
        };
        let hook_secret = SecretString::new(get_env::<String>("HOOK_SECRET").into());
        let app_check = optional_env("APP_CHECK_PUBLIC_KEY_PEM").map(|pem| AppCheckConfig {
            public_key_pem: pem.replace("\\n", "\n"),
            audience: optional_env("APP_CHECK_AUDIENCE"),
        });
        let rate_limit_window_secs: u64 = get_env_default("RATE_LIMIT_WINDOW_SECS", 60);
        let rate_limit_per_ip: u64 = get_env_default("RATE_LIMIT_PER_IP", 60);

        let config = Self {
            bind_addr,
            cors_origin,
            trust_proxy,
            database_url,
            redis_url,
            jwt_secret,
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
            canonical_package_name,
            allowed_product_ids,
            max_concurrent_requests,
            external_call_timeout: StdDuration::from_secs(external_call_timeout_secs),
            receipt_provider,
            google_play,
            hook_secret,
            app_check,
            rate_limit_window_secs,
            rate_limit_per_ip,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field invariants the service relies on at runtime.
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.allowed_product_ids.is_empty() {
            return Err(InfraError::ConfigInvalid {
                var: "ALLOWED_PRODUCT_IDS",
                reason: "allow-list is empty".into(),
            });
        }
        if let Some(malformed) = self
            .allowed_product_ids
            .iter()
            .find(|id| !validators::is_valid_product_id(id))
        {
            return Err(InfraError::ConfigInvalid {
                var: "ALLOWED_PRODUCT_IDS",
                reason: format!("product id {malformed:?} is malformed"),
            });
        }
        if let Some(unknown) = self
            .allowed_product_ids
            .iter()
            .find(|id| ProductGrant::lookup(id).is_none())
        {
            return Err(InfraError::ConfigInvalid {
                var: "ALLOWED_PRODUCT_IDS",
                reason: format!("product {unknown} has no entitlement grant"),
            });
        }
        if self.canonical_package_name.trim().is_empty() {
            return Err(InfraError::ConfigInvalid {
                var: "CANONICAL_PACKAGE_NAME",
                reason: "must not be empty".into(),
            });
        }
        if self.receipt_provider == ReceiptProvider::GooglePlay && self.google_play.is_none() {
            return Err(InfraError::ConfigMissing {
                var: "GOOGLE_SERVICE_ACCOUNT_EMAIL/GOOGLE_SERVICE_ACCOUNT_PRIVATE_KEY",
            });
        }
        if self.max_concurrent_requests == 0 {
            return Err(InfraError::ConfigInvalid {
                var: "MAX_CONCURRENT_REQUESTS",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn optional_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Comma-separated product ids, trimmed, blanks ignored.
pub fn parse_product_ids(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
