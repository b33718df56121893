use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::InfraError;
use crate::app_error::{AppError, AppResult};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const PUBLISHER_API_BASE: &str = "https://androidpublisher.googleapis.com/androidpublisher/v3";
const PUBLISHER_SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Cached access tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// `purchases.products` resource of the Android Publisher API (subset).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleProductPurchase {
    /// 0 = purchased, 1 = canceled, 2 = pending
    pub purchase_state: Option<i32>,
    /// 0 = yet to be acknowledged, 1 = acknowledged
    pub acknowledgement_state: Option<i32>,
    pub order_id: Option<String>,
    /// Milliseconds since epoch, encoded as a decimal string
    pub purchase_time_millis: Option<String>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct GoogleErrorResponse {
    error: GoogleErrorBody,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    code: Option<u16>,
    message: Option<String>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Android Publisher API client authenticated as a service account.
pub struct GooglePlayClient {
    client: Client,
    client_email: String,
    signing_key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
}

impl GooglePlayClient {
    pub fn new(
        client: Client,
        client_email: String,
        private_key_pem: &SecretString,
    ) -> Result<Self, InfraError> {
        let signing_key = EncodingKey::from_rsa_pem(private_key_pem.expose_secret().as_bytes())
            .map_err(|source| InfraError::InvalidKey {
                var: "GOOGLE_SERVICE_ACCOUNT_PRIVATE_KEY",
                source,
            })?;
        Ok(Self {
            client,
            client_email,
            signing_key,
            token: Mutex::new(None),
        })
    }

    /// Returns a cached access token, exchanging a fresh service-account
    /// assertion when the cached one is about to expire.
    async fn access_token(&self) -> AppResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.is_fresh(Instant::now())
        {
            return Ok(token.access_token.clone());
        }

        let now = chrono::Utc::now().timestamp();
        let assertion = encode(
            &Header::new(Algorithm::RS256),
            &AssertionClaims {
                iss: &self.client_email,
                scope: PUBLISHER_SCOPE,
                aud: TOKEN_URL,
                iat: now,
                exp: now + ASSERTION_LIFETIME_SECS,
            },
            &self.signing_key,
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign service account assertion: {e}")))?;

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Google OAuth request failed: {e}")))?;
        let token: TokenResponse = handle_response(response).await?;

        tracing::debug!(expires_in = token.expires_in, "Obtained Google API access token");
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(access_token)
    }

    fn purchase_url(
        package_name: &str,
        product_id: &str,
        purchase_token: &str,
        action: Option<&str>,
    ) -> AppResult<Url> {
        let mut url = Url::parse(PUBLISHER_API_BASE)
            .map_err(|e| AppError::Internal(format!("Invalid publisher base URL: {e}")))?;
        let last = match action {
            Some(action) => format!("{purchase_token}:{action}"),
            None => purchase_token.to_string(),
        };
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Publisher base URL cannot be a base".into()))?
            .extend([
                "applications",
                package_name,
                "purchases",
                "products",
                product_id,
                "tokens",
                last.as_str(),
            ]);
        Ok(url)
    }

    pub async fn get_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        purchase_token: &str,
    ) -> AppResult<GoogleProductPurchase> {
        let url = Self::purchase_url(package_name, product_id, purchase_token, None)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(self.access_token().await?)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Google Play request failed: {e}")))?;

        handle_response(response).await
    }

    pub async fn acknowledge_product_purchase(
        &self,
        package_name: &str,
        product_id: &str,
        purchase_token: &str,
    ) -> AppResult<()> {
        let url = Self::purchase_url(package_name, product_id, purchase_token, Some("acknowledge"))?;
        let response = self
            .client
            .post(url)
            .bearer_auth(self.access_token().await?)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Google Play request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }
        Ok(())
    }
}

async fn handle_response<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> AppResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read response: {e}")))?;

    if !status.is_success() {
        return Err(api_error(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse Google API response");
        AppError::Internal(format!("Failed to parse Google API response: {e}"))
    })
}

fn api_error(status: reqwest::StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<GoogleErrorResponse>(body)
        .ok()
        .and_then(|e| {
            let code = e.error.code.unwrap_or(status.as_u16());
            e.error.message.map(|m| format!("{code}: {m}"))
        })
        .unwrap_or_else(|| status.to_string());
    tracing::error!(status = %status, message = %message, "Google API error");
    AppError::Internal(format!("Google API error: {message}"))
}
