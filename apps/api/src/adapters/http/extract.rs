use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::deadline::within,
    domain::entities::account::AccountId,
    infra::{
        app_check::APP_CHECK_HEADER,
        hook_signature::{HOOK_SIGNATURE_HEADER, verify_hook_signature},
    },
};

/// Caller identity resolved from a `Bearer` session token.
///
/// When app attestation is enabled the `X-App-Check` header is verified
/// right after authentication, before the handler runs.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount(pub AccountId);

impl FromRequestParts<AppState> for AuthenticatedAccount {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthenticated)?;

        let account_id = within(
            state.config.external_call_timeout,
            "credentials.verify_token",
            state.credentials.verify_token(bearer.token()),
        )
        .await?;

        if let Some(app_check) = &state.app_check {
            let token = parts
                .headers
                .get(APP_CHECK_HEADER)
                .and_then(|v| v.to_str().ok());
            app_check.verify(token)?;
        }

        tracing::Span::current().record("account_id", tracing::field::display(&account_id));
        Ok(AuthenticatedAccount(account_id))
    }
}

/// JSON body of a system-invoked hook, accepted only with a valid
/// `X-Hook-Signature` over the raw bytes.
#[derive(Debug)]
pub struct SignedHook<T>(pub T);

impl<T> FromRequest<AppState> for SignedHook<T>
where
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let signature = req
            .headers()
            .get(HOOK_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or(AppError::Unauthenticated)?;

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::InvalidInput(e.body_text()))?;

        verify_hook_signature(
            state.config.hook_secret.expose_secret(),
            &signature,
            &body,
            Utc::now().timestamp(),
        )?;

        let payload = serde_json::from_slice(&body)
            .map_err(|e| AppError::InvalidInput(format!("Invalid JSON body: {e}")))?;
        Ok(SignedHook(payload))
    }
}

/// `Json` whose rejections surface as `InvalidInput`.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::InvalidInput(e.body_text()))?;
        Ok(JsonBody(value))
    }
}
