use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;

use crate::{
    adapters::http::{app_state::AppState, extract::SignedHook},
    app_error::{AppError, AppResult},
    domain::entities::account::{AccountId, DisplayAttributes},
};

/// System-invoked endpoints called by the identity provider. Requests are
/// authenticated by `X-Hook-Signature`, not by a session token.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/account-created", post(account_created))
        .route("/session-token", post(session_token))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountCreatedPayload {
    account_id: Option<String>,
    #[serde(default)]
    display_attributes: DisplayAttributes,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionTokenPayload {
    account_id: Option<String>,
}

/// POST /api/hooks/account-created
/// Fails with an error status when the record could not be written so the
/// identity provider redelivers.
async fn account_created(
    State(app_state): State<AppState>,
    SignedHook(payload): SignedHook<AccountCreatedPayload>,
) -> AppResult<impl IntoResponse> {
    app_state
        .provisioning_use_cases
        .on_account_created(payload.account_id.as_deref(), payload.display_attributes)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/hooks/session-token
/// Issues a session token after the identity provider completed sign-in.
async fn session_token(
    State(app_state): State<AppState>,
    SignedHook(payload): SignedHook<SessionTokenPayload>,
) -> AppResult<impl IntoResponse> {
    let account_id = payload
        .account_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(AccountId::new)
        .ok_or_else(|| AppError::InvalidInput("Missing accountId".into()))?;

    let token = app_state
        .account_use_cases
        .issue_session_token(&account_id)
        .await?;
    Ok(Json(token))
}
