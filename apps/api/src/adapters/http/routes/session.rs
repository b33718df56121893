use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{
        app_state::AppState,
        extract::{AuthenticatedAccount, JsonBody},
    },
    app_error::AppResult,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/bind", post(bind_session))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BindSessionPayload {
    device_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BindSessionResponse {
    success: bool,
    session_valid: bool,
}

/// POST /api/session/bind
/// Binds the caller's session to `deviceId` and revokes every earlier token.
async fn bind_session(
    State(app_state): State<AppState>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
    JsonBody(payload): JsonBody<BindSessionPayload>,
) -> AppResult<impl IntoResponse> {
    let outcome = app_state
        .session_use_cases
        .bind_session(&account_id, payload.device_id.as_deref())
        .await?;

    Ok(Json(BindSessionResponse {
        success: true,
        session_valid: outcome.session_valid,
    }))
}
