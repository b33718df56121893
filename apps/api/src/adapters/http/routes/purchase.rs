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
    application::use_cases::purchase::ClaimPurchaseInput,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/claim", post(claim_purchase))
}

/// Only identifiers are read from the client. Any purchase state fields it
/// sends are ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaimPurchasePayload {
    product_id: Option<String>,
    purchase_token: Option<String>,
    package_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimPurchaseResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<String>,
}

/// POST /api/purchases/claim
async fn claim_purchase(
    State(app_state): State<AppState>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
    JsonBody(payload): JsonBody<ClaimPurchasePayload>,
) -> AppResult<impl IntoResponse> {
    let outcome = app_state
        .purchase_use_cases
        .claim_purchase(
            &account_id,
            ClaimPurchaseInput {
                product_id: payload.product_id.as_deref(),
                purchase_token: payload.purchase_token.as_deref(),
                package_name: payload.package_name.as_deref(),
            },
        )
        .await?;

    Ok(Json(ClaimPurchaseResponse {
        success: true,
        order_id: outcome.order_id,
    }))
}
