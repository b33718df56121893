use std::collections::BTreeSet;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{delete, get},
};
use chrono::{DateTime, Utc};
use entitlement_types::BasePlan;
use serde::Serialize;

use crate::{
    adapters::http::{app_state::AppState, extract::AuthenticatedAccount},
    app_error::AppResult,
    domain::entities::entitlement_record::LastPurchase,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", delete(delete_account))
        .route("/entitlement", get(get_entitlement))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntitlementResponse {
    base_plan: BasePlan,
    addons: BTreeSet<String>,
    bound_device_id: Option<String>,
    session_valid: bool,
    last_purchase: Option<LastPurchase>,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct DeleteAccountResponse {
    success: bool,
}

/// GET /api/account/entitlement
/// Reads the caller's authoritative entitlement record.
async fn get_entitlement(
    State(app_state): State<AppState>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
) -> AppResult<impl IntoResponse> {
    let record = app_state.account_use_cases.get_entitlement(&account_id).await?;

    Ok(Json(EntitlementResponse {
        base_plan: record.base_plan,
        addons: record.addons,
        bound_device_id: record.bound_device_id,
        session_valid: record.session_valid,
        last_purchase: record.last_purchase,
        updated_at: record.updated_at,
    }))
}

/// DELETE /api/account
async fn delete_account(
    State(app_state): State<AppState>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
) -> AppResult<impl IntoResponse> {
    app_state.account_use_cases.delete_account(&account_id).await?;
    Ok(Json(DeleteAccountResponse { success: true }))
}
