pub mod account;
pub mod health;
pub mod hooks;
pub mod purchase;
pub mod session;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/session", session::router())
        .nest("/purchases", purchase::router())
        .nest("/account", account::router())
        .nest("/hooks", hooks::router())
        .nest("/health", health::router())
}
