use std::time::Duration;

use redis::aio::ConnectionManager;

use crate::{adapters::persistence::PostgresPersistence, infra::db::init_db};

pub mod app;
pub mod app_check;
pub mod config;
pub mod credential_authority;
pub mod db;
pub mod dummy_receipt_verifier;
pub mod error;
pub mod google_play_client;
pub mod google_play_verifier;
pub mod hook_signature;
pub mod http_client;
pub mod rate_limit;
pub mod setup;

pub use error::InfraError;
pub use rate_limit::RateLimiterTrait;

pub async fn postgres_persistence(
    database_url: &str,
    acquire_timeout: Duration,
) -> Result<PostgresPersistence, InfraError> {
    let pool = init_db(database_url, acquire_timeout).await?;
    Ok(PostgresPersistence::new(pool))
}

/// Shared redis connection; cloning the manager reuses the multiplexed link.
pub async fn redis_manager(redis_url: &str) -> Result<ConnectionManager, InfraError> {
    let client = redis::Client::open(redis_url).map_err(InfraError::RedisConnection)?;
    client
        .get_connection_manager()
        .await
        .map_err(InfraError::RedisConnection)
}
