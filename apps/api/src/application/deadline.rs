//! Deadlines for calls to external collaborators.
//!
//! Every call into the entitlement store, the credential authority or the
//! receipt verifier goes through [`within`], so no operation waits forever on
//! a dependency. An elapsed deadline surfaces as `AppError::Internal`.

use std::{future::Future, time::Duration};

use crate::app_error::{AppError, AppResult};

pub async fn within<T, F>(limit: Duration, operation: &'static str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(
                operation,
                timeout_ms = limit.as_millis() as u64,
                "External call timed out"
            );
            Err(AppError::Internal(format!("{operation} timed out")))
        }
    }
}
