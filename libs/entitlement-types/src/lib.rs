//! Shared entitlement types and session token primitives.
//!
//! This crate provides:
//! - The `BasePlan` tier enum
//! - Claims embedded in session tokens (`EntitlementClaims`, `SessionTokenClaims`)
//! - API error codes
//! - Offline session token verification for downstream services

mod claims;
mod crypto;
mod errors;
mod plan;

pub use claims::{EntitlementClaims, SessionTokenClaims};
pub use crypto::verify_session_token;
pub use errors::{ErrorCode, JwtError};
pub use plan::{BasePlan, UnknownPlan};
