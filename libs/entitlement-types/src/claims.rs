use serde::{Deserialize, Serialize};

use crate::BasePlan;

/// Entitlement attributes embedded in session tokens.
///
/// A projection of the account's entitlement record at the time of the last
/// refresh. Consumers may use it for display and coarse gating; the server
/// never treats it as a source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementClaims {
    pub session_valid: bool,
    pub base_plan: BasePlan,
    /// Sorted, deduplicated addon identifiers
    #[serde(default)]
    pub addons: Vec<String>,
}

impl EntitlementClaims {
    /// Claims for a freshly provisioned account.
    pub fn provisioned() -> Self {
        Self {
            session_valid: true,
            base_plan: BasePlan::Free,
            addons: Vec::new(),
        }
    }
}

/// JWT claims of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokenClaims {
    /// Account ID (subject)
    pub sub: String,

    /// Revocation epoch the token was issued under
    pub epoch: String,

    /// Entitlements at issue time
    pub entitlements: EntitlementClaims,

    /// Token expiration (Unix timestamp)
    pub exp: i64,

    /// Token issued at (Unix timestamp)
    pub iat: i64,
}
