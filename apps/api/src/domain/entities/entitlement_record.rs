use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use entitlement_types::{BasePlan, EntitlementClaims};
use serde::{Deserialize, Serialize};

use super::{
    account::{AccountId, DisplayAttributes},
    product::ProductGrant,
    receipt_provider::ReceiptProvider,
};

/// Audit trail of the most recent verified purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastPurchase {
    pub product_id: String,
    pub order_id: Option<String>,
    pub provider: ReceiptProvider,
    pub purchased_at: Option<DateTime<Utc>>,
}

/// Durable per-account entitlement state.
///
/// `base_plan` and `addons` here are authoritative. Credential claims are a
/// projection of this record (see [`EntitlementRecord::claims`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementRecord {
    pub account_id: AccountId,
    pub bound_device_id: Option<String>,
    pub session_valid: bool,
    pub base_plan: BasePlan,
    pub addons: BTreeSet<String>,
    pub last_purchase: Option<LastPurchase>,
    pub display: DisplayAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntitlementRecord {
    /// Record for a newly created account.
    pub fn provisioned(
        account_id: AccountId,
        display: DisplayAttributes,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            bound_device_id: None,
            session_valid: true,
            base_plan: BasePlan::Free,
            addons: BTreeSet::new(),
            last_purchase: None,
            display,
            created_at: now,
            updated_at: now,
        }
    }

    /// Credential claims mirroring this record.
    pub fn claims(&self) -> EntitlementClaims {
        EntitlementClaims {
            session_valid: self.session_valid,
            base_plan: self.base_plan,
            addons: self.addons.iter().cloned().collect(),
        }
    }

    /// Whether binding `device_id` moves the session to another device.
    /// A first bind (no device yet) counts as a takeover.
    pub fn is_device_takeover(&self, device_id: &str) -> bool {
        self.bound_device_id.as_deref() != Some(device_id)
    }

    /// Merges a product grant. Tiers only move up and addons accumulate, so
    /// applying the same grant twice leaves entitlements unchanged.
    pub fn apply_grant(&mut self, grant: &ProductGrant) {
        if let Some(plan) = grant.base_plan {
            self.base_plan = self.base_plan.max(plan);
        }
        self.addons
            .extend(grant.addons.iter().map(|a| (*a).to_string()));
    }

    /// Advances `updated_at` strictly past its previous value.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = next_updated_at(self.updated_at, now);
    }
}

/// Next mutation timestamp: wall clock, but never at or before `previous`.
pub fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
