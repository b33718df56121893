//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::json;

use crate::{
    application::ports::receipt_verifier::{
        AcknowledgementState, ProductPurchase, PurchaseState,
    },
    domain::entities::{
        account::{AccountId, DisplayAttributes},
        entitlement_record::EntitlementRecord,
    },
};

/// Shared secret the test app state uses to sign provisioning hooks.
pub const TEST_HOOK_SECRET: &str = "test_hook_secret";

/// Public half of the key that signs test app attestation tokens.
pub const TEST_APP_CHECK_PUBLIC_KEY: &str = include_str!("fixtures/app_check_test_key.pub.pem");

const TEST_APP_CHECK_PRIVATE_KEY: &str = include_str!("fixtures/app_check_test_key.pem");

/// Create a freshly provisioned entitlement record.
pub fn create_test_record(
    account_id: &AccountId,
    overrides: impl FnOnce(&mut EntitlementRecord),
) -> EntitlementRecord {
    let mut record = EntitlementRecord::provisioned(
        account_id.clone(),
        DisplayAttributes {
            display_name: Some("Test User".to_string()),
            email: Some("test@example.com".to_string()),
            photo_url: None,
        },
        test_datetime(),
    );
    overrides(&mut record);
    record
}

/// Create a completed purchase that still awaits acknowledgement.
pub fn create_test_purchase(overrides: impl FnOnce(&mut ProductPurchase)) -> ProductPurchase {
    let mut purchase = ProductPurchase {
        purchase_state: PurchaseState::Purchased,
        acknowledgement_state: AcknowledgementState::Pending,
        order_id: Some("GPA.1234-5678-9012-34567".to_string()),
        purchased_at: Some(test_datetime()),
    };
    overrides(&mut purchase);
    purchase
}

/// Sign an app attestation token for `audience`. A negative `ttl_secs`
/// yields an already expired token.
pub fn sign_app_check_token(audience: &str, ttl_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "sub": "1:123456:android:abcdef",
        "aud": [audience],
        "iat": now,
        "exp": now + ttl_secs,
    });
    let key = EncodingKey::from_rsa_pem(TEST_APP_CHECK_PRIVATE_KEY.as_bytes())
        .expect("fixture key is valid PEM");
    encode(&Header::new(Algorithm::RS256), &claims, &key).expect("signing succeeds")
}

/// Returns a fixed test datetime for deterministic testing.
fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use entitlement_types::BasePlan;

    #[test]
    fn test_create_record_defaults() {
        let record = create_test_record(&AccountId::new("acc_1"), |_| {});
        assert_eq!(record.base_plan, BasePlan::Free);
        assert!(record.session_valid);
        assert!(record.bound_device_id.is_none());
    }

    #[test]
    fn test_create_record_with_overrides() {
        let record = create_test_record(&AccountId::new("acc_1"), |r| {
            r.bound_device_id = Some("device-a".to_string());
        });
        assert_eq!(record.bound_device_id.as_deref(), Some("device-a"));
    }

    #[test]
    fn test_create_purchase_needs_acknowledgement() {
        assert!(create_test_purchase(|_| {}).needs_acknowledgement());
    }
}
