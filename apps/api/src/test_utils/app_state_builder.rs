//! Test app state builder for HTTP-level integration testing.
//!
//! This module provides `TestAppStateBuilder` which creates a minimal `AppState`
//! with in-memory mocks for testing HTTP endpoints.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        ports::receipt_verifier::ProductPurchase,
        use_cases::{
            account::AccountUseCases, provisioning::ProvisioningUseCases,
            purchase::PurchaseUseCases, session::SessionUseCases,
        },
    },
    domain::entities::{
        entitlement_record::EntitlementRecord, receipt_provider::ReceiptProvider,
    },
    infra::{
        RateLimiterTrait,
        app_check::AppCheckVerifier,
        config::{AppCheckConfig, AppConfig},
    },
    test_utils::{
        InMemoryCredentialAuthority, InMemoryEntitlementRepo, InMemoryRateLimiter,
        InMemoryReceiptVerifier, TEST_APP_CHECK_PUBLIC_KEY, TEST_HOOK_SECRET,
    },
};

/// A valid configuration pointing at no real backing services.
pub fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        trust_proxy: false,
        database_url: String::new(),
        redis_url: String::new(),
        jwt_secret: SecretString::new("test_jwt_secret".into()),
        access_token_ttl: Duration::hours(1),
        canonical_package_name: "com.example.app".to_string(),
        allowed_product_ids: BTreeSet::from(["pacote_premium".to_string()]),
        max_concurrent_requests: 64,
        external_call_timeout: StdDuration::from_secs(5),
        receipt_provider: ReceiptProvider::Dummy,
        google_play: None,
        hook_secret: SecretString::new(TEST_HOOK_SECRET.into()),
        app_check: None,
        rate_limit_window_secs: 60,
        rate_limit_per_ip: 60,
    }
}

/// In-memory ports backing a test `AppState`, kept for assertions.
pub struct TestMocks {
    pub repo: Arc<InMemoryEntitlementRepo>,
    pub credentials: Arc<InMemoryCredentialAuthority>,
    pub verifier: Arc<InMemoryReceiptVerifier>,
}

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let (app_state, mocks) = TestAppStateBuilder::new()
///     .with_record(create_test_record(&account, |_| {}))
///     .with_purchase("tok123", create_test_purchase(|_| {}))
///     .build_with_mocks();
/// let token = mocks.credentials.bearer(&account);
/// ```
pub struct TestAppStateBuilder {
    records: Vec<EntitlementRecord>,
    purchases: Vec<(String, ProductPurchase)>,
    config: AppConfig,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            records: vec![],
            purchases: vec![],
            config: test_config(),
        }
    }

    /// Add an entitlement record to the test state.
    pub fn with_record(mut self, record: EntitlementRecord) -> Self {
        self.records.push(record);
        self
    }

    /// Register a purchase token with the in-memory verifier.
    pub fn with_purchase(mut self, token: &str, purchase: ProductPurchase) -> Self {
        self.purchases.push((token.to_string(), purchase));
        self
    }

    /// Require app attestation tokens issued for `audience`.
    pub fn with_app_check(mut self, audience: &str) -> Self {
        self.config.app_check = Some(AppCheckConfig {
            public_key_pem: TEST_APP_CHECK_PUBLIC_KEY.to_string(),
            audience: Some(audience.to_string()),
        });
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }

    /// Build the AppState and hand back the mocks behind it.
    pub fn build_with_mocks(self) -> (AppState, TestMocks) {
        let repo = Arc::new(InMemoryEntitlementRepo::with_records(self.records));
        let credentials = Arc::new(InMemoryCredentialAuthority::new());
        let verifier = Arc::new(InMemoryReceiptVerifier::new());
        for (token, purchase) in self.purchases {
            verifier.insert(&token, purchase);
        }

        let config = Arc::new(self.config);
        let timeout = config.external_call_timeout;

        let session_use_cases = Arc::new(SessionUseCases::new(
            repo.clone(),
            credentials.clone(),
            timeout,
        ));
        let purchase_use_cases = Arc::new(PurchaseUseCases::new(
            repo.clone(),
            credentials.clone(),
            verifier.clone(),
            config.canonical_package_name.clone(),
            config.allowed_product_ids.clone(),
            timeout,
        ));
        let provisioning_use_cases = Arc::new(ProvisioningUseCases::new(
            repo.clone(),
            credentials.clone(),
            timeout,
        ));
        let account_use_cases = Arc::new(AccountUseCases::new(
            repo.clone(),
            credentials.clone(),
            timeout,
        ));

        let app_check = config.app_check.as_ref().map(|c| {
            Arc::new(AppCheckVerifier::new(c).expect("test app check key should be valid"))
        });
        let rate_limiter: Arc<dyn RateLimiterTrait> = Arc::new(InMemoryRateLimiter::permissive());

        let app_state = AppState {
            config,
            session_use_cases,
            purchase_use_cases,
            provisioning_use_cases,
            account_use_cases,
            credentials: credentials.clone(),
            rate_limiter,
            app_check,
        };

        (
            app_state,
            TestMocks {
                repo,
                credentials,
                verifier,
            },
        )
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
