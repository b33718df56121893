use crate::{
    adapters::http::app_state::AppState,
    application::{
        ports::{credential_authority::CredentialAuthority, receipt_verifier::ReceiptVerifier},
        use_cases::{
            account::AccountUseCases, entitlement::EntitlementRepo,
            provisioning::ProvisioningUseCases, purchase::PurchaseUseCases,
            session::SessionUseCases,
        },
    },
    domain::entities::receipt_provider::ReceiptProvider,
    infra::{
        InfraError, RateLimiterTrait,
        app_check::AppCheckVerifier,
        config::AppConfig,
        credential_authority::RedisCredentialAuthority,
        dummy_receipt_verifier::DummyReceiptVerifier,
        google_play_client::GooglePlayClient,
        google_play_verifier::GooglePlayVerifier,
        http_client::build_client,
        postgres_persistence,
        rate_limit::RedisRateLimiter,
        redis_manager,
    },
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Builds every adapter once; handlers only ever see the resulting state.
pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;
    let timeout = config.external_call_timeout;

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url, timeout).await?);
    let repo = postgres_arc as Arc<dyn EntitlementRepo>;

    let redis = redis_manager(&config.redis_url).await?;
    let rate_limiter: Arc<dyn RateLimiterTrait> = Arc::new(RedisRateLimiter::new(
        redis.clone(),
        config.rate_limit_window_secs,
        config.rate_limit_per_ip,
    ));
    let credentials: Arc<dyn CredentialAuthority> = Arc::new(RedisCredentialAuthority::new(
        redis,
        config.jwt_secret.clone(),
        config.access_token_ttl,
    ));

    let verifier = receipt_verifier(&config)?;
    tracing::info!(
        provider = %verifier.provider(),
        package = %config.canonical_package_name,
        products = ?config.allowed_product_ids,
        "Receipt verifier ready"
    );

    let app_check = config
        .app_check
        .as_ref()
        .map(AppCheckVerifier::new)
        .transpose()?
        .map(Arc::new);
    if app_check.is_none() {
        tracing::warn!("App attestation disabled; APP_CHECK_PUBLIC_KEY_PEM not set");
    }

    let session_use_cases = SessionUseCases::new(repo.clone(), credentials.clone(), timeout);
    let purchase_use_cases = PurchaseUseCases::new(
        repo.clone(),
        credentials.clone(),
        verifier,
        config.canonical_package_name.clone(),
        config.allowed_product_ids.clone(),
        timeout,
    );
    let provisioning_use_cases =
        ProvisioningUseCases::new(repo.clone(), credentials.clone(), timeout);
    let account_use_cases = AccountUseCases::new(repo, credentials.clone(), timeout);

    Ok(AppState {
        config: Arc::new(config),
        session_use_cases: Arc::new(session_use_cases),
        purchase_use_cases: Arc::new(purchase_use_cases),
        provisioning_use_cases: Arc::new(provisioning_use_cases),
        account_use_cases: Arc::new(account_use_cases),
        credentials,
        rate_limiter,
        app_check,
    })
}

fn receipt_verifier(config: &AppConfig) -> Result<Arc<dyn ReceiptVerifier>, InfraError> {
    match config.receipt_provider {
        ReceiptProvider::GooglePlay => {
            let credentials =
                config
                    .google_play
                    .as_ref()
                    .ok_or(InfraError::ConfigMissing {
                        var: "GOOGLE_SERVICE_ACCOUNT_EMAIL/GOOGLE_SERVICE_ACCOUNT_PRIVATE_KEY",
                    })?;
            let client = GooglePlayClient::new(
                build_client(config.external_call_timeout)?,
                credentials.client_email.clone(),
                &credentials.private_key_pem,
            )?;
            Ok(Arc::new(GooglePlayVerifier::new(client)))
        }
        ReceiptProvider::Dummy => {
            tracing::warn!("Using the dummy receipt verifier; purchases are NOT verified");
            Ok(Arc::new(DummyReceiptVerifier::new()))
        }
    }
}

pub fn init_tracing() -> Result<(), InfraError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "entitlement_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don’t show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs)
    let file = File::create("app.log").map_err(InfraError::LogFile)?;
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
    Ok(())
}
