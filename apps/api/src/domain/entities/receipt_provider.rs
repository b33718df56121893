use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Billing provider that verified a purchase receipt
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString, Default,
)]
#[sqlx(type_name = "receipt_provider", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ReceiptProvider {
    #[default]
    GooglePlay,
    Dummy,
}

impl ReceiptProvider {
    /// Human-readable display name for the provider
    pub fn display_name(&self) -> &'static str {
        match self {
            ReceiptProvider::GooglePlay => "Google Play",
            ReceiptProvider::Dummy => "Test Provider",
        }
    }

    /// Platform label recorded alongside purchases
    pub fn platform(&self) -> &'static str {
        match self {
            ReceiptProvider::GooglePlay => "android",
            ReceiptProvider::Dummy => "test",
        }
    }

    /// Whether this provider is the local development verifier
    pub fn is_dummy(&self) -> bool {
        matches!(self, ReceiptProvider::Dummy)
    }
}
