use entitlement_types::BasePlan;

/// Entitlement granted by a sellable product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductGrant {
    pub product_id: &'static str,
    /// Tier the purchase upgrades to (never downgrades)
    pub base_plan: Option<BasePlan>,
    pub addons: &'static [&'static str],
}

/// Static product → entitlement table.
///
/// Every product on the configured allow-list must appear here; startup
/// fails otherwise.
pub const PRODUCT_CATALOG: &[ProductGrant] = &[ProductGrant {
    product_id: "pacote_premium",
    base_plan: Some(BasePlan::Basic),
    addons: &[],
}];

impl ProductGrant {
    pub fn lookup(product_id: &str) -> Option<&'static ProductGrant> {
        PRODUCT_CATALOG.iter().find(|g| g.product_id == product_id)
    }
}
