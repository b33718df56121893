use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use entitlement_types::BasePlan;
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, parse_json_with_fallback},
    app_error::{AppError, AppResult},
    application::use_cases::entitlement::EntitlementRepo,
    domain::entities::{
        account::{AccountId, DisplayAttributes},
        entitlement_record::{EntitlementRecord, LastPurchase},
        product::ProductGrant,
        receipt_provider::ReceiptProvider,
    },
};

const RECORD_COLUMNS: &str = "account_id, bound_device_id, session_valid, base_plan, addons, \
    last_product_id, last_order_id, last_provider, last_purchased_at, display_attributes, \
    created_at, updated_at";

/// `updated_at` for an existing row: wall clock, strictly after the stored value.
const NEXT_UPDATED_AT: &str = "GREATEST(now(), entitlement_records.updated_at + interval '1 microsecond')";

fn row_to_record(row: sqlx::postgres::PgRow) -> AppResult<EntitlementRecord> {
    let account_id: String = row.get("account_id");
    let base_plan: String = row.get("base_plan");
    let base_plan: BasePlan = base_plan.parse().map_err(|e| {
        tracing::error!(account_id = %account_id, error = %e, "Corrupt base_plan in entitlement record");
        AppError::Internal("Corrupt entitlement record".into())
    })?;
    let addons: Vec<String> = row.get("addons");
    let last_product_id: Option<String> = row.get("last_product_id");
    let last_provider: Option<ReceiptProvider> = row.get("last_provider");
    let last_purchase = last_product_id.map(|product_id| LastPurchase {
        product_id,
        order_id: row.get("last_order_id"),
        provider: last_provider.unwrap_or_default(),
        purchased_at: row.get("last_purchased_at"),
    });
    let display: serde_json::Value = row.get("display_attributes");
    let display: DisplayAttributes =
        parse_json_with_fallback(&display, "display_attributes", "entitlement_record", &account_id);

    Ok(EntitlementRecord {
        account_id: AccountId::new(account_id),
        bound_device_id: row.get("bound_device_id"),
        session_valid: row.get("session_valid"),
        base_plan,
        addons: addons.into_iter().collect(),
        last_purchase,
        display,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn display_json(display: &DisplayAttributes) -> AppResult<serde_json::Value> {
    serde_json::to_value(display).map_err(|e| AppError::Internal(e.to_string()))
}

/// Orders nested records so every child precedes its parent.
///
/// Walks the parent/child forest with an explicit stack, so arbitrarily deep
/// nesting cannot exhaust the call stack. Records whose parent is not in
/// `records` are treated as roots.
pub(crate) fn deletion_order(records: &[(Uuid, Option<Uuid>)]) -> Vec<Uuid> {
    let ids: HashSet<Uuid> = records.iter().map(|(id, _)| *id).collect();
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    let mut roots = Vec::new();
    for (id, parent) in records {
        match parent {
            Some(parent) if ids.contains(parent) => children.entry(*parent).or_default().push(*id),
            _ => roots.push(*id),
        }
    }

    // Pre-order walk; reversed, every descendant comes before its ancestor.
    let mut order = Vec::with_capacity(records.len());
    let mut visited = HashSet::with_capacity(records.len());
    let mut stack = roots;
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        order.push(id);
        if let Some(kids) = children.get(&id) {
            stack.extend(kids.iter().copied());
        }
    }
    order.reverse();
    order
}

impl PostgresPersistence {
    async fn lock_record(
        tx: &mut Transaction<'_, Postgres>,
        account_id: &AccountId,
    ) -> AppResult<Option<EntitlementRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM entitlement_records WHERE account_id = $1 FOR UPDATE"
        ))
        .bind(account_id.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::from)?;
        row.map(row_to_record).transpose()
    }
}

#[async_trait]
impl EntitlementRepo for PostgresPersistence {
    async fn get(&self, account_id: &AccountId) -> AppResult<Option<EntitlementRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM entitlement_records WHERE account_id = $1"
        ))
        .bind(account_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.map(row_to_record).transpose()
    }

    async fn provision(
        &self,
        account_id: &AccountId,
        display: &DisplayAttributes,
    ) -> AppResult<EntitlementRecord> {
        // On redelivery only display attributes that are present are merged;
        // entitlement fields keep whatever a later bind or claim wrote.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO entitlement_records (account_id, display_attributes)
            VALUES ($1, jsonb_strip_nulls($2))
            ON CONFLICT (account_id) DO UPDATE SET
                display_attributes = entitlement_records.display_attributes
                    || jsonb_strip_nulls(EXCLUDED.display_attributes),
                updated_at = {NEXT_UPDATED_AT}
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(account_id.as_str())
        .bind(display_json(display)?)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        row_to_record(row)
    }

    async fn bind_device(
        &self,
        account_id: &AccountId,
        device_id: &str,
    ) -> AppResult<Option<EntitlementRecord>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE entitlement_records
            SET bound_device_id = $2, session_valid = TRUE, updated_at = {NEXT_UPDATED_AT}
            WHERE account_id = $1
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(account_id.as_str())
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.map(row_to_record).transpose()
    }

    async fn apply_purchase(
        &self,
        account_id: &AccountId,
        grant: &ProductGrant,
        purchase: &LastPurchase,
    ) -> AppResult<EntitlementRecord> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        // Claims may precede provisioning; make sure there is a row to lock
        // so concurrent claims serialize on it.
        sqlx::query(
            "INSERT INTO entitlement_records (account_id) VALUES ($1) ON CONFLICT (account_id) DO NOTHING",
        )
        .bind(account_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        let mut record = Self::lock_record(&mut tx, account_id)
            .await?
            .ok_or(AppError::NotFound)?;
        record.apply_grant(grant);
        record.last_purchase = Some(purchase.clone());
        record.touch(Utc::now());

        let row = sqlx::query(&format!(
            r#"
            UPDATE entitlement_records SET
                base_plan = $2,
                addons = $3,
                last_product_id = $4,
                last_order_id = $5,
                last_provider = $6,
                last_purchased_at = $7,
                updated_at = $8
            WHERE account_id = $1
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(account_id.as_str())
        .bind(record.base_plan.as_str())
        .bind(record.addons.iter().cloned().collect::<Vec<String>>())
        .bind(purchase.product_id.as_str())
        .bind(purchase.order_id.as_deref())
        .bind(purchase.provider)
        .bind(purchase.purchased_at)
        .bind(record.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        row_to_record(row)
    }

    async fn recursive_delete(&self, account_id: &AccountId) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let nested: Vec<(Uuid, Option<Uuid>)> = sqlx::query(
            "SELECT id, parent_id FROM account_records WHERE account_id = $1 FOR UPDATE",
        )
        .bind(account_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(AppError::from)?
        .into_iter()
        .map(|row| (row.get("id"), row.get("parent_id")))
        .collect();

        let order = deletion_order(&nested);
        for id in &order {
            sqlx::query("DELETE FROM account_records WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::from)?;
        }

        let deleted = sqlx::query("DELETE FROM entitlement_records WHERE account_id = $1")
            .bind(account_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?
            .rows_affected();

        tx.commit().await.map_err(AppError::from)?;

        tracing::debug!(
            account_id = %account_id,
            nested_records = order.len(),
            entitlement_rows = deleted,
            "Account records deleted"
        );
        Ok(())
    }
}
