//! In-memory mock implementation of the entitlement store.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use crate::{
    adapters::persistence::entitlement_record::deletion_order,
    app_error::{AppError, AppResult},
    application::use_cases::entitlement::EntitlementRepo,
    domain::entities::{
        account::{AccountId, DisplayAttributes},
        entitlement_record::{EntitlementRecord, LastPurchase, next_updated_at},
        product::ProductGrant,
    },
};

/// A nested sub-record, addressed in tests by a slash-separated path.
#[derive(Debug, Clone)]
pub struct NestedRecord {
    pub id: Uuid,
    pub account_id: AccountId,
    pub parent_id: Option<Uuid>,
    pub path: String,
}

/// In-memory implementation of EntitlementRepo for testing.
#[derive(Default)]
pub struct InMemoryEntitlementRepo {
    records: Mutex<HashMap<AccountId, EntitlementRecord>>,
    nested: Mutex<Vec<NestedRecord>>,
    reads: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryEntitlementRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repo with initial records for testing.
    pub fn with_records(records: Vec<EntitlementRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.account_id.clone(), r))
            .collect();
        Self {
            records: Mutex::new(map),
            ..Self::default()
        }
    }

    /// Current record (for test assertions).
    pub fn record(&self, account_id: &AccountId) -> Option<EntitlementRecord> {
        self.records.lock().unwrap().get(account_id).cloned()
    }

    /// Number of `get` calls made so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make every mutating call fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Add nested records by path; `a/b` becomes a child of `a`.
    pub fn add_nested(&self, account_id: &AccountId, paths: &[&str]) {
        let mut nested = self.nested.lock().unwrap();
        for path in paths {
            let parent_id = path.rsplit_once('/').and_then(|(parent, _)| {
                nested
                    .iter()
                    .find(|n| &n.account_id == account_id && n.path == parent)
                    .map(|n| n.id)
            });
            nested.push(NestedRecord {
                id: Uuid::new_v4(),
                account_id: account_id.clone(),
                parent_id,
                path: path.to_string(),
            });
        }
    }

    pub fn nested_count(&self, account_id: &AccountId) -> usize {
        self.nested
            .lock()
            .unwrap()
            .iter()
            .filter(|n| &n.account_id == account_id)
            .count()
    }

    fn check_writable(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntitlementRepo for InMemoryEntitlementRepo {
    async fn get(&self, account_id: &AccountId) -> AppResult<Option<EntitlementRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.record(account_id))
    }

    async fn provision(
        &self,
        account_id: &AccountId,
        display: &DisplayAttributes,
    ) -> AppResult<EntitlementRecord> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        let now = Utc::now();
        let record = records
            .entry(account_id.clone())
            .and_modify(|r| {
                if display.display_name.is_some() {
                    r.display.display_name = display.display_name.clone();
                }
                if display.email.is_some() {
                    r.display.email = display.email.clone();
                }
                if display.photo_url.is_some() {
                    r.display.photo_url = display.photo_url.clone();
                }
                r.touch(now);
            })
            .or_insert_with(|| {
                EntitlementRecord::provisioned(account_id.clone(), display.clone(), now)
            });
        Ok(record.clone())
    }

    async fn bind_device(
        &self,
        account_id: &AccountId,
        device_id: &str,
    ) -> AppResult<Option<EntitlementRecord>> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        Ok(records.get_mut(account_id).map(|r| {
            r.bound_device_id = Some(device_id.to_string());
            r.session_valid = true;
            r.updated_at = next_updated_at(r.updated_at, Utc::now());
            r.clone()
        }))
    }

    async fn apply_purchase(
        &self,
        account_id: &AccountId,
        grant: &ProductGrant,
        purchase: &LastPurchase,
    ) -> AppResult<EntitlementRecord> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        let now = Utc::now();
        let record = records.entry(account_id.clone()).or_insert_with(|| {
            EntitlementRecord::provisioned(account_id.clone(), DisplayAttributes::default(), now)
        });
        record.apply_grant(grant);
        record.last_purchase = Some(purchase.clone());
        record.touch(now);
        Ok(record.clone())
    }

    async fn recursive_delete(&self, account_id: &AccountId) -> AppResult<()> {
        self.check_writable()?;
        let mut nested = self.nested.lock().unwrap();
        let edges: Vec<(Uuid, Option<Uuid>)> = nested
            .iter()
            .filter(|n| &n.account_id == account_id)
            .map(|n| (n.id, n.parent_id))
            .collect();
        for id in deletion_order(&edges) {
            assert!(
                !nested.iter().any(|n| n.parent_id == Some(id)),
                "parent deleted before its children"
            );
            nested.retain(|n| n.id != id);
        }
        self.records.lock().unwrap().remove(account_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_record;

    #[tokio::test]
    async fn recursive_delete_clears_only_the_account() {
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");
        let repo = InMemoryEntitlementRepo::with_records(vec![
            create_test_record(&alice, |_| {}),
            create_test_record(&bob, |_| {}),
        ]);
        repo.add_nested(&alice, &["a", "a/b", "a/b/c"]);
        repo.add_nested(&bob, &["a"]);

        repo.recursive_delete(&alice).await.unwrap();

        assert!(repo.record(&alice).is_none());
        assert_eq!(repo.nested_count(&alice), 0);
        assert!(repo.record(&bob).is_some());
        assert_eq!(repo.nested_count(&bob), 1);
    }
}
