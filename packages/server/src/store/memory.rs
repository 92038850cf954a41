//! In-memory `Store` fake, used by the scenario tests (§8) so they exercise
//! the full claim/retry/delete machinery without a live Postgres instance.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::error::StoreError;
use crate::core::item::{Item, ItemDetail, ItemStatus, State};
use crate::core::store::Store;

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create(&self, item: &Item) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("memory store mutex poisoned");
        if rows.contains_key(&item.id) {
            return Err(StoreError::DuplicateId);
        }
        rows.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn resend(&self, id: &str, max_tries: u32) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("memory store mutex poisoned");
        let row = rows.get_mut(id).ok_or(StoreError::NotFound)?;
        row.tried = max_tries.saturating_sub(1);
        row.state = State::Pending;
        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        tried: u32,
        next_at: i64,
        state: State,
        response: Option<Vec<u8>>,
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("memory store mutex poisoned");
        if let Some(row) = rows.get_mut(id) {
            row.tried = tried;
            row.next_at = next_at;
            row.state = state;
            row.response = response;
        }
        // Missing row: silent no-op, per the Store contract.
        Ok(())
    }

    async fn result(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let rows = self.rows.lock().expect("memory store mutex poisoned");
        let row = rows.get(id).ok_or(StoreError::NotFound)?;
        Ok(row.response.clone().unwrap_or_default())
    }

    async fn status(&self, id: &str) -> Result<ItemStatus, StoreError> {
        let rows = self.rows.lock().expect("memory store mutex poisoned");
        let row = rows.get(id).ok_or(StoreError::NotFound)?;
        Ok(row.clone().into())
    }

    async fn detail(&self, id: &str) -> Result<ItemDetail, StoreError> {
        let rows = self.rows.lock().expect("memory store mutex poisoned");
        let row = rows.get(id).ok_or(StoreError::NotFound)?;
        Ok(row.clone().into())
    }

    async fn pending(
        &self,
        now: i64,
        max_tries: u32,
        enabled_drivers: &[String],
        busy_ids: &[String],
    ) -> Result<Option<Item>, StoreError> {
        let rows = self.rows.lock().expect("memory store mutex poisoned");
        let candidate = rows
            .values()
            .filter(|row| {
                row.state == State::Pending
                    && row.next_at <= now
                    && row.tried < max_tries
                    && enabled_drivers.iter().any(|d| d == &row.driver)
                    && !busy_ids.iter().any(|b| b == &row.id)
            })
            .min_by_key(|row| (row.next_at, row.id.clone()))
            .cloned();
        Ok(candidate)
    }

    async fn delete(&self, id: &str, busy_ids: &[String]) -> Result<(), StoreError> {
        if busy_ids.iter().any(|b| b == id) {
            return Err(StoreError::InUse);
        }
        let mut rows = self.rows.lock().expect("memory store mutex poisoned");
        rows.remove(id);
        Ok(())
    }

    async fn clear(&self, before: i64, busy_ids: &[String]) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("memory store mutex poisoned");
        rows.retain(|id, row| {
            let terminal = matches!(row.state, State::Success | State::Failed);
            !(row.create_at < before && terminal && !busy_ids.iter().any(|b| b == id))
        });
        Ok(())
    }

    async fn force_clear(&self, before: i64, busy_ids: &[String]) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("memory store mutex poisoned");
        rows.retain(|id, row| !(row.create_at < before && !busy_ids.iter().any(|b| b == id)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, driver: &str, next_at: i64, tried: u32, state: State) -> Item {
        Item::builder()
            .id(id)
            .driver(driver)
            .endpoint("ep")
            .content(b"hi".to_vec())
            .create_at(0)
            .next_at(next_at)
            .tried(tried)
            .state(state)
            .build()
    }

    #[tokio::test]
    async fn create_rejects_duplicate_ids() {
        let store = MemoryStore::new();
        store.create(&item("a", "echo", 0, 0, State::Pending)).await.unwrap();
        let err = store
            .create(&item("a", "echo", 0, 0, State::Pending))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId));
    }

    #[tokio::test]
    async fn pending_respects_all_filters() {
        let store = MemoryStore::new();
        store.create(&item("a", "echo", 100, 0, State::Pending)).await.unwrap();
        store.create(&item("b", "echo", 50, 0, State::Pending)).await.unwrap();

        // Not due yet.
        assert!(store.pending(10, 5, &["echo".into()], &[]).await.unwrap().is_none());

        // Oldest-next_at wins.
        let picked = store.pending(1000, 5, &["echo".into()], &[]).await.unwrap().unwrap();
        assert_eq!(picked.id, "b");

        // Busy ids are excluded.
        let picked = store
            .pending(1000, 5, &["echo".into()], &["b".into()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, "a");

        // Unregistered drivers are excluded.
        assert!(store
            .pending(1000, 5, &["sms".into()], &[])
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_on_missing_row_is_a_silent_no_op() {
        let store = MemoryStore::new();
        store
            .update("ghost", 1, 0, State::Failed, Some(b"x".to_vec()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_is_idempotent_on_absent_id() {
        let store = MemoryStore::new();
        store.delete("ghost", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn delete_refuses_busy_ids() {
        let store = MemoryStore::new();
        store.create(&item("a", "echo", 0, 0, State::Pending)).await.unwrap();
        let err = store.delete("a", &["a".into()]).await.unwrap_err();
        assert!(matches!(err, StoreError::InUse));
        // Row survives the refused delete.
        assert!(store.status("a").await.is_ok());
    }

    #[tokio::test]
    async fn clear_only_removes_terminal_rows_before_cutoff() {
        let store = MemoryStore::new();
        store.create(&item("done", "echo", 0, 1, State::Success)).await.unwrap();
        store.create(&item("pending", "echo", 0, 0, State::Pending)).await.unwrap();
        store.rows.lock().unwrap().get_mut("done").unwrap().create_at = 0;
        store.rows.lock().unwrap().get_mut("pending").unwrap().create_at = 0;

        store.clear(10, &[]).await.unwrap();

        assert!(matches!(
            store.status("done").await.unwrap_err(),
            StoreError::NotFound
        ));
        assert!(store.status("pending").await.is_ok());
    }
}
