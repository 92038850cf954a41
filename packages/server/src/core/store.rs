//! Durable persistence and the atomic claim query. Every operation may fail
//! with `StoreError::Transient`; lookups additionally fail with
//! `StoreError::NotFound`. `update` is the one operation that must never
//! surface a missing row as an error, see the trait doc below.

use async_trait::async_trait;

use super::error::StoreError;
use super::item::{Item, ItemDetail, ItemStatus, State};

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new row. Fails with `StoreError::DuplicateId` if `id` exists.
    async fn create(&self, item: &Item) -> Result<(), StoreError>;

    /// Rewind `tried` to `max_tries - 1` and `state` back to `PENDING`.
    /// `StoreError::NotFound` if the row does not exist.
    async fn resend(&self, id: &str, max_tries: u32) -> Result<(), StoreError>;

    /// Unconditional row update. *Must not* fail if the row is missing: a
    /// worker's `update` can race a user's `delete`, and the delete wins, so
    /// the update is silently swallowed. Internal only; never blocked by the
    /// In-flight Set.
    async fn update(
        &self,
        id: &str,
        tried: u32,
        next_at: i64,
        state: State,
        response: Option<Vec<u8>>,
    ) -> Result<(), StoreError>;

    /// Last response bytes. `NotFound` if the row does not exist.
    async fn result(&self, id: &str) -> Result<Vec<u8>, StoreError>;

    /// `{create_at, next_at, tried, state}`. `NotFound` if the row does not exist.
    async fn status(&self, id: &str) -> Result<ItemStatus, StoreError>;

    /// Status plus `driver`, `endpoint`, `content`, `response`.
    async fn detail(&self, id: &str) -> Result<ItemDetail, StoreError>;

    /// The oldest-`next_at` row with `state=PENDING`, `next_at <= now`,
    /// `tried < max_tries`, `driver` in `enabled_drivers`, and `id` not in
    /// `busy_ids`. `Ok(None)` if nothing qualifies — this is not an error.
    async fn pending(
        &self,
        now: i64,
        max_tries: u32,
        enabled_drivers: &[String],
        busy_ids: &[String],
    ) -> Result<Option<Item>, StoreError>;

    /// Remove the row unless `id` is in `busy_ids` (`StoreError::InUse`).
    /// Silently succeeds if the row is already absent.
    async fn delete(&self, id: &str, busy_ids: &[String]) -> Result<(), StoreError>;

    /// Remove all rows with `create_at < before`, `state` terminal, and `id`
    /// not in `busy_ids`.
    async fn clear(&self, before: i64, busy_ids: &[String]) -> Result<(), StoreError>;

    /// Remove all rows with `create_at < before` and `id` not in `busy_ids`,
    /// regardless of state.
    async fn force_clear(&self, before: i64, busy_ids: &[String]) -> Result<(), StoreError>;
}
