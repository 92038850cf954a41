//! Lifecycle API (§4.G): the thin layer the HTTP front door calls. Every
//! operation here is a pass-through to the Store, plumbed through the Driver
//! Registry (for `submit`'s validation) and the In-flight Set (for the
//! operations that must not disturb a row a worker is holding).

use std::sync::Arc;

use chrono::Utc;

use super::driver::DriverRegistry;
use super::error::LifecycleError;
use super::inflight::InFlightSet;
use super::item::{Item, ItemDetail, ItemStatus, Params, State};
use super::store::Store;

pub struct Lifecycle {
    store: Arc<dyn Store>,
    registry: Arc<DriverRegistry>,
    inflight: Arc<InFlightSet>,
    max_tries: u32,
}

impl Lifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<DriverRegistry>,
        inflight: Arc<InFlightSet>,
        max_tries: u32,
    ) -> Self {
        Self {
            store,
            registry,
            inflight,
            max_tries,
        }
    }

    /// `submit` backs both `/send` (`retry=true`) and `/sendOnce`
    /// (`retry=false`, which pre-sets `tried = max_tries - 1` so the very
    /// next failure is terminal).
    pub async fn submit(&self, params: Params, retry: bool) -> Result<(), LifecycleError> {
        let driver = self
            .registry
            .get(&params.driver)
            .ok_or_else(|| LifecycleError::UnknownDriver(params.driver.clone()))?;

        let payload = serde_json::to_vec(&params.payload).unwrap_or_default();
        driver
            .verify(&payload)
            .map_err(LifecycleError::InvalidPayload)?;

        let now = Utc::now().timestamp();
        let tried = if retry {
            0
        } else {
            self.max_tries.saturating_sub(1)
        };

        let item = Item::builder()
            .id(params.id)
            .driver(params.driver)
            .endpoint(params.endpoint)
            .content(payload)
            .create_at(now)
            .next_at(now)
            .tried(tried)
            .state(State::Pending)
            .build();

        self.store.create(&item).await?;
        Ok(())
    }

    pub async fn resend(&self, id: &str) -> Result<(), LifecycleError> {
        self.store.resend(id, self.max_tries).await?;
        Ok(())
    }

    pub async fn result(&self, id: &str) -> Result<Vec<u8>, LifecycleError> {
        Ok(self.store.result(id).await?)
    }

    pub async fn status(&self, id: &str) -> Result<ItemStatus, LifecycleError> {
        Ok(self.store.status(id).await?)
    }

    pub async fn detail(&self, id: &str) -> Result<ItemDetail, LifecycleError> {
        Ok(self.store.detail(id).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<(), LifecycleError> {
        self.store.delete(id, &self.inflight.list()).await?;
        Ok(())
    }

    pub async fn clear(&self, before: i64) -> Result<(), LifecycleError> {
        self.store.clear(before, &self.inflight.list()).await?;
        Ok(())
    }

    pub async fn force_clear(&self, before: i64) -> Result<(), LifecycleError> {
        self.store.force_clear(before, &self.inflight.list()).await?;
        Ok(())
    }
}
