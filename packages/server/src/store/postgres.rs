//! Postgres-backed `Store`. Query shapes are grounded in the original's
//! `model/pgsqldrv` driver, adapted from prepared positional placeholders +
//! hand-built `IN (...)` lists to sqlx's `= ANY($n)` array binding — the
//! idiomatic equivalent once the driver list and busy-id list are arrays
//! instead of individually numbered parameters.
//!
//! `tried`/`max_tries` are bound and stored as `i64` (the `tried` column is
//! `BIGINT`), not `i32`: `max_tries=0` normalizes to `u32::MAX` (§8), and
//! `u32::MAX as i32` wraps to `-1`, which would make the claim predicate
//! `tried < max_tries` vacuously false forever.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::StoreError;
use crate::core::item::{Item, ItemDetail, ItemStatus, State};
use crate::core::store::Store;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn create(&self, item: &Item) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO items (notify_id, driver, endpoint, content, create_at, next_at, tried, cur_state)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.driver)
        .bind(&item.endpoint)
        .bind(&item.content)
        .bind(item.create_at)
        .bind(item.next_at)
        .bind(i64::from(item.tried))
        .bind(item.state.as_i16())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateId)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn resend(&self, id: &str, max_tries: u32) -> Result<(), StoreError> {
        let rewound_tries = i64::from(max_tries.saturating_sub(1));
        let result = sqlx::query(
            "UPDATE items SET tried = $1, cur_state = 0 WHERE notify_id = $2",
        )
        .bind(rewound_tries)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
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
        // Unconditional: a zero-row match (the worker raced a `delete`) is
        // not an error, so the affected-row count is never inspected here.
        sqlx::query(
            "UPDATE items SET tried = $1, next_at = $2, cur_state = $3, response = $4 WHERE notify_id = $5",
        )
        .bind(i64::from(tried))
        .bind(next_at)
        .bind(state.as_i16())
        .bind(response)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn result(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let row: Option<(Option<Vec<u8>>,)> =
            sqlx::query_as("SELECT response FROM items WHERE notify_id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((response,)) => Ok(response.unwrap_or_default()),
            None => Err(StoreError::NotFound),
        }
    }

    async fn status(&self, id: &str) -> Result<ItemStatus, StoreError> {
        let row: Option<(i64, i64, i64, i16)> = sqlx::query_as(
            "SELECT create_at, next_at, tried, cur_state FROM items WHERE notify_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let (create_at, next_at, tried, cur_state) = row.ok_or(StoreError::NotFound)?;
        Ok(ItemStatus {
            create_at,
            next_at,
            tried: tried as u32,
            state: State::from_i16(cur_state).unwrap_or(State::Pending),
        })
    }

    async fn detail(&self, id: &str) -> Result<ItemDetail, StoreError> {
        #[allow(clippy::type_complexity)]
        let row: Option<(String, String, Vec<u8>, Option<Vec<u8>>, i64, i64, i64, i16)> =
            sqlx::query_as(
                r#"
                SELECT driver, endpoint, content, response, create_at, next_at, tried, cur_state
                FROM items WHERE notify_id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let (driver, endpoint, content, response, create_at, next_at, tried, cur_state) =
            row.ok_or(StoreError::NotFound)?;

        Ok(ItemDetail {
            driver,
            endpoint,
            content: String::from_utf8_lossy(&content).into_owned(),
            response: response.as_deref().map(|r| String::from_utf8_lossy(r).into_owned()),
            status: ItemStatus {
                create_at,
                next_at,
                tried: tried as u32,
                state: State::from_i16(cur_state).unwrap_or(State::Pending),
            },
        })
    }

    async fn pending(
        &self,
        now: i64,
        max_tries: u32,
        enabled_drivers: &[String],
        busy_ids: &[String],
    ) -> Result<Option<Item>, StoreError> {
        if enabled_drivers.is_empty() {
            return Ok(None);
        }

        #[allow(clippy::type_complexity)]
        let row: Option<(String, String, String, Vec<u8>, i64, i64, i64, i16)> = sqlx::query_as(
            r#"
            SELECT notify_id, driver, endpoint, content, create_at, next_at, tried, cur_state
            FROM items
            WHERE cur_state = 0
              AND next_at <= $1
              AND tried < $2
              AND driver = ANY($3)
              AND NOT (notify_id = ANY($4))
            ORDER BY next_at ASC
            LIMIT 1
            "#,
        )
        .bind(now)
        .bind(i64::from(max_tries))
        .bind(enabled_drivers)
        .bind(busy_ids)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, driver, endpoint, content, create_at, next_at, tried, cur_state)) = row
        else {
            return Ok(None);
        };

        Ok(Some(
            Item::builder()
                .id(id)
                .driver(driver)
                .endpoint(endpoint)
                .content(content)
                .create_at(create_at)
                .next_at(next_at)
                .tried(tried as u32)
                .state(State::from_i16(cur_state).unwrap_or(State::Pending))
                .build(),
        ))
    }

    async fn delete(&self, id: &str, busy_ids: &[String]) -> Result<(), StoreError> {
        if busy_ids.iter().any(|busy| busy == id) {
            return Err(StoreError::InUse);
        }
        sqlx::query("DELETE FROM items WHERE notify_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self, before: i64, busy_ids: &[String]) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM items
            WHERE create_at < $1 AND cur_state IN (1, 2) AND NOT (notify_id = ANY($2))
            "#,
        )
        .bind(before)
        .bind(busy_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn force_clear(&self, before: i64, busy_ids: &[String]) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM items WHERE create_at < $1 AND NOT (notify_id = ANY($2))",
        )
        .bind(before)
        .bind(busy_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
