//! `PostgresStore` exercised against a real database via `testcontainers`,
//! matching the teacher's `tests/common/harness.rs` shared-container pattern
//! (here scaled down to a single Postgres container, no Redis).

use chrono::Utc;
use notify_core::core::{Item, State, Store};
use notify_core::store::PostgresStore;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

async fn pool() -> (PgPool, testcontainers::ContainerAsync<Postgres>) {
    let container = Postgres::default()
        .start()
        .await
        .expect("postgres container should start");
    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");
    let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

    let pool = PgPool::connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    (pool, container)
}

fn item(id: &str, driver: &str, next_at: i64) -> Item {
    Item::builder()
        .id(id)
        .driver(driver)
        .endpoint("ep")
        .content(b"payload".to_vec())
        .create_at(Utc::now().timestamp())
        .next_at(next_at)
        .build()
}

#[tokio::test]
async fn create_then_detail_round_trips() {
    let (pool, _container) = pool().await;
    let store = PostgresStore::new(pool);

    let row = item("pg-a", "echo", 0);
    store.create(&row).await.unwrap();

    let detail = store.detail("pg-a").await.unwrap();
    assert_eq!(detail.driver, "echo");
    assert_eq!(detail.endpoint, "ep");
    assert_eq!(detail.content, "payload");
    assert_eq!(detail.status.tried, 0);
    assert_eq!(detail.status.state, State::Pending);
}

#[tokio::test]
async fn create_rejects_duplicate_ids() {
    let (pool, _container) = pool().await;
    let store = PostgresStore::new(pool);

    store.create(&item("pg-dup", "echo", 0)).await.unwrap();
    let err = store.create(&item("pg-dup", "echo", 0)).await.unwrap_err();
    assert!(matches!(err, notify_core::core::StoreError::DuplicateId));
}

#[tokio::test]
async fn pending_applies_driver_busy_and_due_filters() {
    let (pool, _container) = pool().await;
    let store = PostgresStore::new(pool);

    store.create(&item("pg-due", "echo", 0)).await.unwrap();
    store.create(&item("pg-future", "echo", i64::MAX)).await.unwrap();

    let now = Utc::now().timestamp();

    // Not due yet is excluded.
    let picked = store
        .pending(now, 10, &["echo".to_string()], &[])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(picked.id, "pg-due");

    // Busy ids are excluded.
    assert!(store
        .pending(now, 10, &["echo".to_string()], &["pg-due".to_string()])
        .await
        .unwrap()
        .is_none());

    // Unregistered drivers are excluded.
    assert!(store
        .pending(now, 10, &["sms".to_string()], &[])
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn pending_claims_rows_under_unbounded_max_tries() {
    let (pool, _container) = pool().await;
    let store = PostgresStore::new(pool);

    store.create(&item("pg-unbounded", "echo", 0)).await.unwrap();
    let now = Utc::now().timestamp();

    // `max_tries=0` normalizes to `u32::MAX` (§8) before reaching the Store;
    // the claim predicate must still see it as "no effective limit" rather
    // than wrapping to a negative bound that excludes every row.
    let picked = store
        .pending(now, u32::MAX, &["echo".to_string()], &[])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(picked.id, "pg-unbounded");
}

#[tokio::test]
async fn update_on_missing_row_is_a_silent_no_op() {
    let (pool, _container) = pool().await;
    let store = PostgresStore::new(pool);

    store
        .update("pg-ghost", 1, 0, State::Failed, Some(b"x".to_vec()))
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_refuses_busy_ids_and_is_idempotent_otherwise() {
    let (pool, _container) = pool().await;
    let store = PostgresStore::new(pool);

    store.create(&item("pg-busy", "echo", 0)).await.unwrap();
    let err = store
        .delete("pg-busy", &["pg-busy".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, notify_core::core::StoreError::InUse));
    assert!(store.status("pg-busy").await.is_ok());

    store.delete("pg-busy", &[]).await.unwrap();
    assert!(matches!(
        store.status("pg-busy").await.unwrap_err(),
        notify_core::core::StoreError::NotFound
    ));

    // Deleting again is a silent success.
    store.delete("pg-busy", &[]).await.unwrap();
}

#[tokio::test]
async fn clear_removes_only_terminal_rows_before_cutoff() {
    let (pool, _container) = pool().await;
    let store = PostgresStore::new(pool);

    store.create(&item("pg-done", "echo", 0)).await.unwrap();
    store.create(&item("pg-pending", "echo", 0)).await.unwrap();
    store
        .update("pg-done", 1, 0, State::Success, Some(b"ok".to_vec()))
        .await
        .unwrap();

    let far_future = Utc::now().timestamp() + 3600;
    store.clear(far_future, &[]).await.unwrap();

    assert!(matches!(
        store.status("pg-done").await.unwrap_err(),
        notify_core::core::StoreError::NotFound
    ));
    assert!(store.status("pg-pending").await.is_ok());
}
