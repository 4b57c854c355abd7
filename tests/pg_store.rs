// tests/pg_store.rs
//
// Requires a running PostgreSQL: DATABASE_URL=... cargo test -- --ignored

use chrono::Utc;
use progress_service::{
    models::progress::ProgressRecord,
    store::{DocumentStore, PgStore},
};
use sqlx::postgres::PgPoolOptions;

async fn store() -> PgStore {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    let store = PgStore::new(pool);
    store.migrate().await.expect("Failed to migrate database");
    store
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn compare_and_swap_round_trip() {
    let store = store().await;
    let user_id = (uuid::Uuid::new_v4().as_u128() % 1_000_000_000) as i64 + 1;
    let record = ProgressRecord::new(user_id, Utc::now());

    assert!(store.get(user_id).await.unwrap().is_none());
    assert_eq!(store.put_if(user_id, None, &record).await.unwrap(), Some(1));
    assert_eq!(store.put_if(user_id, None, &record).await.unwrap(), None);

    let stored = store.get(user_id).await.unwrap().unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.value.user_id, user_id);

    let updated = stored.value.reset(Utc::now());
    assert_eq!(store.put_if(user_id, Some(1), &updated).await.unwrap(), Some(2));
    assert_eq!(store.put_if(user_id, Some(1), &updated).await.unwrap(), None);
}
